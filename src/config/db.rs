use diesel::{
    pg::PgConnection,
    r2d2::{self, ConnectionManager},
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type Connection = PgConnection;

pub type Pool = r2d2::Pool<ConnectionManager<Connection>>;

/// Build the connection pool backing `AuthDataSource`. `test_on_check_out`
/// pre-pings every checkout: a connection handed to a caller has just
/// proven it's alive, so a broken connection is evicted rather than
/// silently reused.
pub fn init_db_pool(url: &str, max_size: u32, connection_timeout: Duration) -> Pool {
    log::info!("Configuring database connection pool...");
    let manager = ConnectionManager::<Connection>::new(url);
    r2d2::Pool::builder()
        .max_size(max_size)
        .connection_timeout(connection_timeout)
        .test_on_check_out(true)
        .build(manager)
        .expect("Failed to create database connection pool")
}

pub fn run_migrations(conn: &mut PgConnection) {
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run pending migrations");
}
