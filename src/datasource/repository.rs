//! `AuthDataSource`: the read-only projection of the external
//! authorization database. `DieselAuthDataSource` is the only
//! implementation shipped here; the trait exists so `policy`/`identity`
//! code and its tests never need a live database.

use diesel::prelude::*;

use crate::config::db::Pool;
use crate::datasource::models::{ComponentRecord, UserRecord};
use crate::schema::{components, organizations, users};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceError(pub String);

impl std::fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait AuthDataSource {
    fn lookup_user(&self, login: &str, org_id: &str) -> Result<Option<UserRecord>, DataSourceError>;
    fn lookup_component(&self, login: &str) -> Result<Option<ComponentRecord>, DataSourceError>;
    fn org_has_stream_api(&self, org_id: &str) -> Result<bool, DataSourceError>;
    /// Pure function of `org_id` and the configured prefix — no round
    /// trip to the database.
    fn org_push_exchange(&self, org_id: &str) -> String;
}

pub struct DieselAuthDataSource {
    pool: Pool,
    push_exchange_prefix: String,
}

impl DieselAuthDataSource {
    pub fn new(pool: Pool, push_exchange_prefix: String) -> Self {
        Self {
            pool,
            push_exchange_prefix,
        }
    }

    fn connection(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>, DataSourceError>
    {
        self.pool.get().map_err(|err| {
            DataSourceError(format!("connection pool unavailable: {err}"))
        })
    }
}

impl AuthDataSource for DieselAuthDataSource {
    fn lookup_user(
        &self,
        login_value: &str,
        org_id_value: &str,
    ) -> Result<Option<UserRecord>, DataSourceError> {
        use users::dsl::*;

        let mut conn = self.connection()?;
        users
            .filter(login.eq(login_value))
            .filter(org_id.eq(org_id_value))
            .filter(active.eq(true))
            .select(UserRecord::as_select())
            .first::<UserRecord>(&mut conn)
            .optional()
            .map_err(|err| DataSourceError(format!("lookup_user failed: {err}")))
    }

    fn lookup_component(
        &self,
        login_value: &str,
    ) -> Result<Option<ComponentRecord>, DataSourceError> {
        use components::dsl::*;

        let mut conn = self.connection()?;
        components
            .filter(login.eq(login_value))
            .filter(active.eq(true))
            .select(ComponentRecord::as_select())
            .first::<ComponentRecord>(&mut conn)
            .optional()
            .map_err(|err| DataSourceError(format!("lookup_component failed: {err}")))
    }

    fn org_has_stream_api(&self, org_id_value: &str) -> Result<bool, DataSourceError> {
        use organizations::dsl::*;

        let mut conn = self.connection()?;
        organizations
            .filter(org_id.eq(org_id_value))
            .select(stream_api_enabled)
            .first::<bool>(&mut conn)
            .optional()
            .map(|flag| flag.unwrap_or(false))
            .map_err(|err| DataSourceError(format!("org_has_stream_api failed: {err}")))
    }

    fn org_push_exchange(&self, org_id: &str) -> String {
        format!("{}.{}", self.push_exchange_prefix, org_id)
    }
}
