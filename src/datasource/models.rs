//! Read-only row projections for `AuthDataSource`.

use diesel::prelude::*;

use crate::schema::{components, users};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRecord {
    pub login: String,
    pub org_id: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = components)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ComponentRecord {
    pub login: String,
    pub secret_hash: String,
    pub role: Option<String>,
    pub active: bool,
}
