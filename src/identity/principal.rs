//! The authenticated identity: a tagged variant, not an inheritance
//! hierarchy. The
//! `PolicyEngine` dispatches on the tag; a new principal kind is a new
//! variant plus new rows in the decision tables of `policy::engine`.

use crate::datasource::models::{ComponentRecord, UserRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// A service account (pipeline daemons, internal tooling).
    Component(ComponentRecord),
    /// A human account bound to exactly one organization.
    User(UserRecord),
}

impl Principal {
    pub fn is_administrator(&self) -> bool {
        matches!(
            self,
            Principal::Component(c) if c.role.as_deref() == Some("administrator")
        )
    }

    /// The tag list the broker should attach to the session. Components
    /// carry their stored role tag;
    /// users carry no tags unless explicitly marked in the data source.
    pub fn tags(&self) -> Vec<String> {
        match self {
            Principal::Component(c) => c.role.iter().cloned().collect(),
            Principal::User(_) => Vec::new(),
        }
    }

    pub fn login(&self) -> &str {
        match self {
            Principal::Component(c) => &c.login,
            Principal::User(u) => &u.login,
        }
    }
}
