//! Immutable application configuration, built once at startup and handed
//! to every request handler by cheap `Clone` — an owned, `Arc`-backed
//! snapshot, not process-wide mutable state.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use crate::policy::resource::ResourceKind;

/// A `(kind, name)` pair treated as shared broker-wide plumbing, e.g. a
/// notifications exchange every organization may read.
pub type SharedResource = (ResourceKind, String);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub default_vhost: String,
    pub push_exchange_prefix: String,
    pub autogen_queue_prefix: String,
    pub shared_infrastructure_resources: HashSet<SharedResource>,
    pub token_server_secret: String,
    pub database_url: String,
    pub db_pool_max_size: u32,
    pub db_pool_connection_timeout: Duration,
    pub request_timeout: Duration,
    pub app_host: String,
    pub app_port: String,
}

impl AppConfig {
    /// Load configuration from the process environment (after `.env` has
    /// been applied by the caller, via `dotenv::dotenv()` before any
    /// `env::var` reads).
    ///
    /// Missing `DATABASE_URL` or an empty `TOKEN_SERVER_SECRET` are fatal
    /// startup conditions — a service that cannot verify tokens should
    /// refuse to start rather than silently deny every bearer-token
    /// login forever.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL not set".to_string())?;

        let token_server_secret = env::var("TOKEN_SERVER_SECRET").unwrap_or_default();
        if token_server_secret.is_empty() {
            return Err("TOKEN_SERVER_SECRET must not be empty".to_string());
        }

        let default_vhost = env::var("DEFAULT_VHOST").unwrap_or_else(|_| "/".to_string());
        let push_exchange_prefix =
            env::var("PUSH_EXCHANGE_PREFIX").unwrap_or_else(|_| "_push".to_string());
        let autogen_queue_prefix =
            env::var("AUTOGEN_QUEUE_PREFIX").unwrap_or_else(|_| "stomp".to_string());

        let shared_infrastructure_resources = env::var("SHARED_INFRASTRUCTURE_RESOURCES")
            .ok()
            .map(|raw| parse_shared_resources(&raw))
            .unwrap_or_default();

        let db_pool_max_size = env::var("DB_POOL_MAX_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let db_pool_connection_timeout = Duration::from_secs(
            env::var("DB_POOL_CONNECTION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        );

        let request_timeout = Duration::from_secs(
            env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        );

        let app_host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let app_port = env::var("APP_PORT").unwrap_or_else(|_| "8080".to_string());

        Ok(Self {
            default_vhost,
            push_exchange_prefix,
            autogen_queue_prefix,
            shared_infrastructure_resources,
            token_server_secret,
            database_url,
            db_pool_max_size,
            db_pool_connection_timeout,
            request_timeout,
            app_host,
            app_port,
        })
    }
}

fn parse_shared_resources(raw: &str) -> HashSet<SharedResource> {
    raw.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let (kind_str, name) = entry.split_once(':')?;
            let kind = ResourceKind::parse(kind_str.trim())?;
            Some((kind, name.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_shared_resources() {
        let parsed = parse_shared_resources("exchange:notifications, queue:audit");
        assert!(parsed.contains(&(ResourceKind::Exchange, "notifications".to_string())));
        assert!(parsed.contains(&(ResourceKind::Queue, "audit".to_string())));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn ignores_malformed_entries() {
        let parsed = parse_shared_resources("exchange:notifications,garbage,queue:");
        assert_eq!(parsed.len(), 1);
    }
}
