//! `ResourceClassifier` — a pure function from `(vhost, kind, name)` to a
//! semantic category. Kept free of I/O deliberately: the whole decision
//! table is exhaustively testable without a database.

use crate::config::settings::AppConfig;
use crate::policy::resource::{ResourceKind, ResourceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    System,
    PrivateAutogen,
    PushExchange,
    SharedInfrastructure,
    Unknown,
}

/// Classify a resource reference for the calling principal's organization
/// push-exchange name. `push_exchange_name` is `None` for components,
/// which have no organization.
///
/// Returns `None` if the requested vhost is not the one configured vhost
/// — the caller must treat that as an outright deny, distinct from
/// `Unknown`, since it's a vhost-isolation violation rather than an
/// unrecognized resource name.
pub fn classify(
    config: &AppConfig,
    resource: &ResourceRef,
    push_exchange_name: Option<&str>,
) -> Option<ResourceCategory> {
    if resource.vhost != config.default_vhost {
        return None;
    }

    if resource.kind == ResourceKind::Exchange && resource.name.starts_with("amq.") {
        return Some(ResourceCategory::System);
    }

    if resource.kind == ResourceKind::Queue
        && resource.name.starts_with(&config.autogen_queue_prefix)
    {
        return Some(ResourceCategory::PrivateAutogen);
    }

    if resource.kind == ResourceKind::Exchange {
        if let Some(push_name) = push_exchange_name {
            if resource.name == push_name {
                return Some(ResourceCategory::PushExchange);
            }
        }
    }

    if config
        .shared_infrastructure_resources
        .contains(&(resource.kind, resource.name.clone()))
    {
        return Some(ResourceCategory::SharedInfrastructure);
    }

    Some(ResourceCategory::Unknown)
}

/// Classify a topic permission check by its routing key: the
/// organization scope is the first dot-separated
/// component of `routing_key`. Matches the caller's org id → push
/// exchange; anything else (including wildcards like `#` or `*`) is
/// unknown.
///
/// Returns `None` for a vhost mismatch, exactly like `classify`.
pub fn classify_topic(
    config: &AppConfig,
    vhost: &str,
    routing_key: &str,
    org_id: &str,
) -> Option<ResourceCategory> {
    if vhost != config.default_vhost {
        return None;
    }

    let scope = routing_key.split('.').next().unwrap_or("");
    if scope == org_id {
        Some(ResourceCategory::PushExchange)
    } else {
        Some(ResourceCategory::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn test_config() -> AppConfig {
        let mut shared = HashSet::new();
        shared.insert((ResourceKind::Exchange, "notifications".to_string()));
        shared.insert((ResourceKind::Queue, "audit".to_string()));
        AppConfig {
            default_vhost: "/".into(),
            push_exchange_prefix: "_push".into(),
            autogen_queue_prefix: "stomp".into(),
            shared_infrastructure_resources: shared,
            token_server_secret: "s".into(),
            database_url: "postgres://localhost/db".into(),
            db_pool_max_size: 10,
            db_pool_connection_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
            app_host: "0.0.0.0".into(),
            app_port: "8080".into(),
        }
    }

    fn resource(kind: ResourceKind, name: &str) -> ResourceRef {
        ResourceRef {
            vhost: "/".into(),
            kind,
            name: name.into(),
        }
    }

    #[test]
    fn rejects_a_vhost_other_than_the_configured_one() {
        let config = test_config();
        let mut r = resource(ResourceKind::Exchange, "amq.direct");
        r.vhost = "other".into();
        assert_eq!(classify(&config, &r, None), None);
    }

    #[test]
    fn amq_prefixed_exchange_is_system() {
        let config = test_config();
        let r = resource(ResourceKind::Exchange, "amq.direct");
        assert_eq!(classify(&config, &r, None), Some(ResourceCategory::System));
    }

    #[test]
    fn amq_prefix_only_applies_to_exchanges() {
        let config = test_config();
        let r = resource(ResourceKind::Queue, "amq.gen-xyz");
        assert_eq!(classify(&config, &r, None), Some(ResourceCategory::Unknown));
    }

    #[test]
    fn stomp_prefixed_queue_is_private_autogen() {
        let config = test_config();
        let r = resource(ResourceKind::Queue, "stomp-subscription-1");
        assert_eq!(
            classify(&config, &r, None),
            Some(ResourceCategory::PrivateAutogen)
        );
    }

    #[test]
    fn exchange_matching_push_name_is_push_exchange() {
        let config = test_config();
        let r = resource(ResourceKind::Exchange, "_push.example.org");
        assert_eq!(
            classify(&config, &r, Some("_push.example.org")),
            Some(ResourceCategory::PushExchange)
        );
    }

    #[test]
    fn exchange_matching_a_different_orgs_push_name_is_unknown() {
        let config = test_config();
        let r = resource(ResourceKind::Exchange, "_push.other.org");
        assert_eq!(
            classify(&config, &r, Some("_push.example.org")),
            Some(ResourceCategory::Unknown)
        );
    }

    #[test]
    fn configured_shared_infrastructure_resource_is_classified() {
        let config = test_config();
        let r = resource(ResourceKind::Exchange, "notifications");
        assert_eq!(
            classify(&config, &r, None),
            Some(ResourceCategory::SharedInfrastructure)
        );
        let r = resource(ResourceKind::Queue, "audit");
        assert_eq!(
            classify(&config, &r, None),
            Some(ResourceCategory::SharedInfrastructure)
        );
    }

    #[test]
    fn anything_else_is_unknown() {
        let config = test_config();
        let r = resource(ResourceKind::Queue, "random-queue");
        assert_eq!(classify(&config, &r, None), Some(ResourceCategory::Unknown));
    }

    #[test]
    fn topic_scope_matching_org_id_is_push_exchange() {
        let config = test_config();
        assert_eq!(
            classify_topic(&config, "/", "example.org.events.#", "example.org"),
            Some(ResourceCategory::PushExchange)
        );
    }

    #[test]
    fn topic_scope_for_a_different_org_is_unknown() {
        let config = test_config();
        assert_eq!(
            classify_topic(&config, "/", "other.org.events", "example.org"),
            Some(ResourceCategory::Unknown)
        );
    }

    #[test]
    fn topic_wildcard_scope_is_unknown() {
        let config = test_config();
        assert_eq!(
            classify_topic(&config, "/", "#", "example.org"),
            Some(ResourceCategory::Unknown)
        );
    }

    #[test]
    fn topic_vhost_mismatch_is_none() {
        let config = test_config();
        assert_eq!(
            classify_topic(&config, "other", "example.org.events", "example.org"),
            None
        );
    }
}
