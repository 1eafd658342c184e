//! `PolicyEngine`: pure decision functions over
//! `(principal, resource category, action, configuration)` plus a
//! point-in-time read of the data source already folded into the
//! principal's capabilities. No state machine, no I/O, no retries —
//! a lookup failure is handled by the caller before this is reached.

use crate::identity::principal::Principal;
use crate::policy::classifier::ResourceCategory;
use crate::policy::resource::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allow: bool,
    pub tags: Vec<String>,
}

impl Decision {
    fn allow(tags: Vec<String>) -> Self {
        Self { allow: true, tags }
    }

    fn deny() -> Self {
        Self {
            allow: false,
            tags: Vec::new(),
        }
    }
}

/// Vhost decision. `org_has_stream_api` must already reflect the
/// principal's organization when the principal is a
/// user; it is ignored for components.
pub fn vhost_decision(
    principal: &Principal,
    requested_vhost: &str,
    default_vhost: &str,
    org_has_stream_api: bool,
) -> Decision {
    if requested_vhost != default_vhost {
        return Decision::deny();
    }

    let permitted = match principal {
        Principal::Component(_) => true,
        Principal::User(_) => org_has_stream_api,
    };

    if permitted {
        Decision::allow(user_tags(principal))
    } else {
        Decision::deny()
    }
}

/// Resource decision. First match wins; the table is evaluated top to
/// bottom.
pub fn resource_decision(principal: &Principal, category: ResourceCategory, action: Action) -> Decision {
    if category == ResourceCategory::Unknown {
        return Decision::deny();
    }

    let allowed = match principal {
        Principal::Component(_) if principal.is_administrator() => true,
        Principal::Component(_) => category == ResourceCategory::SharedInfrastructure,
        Principal::User(_) => match category {
            ResourceCategory::PushExchange => action == Action::Read,
            ResourceCategory::PrivateAutogen => true,
            ResourceCategory::System => action == Action::Read,
            ResourceCategory::SharedInfrastructure | ResourceCategory::Unknown => false,
        },
    };

    if allowed {
        Decision::allow(user_tags(principal))
    } else {
        Decision::deny()
    }
}

/// Topic decision. Only `read` is ever granted, and only for the
/// principal's own push-exchange scope.
pub fn topic_decision(principal: &Principal, category: ResourceCategory, action: Action) -> Decision {
    if action == Action::Read && category == ResourceCategory::PushExchange {
        Decision::allow(user_tags(principal))
    } else {
        Decision::deny()
    }
}

/// The tag list attached to an `/user` allow response.
pub fn user_tags(principal: &Principal) -> Vec<String> {
    principal.tags()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::models::{ComponentRecord, UserRecord};

    fn admin() -> Principal {
        Principal::Component(ComponentRecord {
            login: "svc-pipeline".into(),
            secret_hash: "hash".into(),
            role: Some("administrator".into()),
            active: true,
        })
    }

    fn non_admin_component() -> Principal {
        Principal::Component(ComponentRecord {
            login: "svc-worker".into(),
            secret_hash: "hash".into(),
            role: None,
            active: true,
        })
    }

    fn user() -> Principal {
        Principal::User(UserRecord {
            login: "alice".into(),
            org_id: "example.org".into(),
            active: true,
        })
    }

    #[test]
    fn component_is_always_allowed_on_vhost() {
        let decision = vhost_decision(&admin(), "/", "/", false);
        assert!(decision.allow);
        assert_eq!(decision.tags, vec!["administrator".to_string()]);
    }

    #[test]
    fn user_needs_stream_api_enabled_for_vhost() {
        assert!(!vhost_decision(&user(), "/", "/", false).allow);
        assert!(vhost_decision(&user(), "/", "/", true).allow);
    }

    #[test]
    fn vhost_mismatch_always_denies() {
        assert!(!vhost_decision(&admin(), "other", "/", true).allow);
        assert!(!vhost_decision(&user(), "other", "/", true).allow);
    }

    #[test]
    fn administrator_component_is_allowed_on_every_category_and_action() {
        for category in [
            ResourceCategory::System,
            ResourceCategory::PrivateAutogen,
            ResourceCategory::PushExchange,
            ResourceCategory::SharedInfrastructure,
            ResourceCategory::Unknown,
        ] {
            for action in [Action::Configure, Action::Write, Action::Read] {
                if category == ResourceCategory::Unknown {
                    assert!(!resource_decision(&admin(), category, action).allow);
                } else {
                    assert!(resource_decision(&admin(), category, action).allow);
                }
            }
        }
    }

    #[test]
    fn non_admin_component_is_confined_to_shared_infrastructure() {
        assert!(resource_decision(&non_admin_component(), ResourceCategory::SharedInfrastructure, Action::Configure).allow);
        assert!(!resource_decision(&non_admin_component(), ResourceCategory::PushExchange, Action::Read).allow);
        assert!(!resource_decision(&non_admin_component(), ResourceCategory::System, Action::Read).allow);
    }

    #[test]
    fn user_never_receives_allow_on_unknown_category() {
        for action in [Action::Configure, Action::Write, Action::Read] {
            assert!(!resource_decision(&user(), ResourceCategory::Unknown, action).allow);
        }
    }

    #[test]
    fn user_may_only_read_the_push_exchange() {
        assert!(resource_decision(&user(), ResourceCategory::PushExchange, Action::Read).allow);
        assert!(!resource_decision(&user(), ResourceCategory::PushExchange, Action::Write).allow);
        assert!(!resource_decision(&user(), ResourceCategory::PushExchange, Action::Configure).allow);
    }

    #[test]
    fn user_has_full_control_over_private_autogen_queues() {
        for action in [Action::Configure, Action::Write, Action::Read] {
            assert!(resource_decision(&user(), ResourceCategory::PrivateAutogen, action).allow);
        }
    }

    #[test]
    fn user_may_only_read_system_resources() {
        assert!(resource_decision(&user(), ResourceCategory::System, Action::Read).allow);
        assert!(!resource_decision(&user(), ResourceCategory::System, Action::Write).allow);
    }

    #[test]
    fn user_has_no_access_to_shared_infrastructure() {
        assert!(!resource_decision(&user(), ResourceCategory::SharedInfrastructure, Action::Read).allow);
    }

    #[test]
    fn topic_allows_read_only_for_push_exchange_scope() {
        assert!(topic_decision(&user(), ResourceCategory::PushExchange, Action::Read).allow);
        assert!(!topic_decision(&user(), ResourceCategory::PushExchange, Action::Write).allow);
        assert!(!topic_decision(&user(), ResourceCategory::Unknown, Action::Read).allow);
    }

    #[test]
    fn tags_are_attached_on_allow_for_administrators() {
        let decision = resource_decision(&admin(), ResourceCategory::System, Action::Read);
        assert_eq!(decision.tags, vec!["administrator".to_string()]);
    }
}
