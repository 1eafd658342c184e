//! The four endpoints the broker's `http` auth backend plugin calls out
//! to: `/user`, `/vhost`, `/resource`, `/topic`. Every handler follows
//! the same shape — parse form fields by hand (so a missing field
//! degrades to `deny` rather than an actix extractor 4xx), resolve
//! identity, ask `PolicyEngine`, write the plaintext body. HTTP status
//! is always 200 for a well-formed POST; the broker reads the body, not
//! the status.

use actix_web::rt::time::timeout;
use actix_web::{post, web, HttpResponse};
use serde::Deserialize;

use crate::config::db::Pool;
use crate::config::settings::AppConfig;
use crate::datasource::repository::{AuthDataSource, DieselAuthDataSource};
use crate::error::ServiceError;
use crate::identity::principal::Principal;
use crate::identity::resolver::IdentityResolver;
use crate::identity::token::TokenVerifier;
use crate::policy::classifier::{classify, classify_topic};
use crate::policy::engine::{resource_decision, topic_decision, user_tags, vhost_decision};
use crate::policy::resource::{Action, ResourceKind, ResourceRef};

/// Literal body for every allow response that carries no tags.
const ALLOW_BODY: &str = "allow";

/// Run a blocking pipeline closure (it takes a pool connection and does
/// Diesel I/O) off the async executor and under the configured request
/// timeout. Spec §5: "each request has an upper time bound ... if
/// exceeded the handler must return deny. A cancelled request must
/// release its connection back to the pool before returning" — dropping
/// the `web::block` future on timeout drops the closure, and r2d2
/// returns the connection to the pool on `Drop` regardless of how the
/// guard was dropped.
async fn run_with_timeout<F>(request_timeout: std::time::Duration, work: F) -> String
where
    F: FnOnce() -> String + Send + 'static,
{
    match timeout(request_timeout, web::block(work)).await {
        Ok(Ok(body)) => body,
        Ok(Err(err)) => ServiceError::data_source_unavailable(format!("blocking task failed: {err}"))
            .log_and_deny()
            .to_string(),
        Err(_) => ServiceError::data_source_unavailable("request exceeded the configured time bound")
            .log_and_deny()
            .to_string(),
    }
}

fn org_id_of(principal: &Principal) -> Option<&str> {
    match principal {
        Principal::User(user) => Some(&user.org_id),
        Principal::Component(_) => None,
    }
}

fn allow_body(tags: &[String]) -> String {
    if tags.is_empty() {
        ALLOW_BODY.to_string()
    } else {
        format!("{} {}", ALLOW_BODY, tags.join(" "))
    }
}

fn data_source(pool: &Pool, config: &AppConfig) -> DieselAuthDataSource {
    DieselAuthDataSource::new(pool.clone(), config.push_exchange_prefix.clone())
}

#[derive(Debug, Deserialize)]
pub struct UserForm {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VhostForm {
    username: Option<String>,
    vhost: Option<String>,
    /// Opaque log datum only (spec §9 open question); its presence is
    /// required but its value is never consulted by the policy.
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceForm {
    username: Option<String>,
    vhost: Option<String>,
    resource: Option<String>,
    name: Option<String>,
    permission: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopicForm {
    username: Option<String>,
    vhost: Option<String>,
    resource: Option<String>,
    name: Option<String>,
    permission: Option<String>,
    routing_key: Option<String>,
}

/// `POST /user` — login decision. Tries certificate, API-token, then
/// component-credential resolution via `IdentityResolver::resolve`, in
/// that order.
#[post("/user")]
pub async fn user(
    form: web::Form<UserForm>,
    pool: web::Data<Pool>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let form = form.into_inner();
    let pool = pool.get_ref().clone();
    let request_timeout = config.request_timeout;
    let config = config.get_ref().clone();
    let body = run_with_timeout(request_timeout, move || handle_user(form, &pool, &config)).await;
    HttpResponse::Ok().content_type("text/plain").body(body)
}

fn handle_user(form: UserForm, pool: &Pool, config: &AppConfig) -> String {
    let (username, password) = match (form.username, form.password) {
        (Some(username), Some(password)) if !username.is_empty() => (username, password),
        _ => {
            return ServiceError::malformed_request("missing username or password")
                .log_and_deny()
                .to_string()
        }
    };

    let source = data_source(pool, config);
    let verifier = TokenVerifier::new(config.token_server_secret.clone());
    let resolver = IdentityResolver::new(&source, &verifier);

    match resolver.resolve(&username, &password) {
        Ok(principal) => allow_body(&user_tags(&principal)),
        Err(err) => err.log_and_deny().to_string(),
    }
}

/// `POST /vhost` — vhost-access decision. The `ip` field is an opaque
/// log datum only; no IP-based policy exists.
#[post("/vhost")]
pub async fn vhost(
    form: web::Form<VhostForm>,
    pool: web::Data<Pool>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let form = form.into_inner();
    let pool = pool.get_ref().clone();
    let request_timeout = config.request_timeout;
    let config = config.get_ref().clone();
    let body = run_with_timeout(request_timeout, move || handle_vhost(form, &pool, &config)).await;
    HttpResponse::Ok().content_type("text/plain").body(body)
}

fn handle_vhost(form: VhostForm, pool: &Pool, config: &AppConfig) -> String {
    let (username, requested_vhost) = match (form.username, form.vhost) {
        (Some(username), Some(vhost)) if !username.is_empty() => (username, vhost),
        _ => {
            return ServiceError::malformed_request("missing username or vhost")
                .log_and_deny()
                .to_string()
        }
    };

    // `ip` is a required field (spec §6); its value is never consulted by
    // the policy, only its presence.
    if form.ip.is_none() {
        return ServiceError::malformed_request("missing ip")
            .log_and_deny()
            .to_string();
    }

    let source = data_source(pool, config);
    let verifier = TokenVerifier::new(config.token_server_secret.clone());
    let resolver = IdentityResolver::new(&source, &verifier);

    let principal = match resolver.resolve_known(&username) {
        Ok(principal) => principal,
        Err(err) => return err.log_and_deny().to_string(),
    };

    let org_has_stream_api = match org_id_of(&principal) {
        Some(org_id) => match source.org_has_stream_api(org_id) {
            Ok(flag) => flag,
            Err(err) => {
                return ServiceError::data_source_unavailable(err.to_string())
                    .log_and_deny()
                    .to_string()
            }
        },
        None => true,
    };

    let decision = vhost_decision(&principal, &requested_vhost, &config.default_vhost, org_has_stream_api);
    if decision.allow {
        ALLOW_BODY.to_string()
    } else {
        ServiceError::policy_deny("vhost access denied").log_and_deny().to_string()
    }
}

/// `POST /resource` — exchange/queue permission decision.
#[post("/resource")]
pub async fn resource(
    form: web::Form<ResourceForm>,
    pool: web::Data<Pool>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let form = form.into_inner();
    let pool = pool.get_ref().clone();
    let request_timeout = config.request_timeout;
    let config = config.get_ref().clone();
    let body = run_with_timeout(request_timeout, move || handle_resource(form, &pool, &config)).await;
    HttpResponse::Ok().content_type("text/plain").body(body)
}

fn handle_resource(form: ResourceForm, pool: &Pool, config: &AppConfig) -> String {
    let username = match form.username.filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => return ServiceError::malformed_request("missing username").log_and_deny().to_string(),
    };
    let vhost = match form.vhost {
        Some(v) => v,
        None => return ServiceError::malformed_request("missing vhost").log_and_deny().to_string(),
    };
    let kind = match form.resource.as_deref().and_then(ResourceKind::parse) {
        Some(k) => k,
        None => return ServiceError::malformed_request("missing or unknown resource kind").log_and_deny().to_string(),
    };
    let name = match form.name {
        Some(v) => v,
        None => return ServiceError::malformed_request("missing name").log_and_deny().to_string(),
    };
    let action = match form.permission.as_deref().and_then(Action::parse) {
        Some(a) => a,
        None => return ServiceError::malformed_request("missing or unknown permission").log_and_deny().to_string(),
    };

    let source = data_source(pool, config);
    let verifier = TokenVerifier::new(config.token_server_secret.clone());
    let resolver = IdentityResolver::new(&source, &verifier);

    let principal = match resolver.resolve_known(&username) {
        Ok(principal) => principal,
        Err(err) => return err.log_and_deny().to_string(),
    };

    let push_exchange_name = org_id_of(&principal).map(|org_id| source.org_push_exchange(org_id));
    let resource_ref = ResourceRef { vhost, kind, name };
    let category = match classify(config, &resource_ref, push_exchange_name.as_deref()) {
        Some(category) => category,
        None => return ServiceError::policy_deny("vhost not permitted").log_and_deny().to_string(),
    };

    let decision = resource_decision(&principal, category, action);
    if decision.allow {
        ALLOW_BODY.to_string()
    } else {
        ServiceError::policy_deny("resource permission denied").log_and_deny().to_string()
    }
}

/// `POST /topic` — routing-key-scoped read decision.
#[post("/topic")]
pub async fn topic(
    form: web::Form<TopicForm>,
    pool: web::Data<Pool>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let form = form.into_inner();
    let pool = pool.get_ref().clone();
    let request_timeout = config.request_timeout;
    let config = config.get_ref().clone();
    let body = run_with_timeout(request_timeout, move || handle_topic(form, &pool, &config)).await;
    HttpResponse::Ok().content_type("text/plain").body(body)
}

fn handle_topic(form: TopicForm, pool: &Pool, config: &AppConfig) -> String {
    let username = match form.username.filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => return ServiceError::malformed_request("missing username").log_and_deny().to_string(),
    };
    let vhost = match form.vhost {
        Some(v) => v,
        None => return ServiceError::malformed_request("missing vhost").log_and_deny().to_string(),
    };
    if form.resource.as_deref() != Some("topic") {
        return ServiceError::malformed_request("resource must be topic").log_and_deny().to_string();
    }
    let action = match form.permission.as_deref().and_then(Action::parse) {
        Some(a) => a,
        None => return ServiceError::malformed_request("missing or unknown permission").log_and_deny().to_string(),
    };
    if form.name.is_none() {
        return ServiceError::malformed_request("missing name").log_and_deny().to_string();
    }
    let routing_key = match form.routing_key {
        Some(v) => v,
        None => return ServiceError::malformed_request("missing routing_key").log_and_deny().to_string(),
    };

    let source = data_source(pool, config);
    let verifier = TokenVerifier::new(config.token_server_secret.clone());
    let resolver = IdentityResolver::new(&source, &verifier);

    let principal = match resolver.resolve_known(&username) {
        Ok(principal) => principal,
        Err(err) => return err.log_and_deny().to_string(),
    };

    let org_id = org_id_of(&principal).unwrap_or("");
    let category = match classify_topic(config, &vhost, &routing_key, org_id) {
        Some(category) => category,
        None => return ServiceError::policy_deny("vhost not permitted").log_and_deny().to_string(),
    };

    let decision = topic_decision(&principal, category, action);
    if decision.allow {
        ALLOW_BODY.to_string()
    } else {
        ServiceError::policy_deny("topic permission denied").log_and_deny().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::models::{ComponentRecord, UserRecord};
    use crate::datasource::repository::DataSourceError;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::time::Duration;

    struct FakeDataSource {
        users: RefCell<Vec<UserRecord>>,
        components: RefCell<Vec<ComponentRecord>>,
        stream_api_orgs: RefCell<Vec<String>>,
    }

    impl FakeDataSource {
        fn new() -> Self {
            Self {
                users: RefCell::new(Vec::new()),
                components: RefCell::new(Vec::new()),
                stream_api_orgs: RefCell::new(Vec::new()),
            }
        }

        fn with_user(self, user: UserRecord) -> Self {
            self.users.borrow_mut().push(user);
            self
        }

        fn with_stream_api(self, org_id: &str) -> Self {
            self.stream_api_orgs.borrow_mut().push(org_id.to_string());
            self
        }
    }

    impl AuthDataSource for FakeDataSource {
        fn lookup_user(&self, login: &str, org_id: &str) -> Result<Option<UserRecord>, DataSourceError> {
            Ok(self
                .users
                .borrow()
                .iter()
                .find(|u| u.login == login && u.org_id == org_id)
                .cloned())
        }

        fn lookup_component(&self, login: &str) -> Result<Option<ComponentRecord>, DataSourceError> {
            Ok(self
                .components
                .borrow()
                .iter()
                .find(|c| c.login == login)
                .cloned())
        }

        fn org_has_stream_api(&self, org_id: &str) -> Result<bool, DataSourceError> {
            Ok(self.stream_api_orgs.borrow().iter().any(|o| o == org_id))
        }

        fn org_push_exchange(&self, org_id: &str) -> String {
            format!("_push.{org_id}")
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            default_vhost: "/".into(),
            push_exchange_prefix: "_push".into(),
            autogen_queue_prefix: "stomp".into(),
            shared_infrastructure_resources: HashSet::new(),
            token_server_secret: "s".into(),
            database_url: "postgres://localhost/db".into(),
            db_pool_max_size: 10,
            db_pool_connection_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
            app_host: "0.0.0.0".into(),
            app_port: "8080".into(),
        }
    }

    #[test]
    fn allow_body_with_no_tags_is_the_bare_literal() {
        assert_eq!(allow_body(&[]), "allow");
    }

    #[test]
    fn allow_body_appends_space_separated_tags() {
        assert_eq!(allow_body(&["administrator".to_string()]), "allow administrator");
    }

    #[test]
    fn classify_based_resource_pipeline_allows_the_owning_users_push_exchange_read() {
        let config = test_config();
        let source = FakeDataSource::new()
            .with_user(UserRecord {
                login: "alice".into(),
                org_id: "example.org".into(),
                active: true,
            })
            .with_stream_api("example.org");
        let principal = Principal::User(
            source
                .lookup_user("alice", "example.org")
                .unwrap()
                .unwrap(),
        );
        let push_name = org_id_of(&principal).map(|org_id| source.org_push_exchange(org_id));
        let resource_ref = ResourceRef {
            vhost: "/".into(),
            kind: ResourceKind::Exchange,
            name: "_push.example.org".into(),
        };
        let category = classify(&config, &resource_ref, push_name.as_deref()).unwrap();
        let decision = resource_decision(&principal, category, Action::Read);
        assert!(decision.allow);
    }

    #[test]
    fn classify_based_resource_pipeline_denies_a_different_orgs_push_exchange() {
        let config = test_config();
        let source = FakeDataSource::new().with_user(UserRecord {
            login: "alice".into(),
            org_id: "example.org".into(),
            active: true,
        });
        let principal = Principal::User(
            source
                .lookup_user("alice", "example.org")
                .unwrap()
                .unwrap(),
        );
        let push_name = org_id_of(&principal).map(|org_id| source.org_push_exchange(org_id));
        let resource_ref = ResourceRef {
            vhost: "/".into(),
            kind: ResourceKind::Exchange,
            name: "_push.other.org".into(),
        };
        let category = classify(&config, &resource_ref, push_name.as_deref()).unwrap();
        let decision = resource_decision(&principal, category, Action::Read);
        assert!(!decision.allow);
    }

    #[actix_web::test]
    async fn run_with_timeout_returns_the_blocking_closures_body_when_it_finishes_in_time() {
        let body = run_with_timeout(Duration::from_secs(3), || "allow".to_string()).await;
        assert_eq!(body, "allow");
    }

    #[actix_web::test]
    async fn run_with_timeout_denies_when_the_closure_outruns_the_bound() {
        let body = run_with_timeout(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(200));
            "allow".to_string()
        })
        .await;
        assert_eq!(body, "deny");
    }
}
