use actix_web::web;
use log::info;
use std::sync::Once;

use crate::api::{broker_controller, health_controller};

static LOG_ONCE: Once = Once::new();

/// Register the broker's four fixed endpoints plus the operator-facing
/// health route. Route registration is logged once, guarded by
/// `std::sync::Once`, so that a multi-worker `HttpServer` (which calls
/// this closure once per worker) doesn't spam the log.
pub fn config_services(cfg: &mut web::ServiceConfig) {
    LOG_ONCE.call_once(|| {
        info!("Route Configuration Summary:");
        info!("  - GET  /health   -> health_controller::health");
        info!("  - POST /user     -> broker_controller::user");
        info!("  - POST /vhost    -> broker_controller::vhost");
        info!("  - POST /resource -> broker_controller::resource");
        info!("  - POST /topic    -> broker_controller::topic");
    });

    cfg.service(health_controller::health);
    cfg.service(broker_controller::user);
    cfg.service(broker_controller::vhost);
    cfg.service(broker_controller::resource);
    cfg.service(broker_controller::topic);
}