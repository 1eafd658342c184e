//! Operator-facing liveness/readiness probe. The broker never calls
//! this route; it exists so a Kubernetes/compose readiness check has
//! something to poll that actually exercises the connection pool
//! `AuthDataSource` depends on.

use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use log::error;
use serde::Serialize;

use crate::config::db::Pool;

#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
enum Status {
    #[serde(rename = "healthy")]
    Healthy,
    #[serde(rename = "unhealthy")]
    Unhealthy,
}

#[derive(Serialize)]
struct HealthResponse {
    status: Status,
    timestamp: String,
    database: Status,
}

fn check_database_health(pool: &Pool) -> Status {
    match pool.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => Status::Healthy,
            Err(err) => {
                error!("database health check query failed: {err}");
                Status::Unhealthy
            }
        },
        Err(err) => {
            error!("database health check could not obtain a connection: {err}");
            Status::Unhealthy
        }
    }
}

#[get("/health")]
pub async fn health(pool: web::Data<Pool>) -> HttpResponse {
    let pool = pool.get_ref().clone();
    let database = web::block(move || check_database_health(&pool))
        .await
        .unwrap_or(Status::Unhealthy);

    let response = HealthResponse {
        status: database,
        timestamp: Utc::now().to_rfc3339(),
        database,
    };

    if database == Status::Healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
