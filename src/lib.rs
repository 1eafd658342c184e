//! Broker Authentication & Authorization HTTP Backend.
//!
//! An HTTP service that a RabbitMQ-family message broker calls via its
//! `http` auth backend plugin contract on four fixed paths (`/user`,
//! `/vhost`, `/resource`, `/topic`) to decide login, vhost access, and
//! resource/topic permissions for a connecting principal.

pub mod api;
pub mod config;
pub mod datasource;
pub mod error;
pub mod identity;
pub mod policy;
pub mod schema;
