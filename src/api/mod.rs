//! The four broker-facing endpoints plus
//! an unauthenticated health route for operators.

pub mod broker_controller;
pub mod health_controller;
