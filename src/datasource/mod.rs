//! The read-only projection of the external authorization database
//! backing the broker's authentication and authorization decisions.

pub mod models;
pub mod repository;
