//! Resource classification and the policy decision tables.

pub mod classifier;
pub mod engine;
pub mod resource;
