//! # Serving Scaler
//!
//! Scales a recipe's ingredient quantities to a user-chosen serving count by
//! calling a remote scaling service. Rapid serving changes are debounced,
//! superseded calls are cancelled, completed results are cached per serving
//! count, and each ingredient's display quantity is resolved by id, then by
//! name, then falls back to the original text.

pub mod circuit_breaker;
pub mod coordinator;
pub mod ingredient_model;
pub mod orchestrator;
pub mod quantity_resolver;
pub mod scale_cache;
pub mod scaling_config;
pub mod scaling_errors;
pub mod scaling_service;
pub mod servings;
