//! Library crate for rally-back, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Persistence entities and the pluggable session store.
pub mod dao;
/// Request/response payloads.
pub mod dto;
/// Service and HTTP error taxonomy.
pub mod error;
/// Pure rotation-scheduling logic.
pub mod rotation;
/// HTTP route trees.
pub mod routes;
/// Operations over the shared application state.
pub mod services;
/// Shared state, the session record and the merge policy.
pub mod state;
