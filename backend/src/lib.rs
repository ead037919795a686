//! Backend library for the Acexis GraphQL API.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! drive the same router through `AppState`.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use api::AppSchema;
use services::gateway::Gateway;

#[derive(Clone)]
pub struct AppState {
    pub schema: AppSchema,
    pub gateway: Arc<Gateway>,
}
