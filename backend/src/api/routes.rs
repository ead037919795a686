//! Defines the HTTP routes of the service.
//!
//! The GraphQL endpoint and the subscription endpoint share one path, taken
//! from the gateway options, next to the health check.

use std::time::Duration;

use axum::{
    http::{header::InvalidHeaderValue, StatusCode},
    routing::get,
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{graphql, graphql_get, health};
use crate::middleware::cors_layer;
use crate::services::gateway::HEALTH_CHECK_PATH;
use crate::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Result<Router, InvalidHeaderValue> {
    let options = state.gateway.options();
    let cors = cors_layer(&options.cors)?;
    let body_limit = options.body_limit;
    let path = options.path.clone();

    Ok(Router::new()
        .route(&path, get(graphql_get).post(graphql))
        .route(HEALTH_CHECK_PATH, get(health))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
