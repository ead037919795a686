//! HTTP handler functions for the GraphQL endpoint and the health check.
//!
//! POST requests execute queries and mutations. GET requests either upgrade
//! to a subscription WebSocket or, outside production, serve the playground.

use async_graphql::http::{
    playground_source, GraphQLPlaygroundConfig, WebSocketProtocols, ALL_WEBSOCKET_PROTOCOLS,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::{ws::WebSocketUpgrade, FromRequestParts, Request, State},
    http::{header::UPGRADE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::websocket;
use crate::middleware::apply_cache_control;
use crate::AppState;

pub async fn graphql(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> Response {
    let context = state.gateway.request_context(&headers).await;
    let response = state.schema.execute(request.into_inner().data(context)).await;
    let cache_control = response.cache_control;

    let mut http = GraphQLResponse::from(response).into_response();
    apply_cache_control(http.headers_mut(), cache_control);
    http
}

pub async fn graphql_get(State(state): State<AppState>, request: Request) -> Response {
    let (mut parts, _body) = request.into_parts();

    if parts.headers.contains_key(UPGRADE) {
        let Some(protocol) = websocket::protocol(&parts.headers) else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => return rejection.into_response(),
        };
        return subscription(state, protocol, upgrade);
    }

    match &state.gateway.options().playground {
        Some(playground) => {
            let path = state.gateway.options().path.as_str();
            let config = playground
                .settings
                .iter()
                .fold(
                    GraphQLPlaygroundConfig::new(path).subscription_endpoint(path),
                    |config, (name, value)| config.with_setting(*name, value.clone()),
                );
            Html(playground_source(config)).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn subscription(
    state: AppState,
    protocol: WebSocketProtocols,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade
        .protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |socket| websocket::serve(state, protocol, socket))
}

/// Always passes; the service has no dependency it reports on.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "pass" }))
}
