//! General-purpose middleware for the API.
//!
//! This module contains the CORS policy layer and the cache-control header
//! written for GraphQL responses, plus the schema extensions for cache policy,
//! error tracking and persisted queries.

pub mod cache_control;
pub mod error_tracking;
pub mod persisted_queries;

use axum::http::{
    header::{InvalidHeaderValue, CACHE_CONTROL},
    HeaderMap, HeaderValue, Method,
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

use async_graphql::CacheControl;

use crate::services::gateway::CorsPolicy;

pub use cache_control::CachePolicy;
pub use error_tracking::ErrorTracking;
pub use persisted_queries::{PersistedQueries, PersistedQueryStore};

pub fn cors_layer(policy: &CorsPolicy) -> Result<CorsLayer, InvalidHeaderValue> {
    let layer = match policy {
        CorsPolicy::Open => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsPolicy::Restricted {
            origin,
            credentials,
        } => CorsLayer::new()
            .allow_origin(HeaderValue::from_str(origin)?)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(*credentials),
    };

    Ok(layer)
}

/// Writes the response's cache policy as a `Cache-Control` header, spelling
/// out `public` for shareable responses. Without a policy no header is sent.
pub fn apply_cache_control(headers: &mut HeaderMap, cache_control: CacheControl) {
    let Some(mut value) = cache_control.value() else {
        headers.remove(CACHE_CONTROL);
        return;
    };

    if cache_control.public {
        value.push_str(", public");
    }
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(CACHE_CONTROL, value);
        }
        Err(_) => {
            headers.remove(CACHE_CONTROL);
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, routing::get, Router};
    use axum::http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
    };
    use tower::ServiceExt;

    use super::*;

    async fn preflight_headers(policy: CorsPolicy, origin: &'static str) -> HeaderMap {
        let app = Router::new()
            .route("/graphql", get(|| async { "ok" }))
            .layer(cors_layer(&policy).unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/graphql")
                    .header(ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        response.headers().clone()
    }

    #[tokio::test]
    async fn open_policy_allows_any_origin() {
        let headers = preflight_headers(CorsPolicy::Open, "https://anywhere.dev").await;

        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn restricted_policy_names_the_frontend_and_allows_credentials() {
        let policy = CorsPolicy::Restricted {
            origin: "https://app.example.com".to_string(),
            credentials: true,
        };
        let headers = preflight_headers(policy, "https://app.example.com").await;

        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
    }

    #[test]
    fn shareable_policy_is_marked_public() {
        let mut headers = HeaderMap::new();
        apply_cache_control(&mut headers, CacheControl { public: true, max_age: 5 });

        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=5, public");
    }

    #[test]
    fn private_policy_is_written_as_is() {
        let mut headers = HeaderMap::new();
        apply_cache_control(&mut headers, CacheControl { public: false, max_age: 5 });

        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=5, private");
    }

    #[test]
    fn header_is_dropped_without_a_policy() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        apply_cache_control(&mut headers, CacheControl::default());

        assert!(headers.get(CACHE_CONTROL).is_none());
    }
}
