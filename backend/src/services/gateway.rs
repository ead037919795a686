//! GraphQL gateway wiring: server options, per-operation context and the
//! subscription handshake.
//!
//! `GatewayOptions::from_config` is evaluated once at startup and fixes every
//! environment-dependent switch (CORS, introspection, tracing, cache-control,
//! playground, mocks). `Gateway` then builds the context for each operation by
//! exchanging the caller's token for a user through a `TokenVerifier`.

use std::{sync::Arc, time::Duration};

use adapters::CacheSettings;
use async_graphql::{Response, ServerError, Value as GraphQLValue};
use axum::http::{header::HOST, HeaderMap};
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{token_from_headers, token_from_params, TokenVerifier};
use crate::config::{Config, Environment};
use crate::database::models::User;
use crate::errors::AppError;
use crate::services::pubsub::Broker;

pub const HEALTH_CHECK_PATH: &str = "/.well-known/apollo/server-health";
pub const AUTHENTICATION_ERROR_MESSAGE: &str = "Different authentication error message!";
pub const CURRENT_USER_REQUIRED: &str = "currentUser Required";
pub const CURRENT_USER_REQUIRED_CODE: u16 = 499;

const BODY_LIMIT: usize = 50 * 1024 * 1024;
const KEEP_ALIVE: Duration = Duration::from_millis(1000);
const CACHE_MAX_AGE_SECS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Any origin.
    Open,
    Restricted { origin: String, credentials: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheControlOptions {
    pub default_max_age: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaygroundOptions {
    pub settings: Vec<(&'static str, GraphQLValue)>,
}

impl Default for PlaygroundOptions {
    fn default() -> Self {
        Self {
            settings: vec![
                ("editor.cursorShape", GraphQLValue::from("block")),
                (
                    "editor.fontFamily",
                    GraphQLValue::from(
                        "'Source Code Pro', 'Consolas', 'Inconsolata', 'Droid Sans Mono', 'Monaco', monospace",
                    ),
                ),
                ("editor.fontSize", GraphQLValue::from(14)),
                ("editor.reuseHeaders", GraphQLValue::from(true)),
                ("editor.theme", GraphQLValue::from("dark")),
                ("general.betaUpdates", GraphQLValue::from(true)),
                ("queryPlan.hideQueryPlanResponse", GraphQLValue::from(false)),
                ("request.credentials", GraphQLValue::from("include")),
                ("tracing.hideTracingResponse", GraphQLValue::from(false)),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub path: String,
    pub keep_alive: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOptions {
    pub environment: Environment,
    pub path: String,
    pub cors: CorsPolicy,
    pub introspection: bool,
    pub tracing: bool,
    pub cache_control: Option<CacheControlOptions>,
    pub playground: Option<PlaygroundOptions>,
    pub mocks: bool,
    pub body_limit: usize,
    pub subscriptions: SubscriptionOptions,
    pub persisted_queries: CacheSettings,
}

impl GatewayOptions {
    pub fn from_config(config: &Config) -> Self {
        let production = config.environment.is_production();
        let path = format!("/{}", config.end_point.trim_start_matches('/'));

        let cors = if production {
            CorsPolicy::Restricted {
                origin: config.fe_url.clone(),
                credentials: true,
            }
        } else {
            CorsPolicy::Open
        };

        Self {
            environment: config.environment.clone(),
            path: path.clone(),
            cors,
            introspection: !production,
            tracing: production,
            cache_control: production.then_some(CacheControlOptions {
                default_max_age: CACHE_MAX_AGE_SECS,
            }),
            playground: (!production).then(PlaygroundOptions::default),
            mocks: config.environment.is_testing(),
            body_limit: BODY_LIMIT,
            subscriptions: SubscriptionOptions {
                path,
                keep_alive: KEEP_ALIVE,
            },
            persisted_queries: CacheSettings::default(),
        }
    }
}

/// Per-operation data shared by every resolver of that operation.
#[derive(Clone)]
pub struct GraphQLContext {
    /// `Host` header of the originating request; absent on subscription connections.
    pub host: Option<String>,
    pub pub_sub: Broker,
    pub current_user: Option<User>,
}

pub struct Gateway {
    options: GatewayOptions,
    verifier: Arc<dyn TokenVerifier>,
    broker: Broker,
}

impl Gateway {
    pub fn new(options: GatewayOptions, verifier: Arc<dyn TokenVerifier>, broker: Broker) -> Self {
        Self {
            options,
            verifier,
            broker,
        }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Context for an ordinary request. A missing or unverifiable token leaves
    /// the operation unauthenticated rather than failing it.
    pub async fn request_context(&self, headers: &HeaderMap) -> GraphQLContext {
        let mut current_user = None;

        if let Some(token) = token_from_headers(headers) {
            match self.verifier.verify_token(&token).await {
                Ok(user) => current_user = Some(user),
                Err(err) => debug!(error = %err, "Token rejected, continuing unauthenticated"),
            }
        }

        GraphQLContext {
            host: headers
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            pub_sub: self.broker.clone(),
            current_user,
        }
    }

    /// Subscription handshake. The returned context is stored on the
    /// connection and reused by every operation sent over it.
    pub async fn connect(&self, params: &Value) -> Result<GraphQLContext, AppError> {
        if !self.options.environment.is_production() {
            info!("Connected to websocket");
        }

        let token = token_from_params(params).ok_or_else(|| AppError::Authorization {
            message: CURRENT_USER_REQUIRED.to_string(),
            code: CURRENT_USER_REQUIRED_CODE,
        })?;

        let user = self.verifier.verify_token(&token).await?;

        Ok(GraphQLContext {
            host: None,
            pub_sub: self.broker.clone(),
            current_user: Some(user),
        })
    }

    pub fn disconnect(&self) {
        if !self.options.environment.is_production() {
            info!("Disconnected from websocket");
        }
    }
}

/// Hides the detail of authentication failures from clients.
pub fn shape_error(error: ServerError) -> ServerError {
    let authentication = error
        .source::<AppError>()
        .is_some_and(AppError::is_authentication);

    if authentication {
        ServerError::new(AUTHENTICATION_ERROR_MESSAGE, None)
    } else {
        error
    }
}

pub fn shape_response(mut response: Response) -> Response {
    response.errors = response.errors.into_iter().map(shape_error).collect();
    response
}
