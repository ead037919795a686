//! Central module for organizing the application's GraphQL API.
//!
//! This module merges the per-domain query and mutation roots (users, roles)
//! into one schema, adds the subscription root and attaches the schema
//! extensions chosen by the gateway options.

pub mod context;
pub mod handlers;
pub mod role;
pub mod routes;
pub mod subscription;
pub mod user;
pub mod websocket;

use std::sync::Arc;

use async_graphql::{extensions::ApolloTracing, MergedObject, Schema};

use crate::auth::AuthService;
use crate::database::Database;
use crate::middleware::{CachePolicy, ErrorTracking, PersistedQueries, PersistedQueryStore};
use crate::services::gateway::GatewayOptions;
use crate::services::validation::ValidationPipe;
use role::{RoleMutation, RoleQuery};
use subscription::SubscriptionRoot;
use user::{UserMutation, UserQuery};

#[derive(MergedObject, Default)]
pub struct Query(UserQuery, RoleQuery);

#[derive(MergedObject, Default)]
pub struct Mutation(UserMutation, RoleMutation);

pub type AppSchema = Schema<Query, Mutation, SubscriptionRoot>;

/// Present in the schema data when resolvers should serve mock data.
#[derive(Debug, Clone, Copy)]
pub struct Mocks;

/// Everything the resolvers reach through the schema data.
pub struct SchemaDeps {
    pub database: Database,
    pub auth: Arc<AuthService>,
    pub pipe: ValidationPipe,
    pub persisted_queries: Option<Arc<dyn PersistedQueryStore>>,
}

pub fn build_schema(deps: SchemaDeps, options: &GatewayOptions) -> AppSchema {
    let mut builder = Schema::build(
        Query::default(),
        Mutation::default(),
        SubscriptionRoot::default(),
    )
    .data(deps.database)
    .data(deps.auth)
    .data(deps.pipe)
    .extension(ErrorTracking);

    if let Some(store) = deps.persisted_queries {
        builder = builder.extension(PersistedQueries::new(store));
    }
    if let Some(cache_control) = &options.cache_control {
        builder = builder.extension(CachePolicy::new(cache_control));
    }
    if options.tracing {
        builder = builder.extension(ApolloTracing);
    }
    if options.mocks {
        builder = builder.data(Mocks);
    }
    if !options.introspection {
        builder = builder.disable_introspection();
    }

    builder.finish()
}
