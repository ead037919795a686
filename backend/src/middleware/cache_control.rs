//! HTTP cache policy for GraphQL responses.
//!
//! Only an anonymous query that succeeds may be stored by shared caches. It
//! keeps the schema's cache hints, or gets the default max-age when the schema
//! gives none. A query made by a signed-in user is marked `private`. Mutations
//! and failed operations carry no policy at all.

use std::sync::{Arc, Mutex};

use async_graphql::{
    extensions::{Extension, ExtensionContext, ExtensionFactory, NextExecute, NextParseQuery},
    parser::types::{ExecutableDocument, OperationType},
    CacheControl, Response, ServerResult, Variables,
};

use crate::services::gateway::{CacheControlOptions, GraphQLContext};

pub struct CachePolicy {
    default_max_age: i32,
}

impl CachePolicy {
    pub fn new(options: &CacheControlOptions) -> Self {
        Self {
            default_max_age: i32::try_from(options.default_max_age).unwrap_or(i32::MAX),
        }
    }
}

impl ExtensionFactory for CachePolicy {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(CachePolicyExtension {
            default_max_age: self.default_max_age,
            operations: Mutex::new(Vec::new()),
        })
    }
}

struct CachePolicyExtension {
    default_max_age: i32,
    /// Operations of the parsed document, by name.
    operations: Mutex<Vec<(Option<String>, OperationType)>>,
}

impl CachePolicyExtension {
    fn operation_type(&self, operation_name: Option<&str>) -> Option<OperationType> {
        let operations = self.operations.lock().ok()?;
        match operation_name {
            Some(name) => operations
                .iter()
                .find(|(candidate, _)| candidate.as_deref() == Some(name))
                .map(|(_, ty)| *ty),
            None => operations.first().map(|(_, ty)| *ty),
        }
    }
}

#[async_trait::async_trait]
impl Extension for CachePolicyExtension {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let document = next.run(ctx, query, variables).await?;

        if let Ok(mut operations) = self.operations.lock() {
            *operations = document
                .operations
                .iter()
                .map(|(name, operation)| (name.map(|name| name.to_string()), operation.node.ty))
                .collect();
        }

        Ok(document)
    }

    async fn execute(
        &self,
        ctx: &ExtensionContext<'_>,
        operation_name: Option<&str>,
        next: NextExecute<'_>,
    ) -> Response {
        let mut response = next.run(ctx, operation_name).await;

        let anonymous = ctx
            .data_opt::<GraphQLContext>()
            .is_none_or(|context| context.current_user.is_none());

        response.cache_control = policy(
            response.cache_control,
            self.operation_type(operation_name),
            anonymous,
            response.is_ok(),
            self.default_max_age,
        );
        response
    }
}

pub fn policy(
    hint: CacheControl,
    operation: Option<OperationType>,
    anonymous: bool,
    succeeded: bool,
    default_max_age: i32,
) -> CacheControl {
    match operation {
        Some(OperationType::Query) if succeeded => CacheControl {
            public: hint.public && anonymous,
            max_age: if hint.max_age == 0 {
                default_max_age
            } else {
                hint.max_age
            },
        },
        _ => CacheControl::default(),
    }
}
