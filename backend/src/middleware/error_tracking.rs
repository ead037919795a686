//! Schema extension that records every GraphQL error and shapes the errors
//! returned to clients.

use std::sync::Arc;

use async_graphql::{
    extensions::{Extension, ExtensionContext, ExtensionFactory, NextRequest, NextSubscribe},
    PathSegment, Response, ServerError,
};
use futures::stream::{BoxStream, StreamExt};
use tracing::{error, warn};

use crate::errors::AppError;
use crate::services::gateway::shape_response;

pub struct ErrorTracking;

impl ExtensionFactory for ErrorTracking {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(ErrorTrackingExtension)
    }
}

struct ErrorTrackingExtension;

#[async_trait::async_trait]
impl Extension for ErrorTrackingExtension {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        let response = next.run(ctx).await;
        track(&response.errors);
        shape_response(response)
    }

    fn subscribe<'s>(
        &self,
        ctx: &ExtensionContext<'_>,
        stream: BoxStream<'s, Response>,
        next: NextSubscribe<'_>,
    ) -> BoxStream<'s, Response> {
        next.run(ctx, stream)
            .map(|response| {
                track(&response.errors);
                shape_response(response)
            })
            .boxed()
    }
}

fn track(errors: &[ServerError]) {
    for err in errors {
        let path = err
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => name.clone(),
                PathSegment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");

        match err.source::<AppError>() {
            Some(AppError::Store(_) | AppError::Internal(_) | AppError::MailDelivery(_)) => {
                error!(path = %path, error = %err.message, "GraphQL operation failed")
            }
            _ => warn!(path = %path, error = %err.message, "GraphQL operation returned an error"),
        }
    }
}
