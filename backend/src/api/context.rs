//! Access to the per-operation context from resolvers.

use async_graphql::Context;

use crate::database::models::User;
use crate::errors::AppError;
use crate::services::gateway::GraphQLContext;

pub trait ContextExt {
    fn gql(&self) -> Result<&GraphQLContext, AppError>;

    /// The authenticated caller, or an authentication error.
    fn current_user(&self) -> Result<&User, AppError>;
}

impl ContextExt for Context<'_> {
    fn gql(&self) -> Result<&GraphQLContext, AppError> {
        self.data::<GraphQLContext>()
            .map_err(|_| AppError::Internal("operation context missing".to_string()))
    }

    fn current_user(&self) -> Result<&User, AppError> {
        self.gql()?
            .current_user
            .as_ref()
            .ok_or_else(|| AppError::Authentication("you must be logged in".to_string()))
    }
}
