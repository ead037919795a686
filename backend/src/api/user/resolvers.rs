//! GraphQL resolvers for user accounts.

use std::sync::Arc;

use async_graphql::{Context, Object, Result, ResultExt};
use tracing::info;

use super::models::{mock_users, CreateUserInput, LoginUserInput};
use crate::api::context::ContextExt;
use crate::api::Mocks;
use crate::auth::{AuthService, LoginResponse};
use crate::database::models::{now_millis, User};
use crate::database::Database;
use crate::errors::AppError;
use crate::services::pubsub::Event;
use crate::services::validation::ValidationPipe;

const MIN_MOCK_USERS: usize = 2;
const MAX_MOCK_USERS: usize = 6;

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    async fn hello(&self) -> &'static str {
        "world"
    }

    /// The caller's own account.
    async fn me(&self, ctx: &Context<'_>) -> Result<User> {
        ctx.current_user().cloned().extend()
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 0)] offset: u64,
        #[graphql(default = 20, validator(minimum = 1))] limit: i64,
    ) -> Result<Vec<User>> {
        if ctx.data_opt::<Mocks>().is_some() {
            let spread = (MAX_MOCK_USERS - MIN_MOCK_USERS + 1) as i64;
            let count = MIN_MOCK_USERS + now_millis().rem_euclid(spread) as usize;
            return Ok(mock_users(count));
        }

        let db = ctx.data::<Database>()?;
        db.users.list(offset, limit).await.map_err(AppError::from).extend()
    }

    async fn user(&self, ctx: &Context<'_>, id: String) -> Result<Option<User>> {
        let db = ctx.data::<Database>()?;
        db.users.find_by_id(&id).await.map_err(AppError::from).extend()
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    async fn create_user(&self, ctx: &Context<'_>, input: CreateUserInput) -> Result<User> {
        ctx.data::<ValidationPipe>()?.validate(&input).extend()?;

        let auth = ctx.data::<Arc<AuthService>>()?;
        let user = auth
            .create_user(&input.username, &input.email, &input.password)
            .await
            .map_err(AppError::from)
            .extend()?;

        ctx.gql().extend()?.pub_sub.publish(Event::UserCreated(user.clone()));
        Ok(user)
    }

    async fn login(&self, ctx: &Context<'_>, input: LoginUserInput) -> Result<LoginResponse> {
        ctx.data::<ValidationPipe>()?.validate(&input).extend()?;

        let auth = ctx.data::<Arc<AuthService>>()?;
        auth.login(&input.username, &input.password)
            .await
            .map_err(AppError::from)
            .extend()
    }

    /// Locks an unlocked account and unlocks a locked one.
    async fn lock_and_unlock_user(
        &self,
        ctx: &Context<'_>,
        id: String,
        reason: String,
    ) -> Result<User> {
        let caller = ctx.current_user().extend()?;
        let auth = ctx.data::<Arc<AuthService>>()?;

        let user = auth.toggle_lock(&id, &reason).await.map_err(AppError::from).extend()?;
        info!(user_id = %user.id, by = %caller.id, "Lock toggled");
        Ok(user)
    }

    async fn forgot_password(&self, ctx: &Context<'_>, email: String) -> Result<bool> {
        let host = ctx.gql().extend()?.host.clone().unwrap_or_default();
        let auth = ctx.data::<Arc<AuthService>>()?;

        auth.request_password_reset(&email, &host).await.extend()?;
        Ok(true)
    }

    async fn reset_password(
        &self,
        ctx: &Context<'_>,
        token: String,
        password: String,
    ) -> Result<bool> {
        let auth = ctx.data::<Arc<AuthService>>()?;

        auth.reset_password(&token, &password)
            .await
            .map_err(AppError::from)
            .extend()?;
        Ok(true)
    }
}
