//! GraphQL resolvers for roles.

use async_graphql::{Context, Object, Result, ResultExt};

use super::models::{CreateRoleInput, UpdateRoleInput};
use crate::api::context::ContextExt;
use crate::database::models::Role;
use crate::database::Database;
use crate::errors::AppError;
use crate::services::pubsub::Event;
use crate::services::validation::ValidationPipe;

#[derive(Default)]
pub struct RoleQuery;

#[Object]
impl RoleQuery {
    /// All roles in creation order.
    async fn roles(&self, ctx: &Context<'_>) -> Result<Vec<Role>> {
        let db = ctx.data::<Database>()?;
        db.roles.find_all().await.map_err(AppError::from).extend()
    }

    async fn role(&self, ctx: &Context<'_>, id: String) -> Result<Option<Role>> {
        let db = ctx.data::<Database>()?;
        db.roles.find_by_id(&id).await.map_err(AppError::from).extend()
    }
}

#[derive(Default)]
pub struct RoleMutation;

#[Object]
impl RoleMutation {
    async fn create_role(&self, ctx: &Context<'_>, input: CreateRoleInput) -> Result<Role> {
        ctx.current_user().extend()?;
        ctx.data::<ValidationPipe>()?.validate(&input).extend()?;

        let db = ctx.data::<Database>()?;
        let role = db.roles.insert(input.into()).await.map_err(AppError::from).extend()?;

        ctx.gql().extend()?.pub_sub.publish(Event::RoleChanged(role.clone()));
        Ok(role)
    }

    async fn update_role(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: UpdateRoleInput,
    ) -> Result<Role> {
        ctx.current_user().extend()?;
        ctx.data::<ValidationPipe>()?.validate(&input).extend()?;

        let db = ctx.data::<Database>()?;
        let mut role = db
            .roles
            .find_by_id(&id)
            .await
            .map_err(AppError::from)
            .extend()?
            .ok_or_else(|| AppError::NotFound(format!("role {id}")))
            .extend()?;

        role.name = input.name;
        role.node_id = input.node_id;
        role.permissions = input.permissions;

        let role = db.roles.update(role).await.map_err(AppError::from).extend()?;

        ctx.gql().extend()?.pub_sub.publish(Event::RoleChanged(role.clone()));
        Ok(role)
    }
}
