//! Subscription root fed by the publish/subscribe broker.

use async_graphql::{Context, Result, ResultExt, Subscription};
use futures::Stream;

use crate::api::context::ContextExt;
use crate::database::models::{Role, User};

#[derive(Default)]
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    async fn user_created(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = User>> {
        Ok(ctx.gql().extend()?.pub_sub.users_created())
    }

    async fn role_changed(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Role>> {
        Ok(ctx.gql().extend()?.pub_sub.roles_changed())
    }
}
