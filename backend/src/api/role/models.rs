//! Input types accepted by the role mutations.

use async_graphql::InputObject;
use serde::Serialize;

use crate::database::models::{PermissionInfo, RoleDraft};
use crate::services::validation::InputShape;

#[derive(Debug, Clone, Serialize, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleInput {
    pub name: String,
    pub node_id: String,
    #[graphql(default)]
    pub permissions: Vec<PermissionInfo>,
}

impl InputShape for CreateRoleInput {
    const SHAPE: &'static str = "CreateRoleInput";
}

impl From<CreateRoleInput> for RoleDraft {
    fn from(input: CreateRoleInput) -> Self {
        Self {
            name: input.name,
            node_id: input.node_id,
            permissions: input.permissions,
        }
    }
}

#[derive(Debug, Clone, Serialize, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleInput {
    pub name: String,
    pub node_id: String,
    #[graphql(default)]
    pub permissions: Vec<PermissionInfo>,
}

impl InputShape for UpdateRoleInput {
    const SHAPE: &'static str = "UpdateRoleInput";
}
