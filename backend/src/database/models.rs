//! Rust structs that represent document-store collection mappings.
//!
//! Records are stamped explicitly: `stamped` assigns identity and both
//! timestamps when a draft is first persisted, and `touch` refreshes
//! `updatedAt` before every later write. The store layer calls these before it
//! hands a record to the database.

use async_graphql::{InputObject, SimpleObject};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node id used for v1 UUID generation.
const UUID_NODE_ID: [u8; 6] = [0x61, 0x63, 0x65, 0x78, 0x69, 0x73];

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn generate_id() -> String {
    Uuid::now_v1(&UUID_NODE_ID).to_string()
}

/// Next `updatedAt` value; always later than `previous`.
fn next_timestamp(previous: i64) -> i64 {
    now_millis().max(previous + 1)
}

/// An allowed action embedded in a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject, InputObject)]
#[graphql(input_name = "PermissionInfoInput")]
pub struct PermissionInfo {
    pub code: String,
    pub name: String,
}

/// A role that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    pub name: String,
    pub node_id: String,
    pub permissions: Vec<PermissionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id")]
    #[graphql(name = "_id")]
    pub id: String,
    pub name: String,
    pub node_id: String,
    pub permissions: Vec<PermissionInfo>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Role {
    pub fn stamped(draft: RoleDraft) -> Self {
        let now = now_millis();
        Self {
            id: generate_id(),
            name: draft.name,
            node_id: draft.node_id,
            permissions: draft.permissions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    /// Already hashed.
    pub password: String,
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    #[graphql(name = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[graphql(skip)]
    pub password: String,
    pub is_locked: bool,
    pub reason: Option<String>,
    pub role_id: Option<String>,
    #[graphql(skip)]
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[graphql(skip)]
    #[serde(default)]
    pub reset_password_expires: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn stamped(draft: UserDraft) -> Self {
        let now = now_millis();
        Self {
            id: generate_id(),
            username: draft.username,
            email: draft.email,
            password: draft.password,
            is_locked: false,
            reason: None,
            role_id: draft.role_id,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}
