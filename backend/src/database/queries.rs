//! Database query functions (Data Access Objects).
//!
//! This module centralizes all direct database operations behind the
//! `RoleStore` and `UserStore` traits, with the MongoDB implementations used in
//! deployment. Stores stamp records before persisting them.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database as MongoDatabase};

use super::models::{Role, RoleDraft, User, UserDraft};
use super::StoreError;

pub const ROLES_COLLECTION: &str = "roles";
pub const USERS_COLLECTION: &str = "users";

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn insert(&self, draft: RoleDraft) -> Result<Role, StoreError>;

    /// Persists changes to an existing role, refreshing `updatedAt`.
    async fn update(&self, role: Role) -> Result<Role, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>, StoreError>;

    /// All roles, oldest first.
    async fn find_all(&self) -> Result<Vec<Role>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, draft: UserDraft) -> Result<User, StoreError>;

    async fn update(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// A page of users, oldest first.
    async fn list(&self, offset: u64, limit: i64) -> Result<Vec<User>, StoreError>;
}

pub struct MongoRoleStore {
    collection: Collection<Role>,
}

impl MongoRoleStore {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            collection: db.collection(ROLES_COLLECTION),
        }
    }
}

#[async_trait]
impl RoleStore for MongoRoleStore {
    async fn insert(&self, draft: RoleDraft) -> Result<Role, StoreError> {
        let role = Role::stamped(draft);
        self.collection.insert_one(&role).await?;
        Ok(role)
    }

    async fn update(&self, mut role: Role) -> Result<Role, StoreError> {
        role.touch();
        let result = self
            .collection
            .replace_one(doc! { "_id": &role.id }, &role)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::NotFound(format!("role {}", role.id)));
        }
        Ok(role)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_all(&self) -> Result<Vec<Role>, StoreError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            collection: db.collection(USERS_COLLECTION),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, draft: UserDraft) -> Result<User, StoreError> {
        let user = User::stamped(draft);
        self.collection.insert_one(&user).await?;
        Ok(user)
    }

    async fn update(&self, mut user: User) -> Result<User, StoreError> {
        user.touch();
        let result = self
            .collection
            .replace_one(doc! { "_id": &user.id }, &user)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.collection.find_one(doc! { "username": username }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .collection
            .find_one(doc! { "resetPasswordToken": token })
            .await?)
    }

    async fn list(&self, offset: u64, limit: i64) -> Result<Vec<User>, StoreError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": 1 })
            .skip(offset)
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
