//! In-process stores used when no document store is configured.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{Role, RoleDraft, User, UserDraft};
use super::queries::{RoleStore, UserStore};
use super::StoreError;

#[derive(Default)]
pub struct MemoryRoleStore {
    roles: RwLock<Vec<Role>>,
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn insert(&self, draft: RoleDraft) -> Result<Role, StoreError> {
        let role = Role::stamped(draft);
        self.roles.write().await.push(role.clone());
        Ok(role)
    }

    async fn update(&self, mut role: Role) -> Result<Role, StoreError> {
        let mut roles = self.roles.write().await;
        let slot = roles
            .iter_mut()
            .find(|existing| existing.id == role.id)
            .ok_or_else(|| StoreError::NotFound(format!("role {}", role.id)))?;

        role.touch();
        *slot = role.clone();
        Ok(role)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.read().await.iter().find(|role| role.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Role>, StoreError> {
        let mut roles = self.roles.read().await.clone();
        roles.sort_by_key(|role| role.created_at);
        Ok(roles)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    async fn find_where<P>(&self, predicate: P) -> Option<User>
    where
        P: Fn(&User) -> bool,
    {
        self.users.read().await.iter().find(|user| predicate(*user)).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, draft: UserDraft) -> Result<User, StoreError> {
        let user = User::stamped(draft);
        self.users.write().await.push(user.clone());
        Ok(user)
    }

    async fn update(&self, mut user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let slot = users
            .iter_mut()
            .find(|existing| existing.id == user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;

        user.touch();
        *slot = user.clone();
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|user| user.id == id).await)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|user| user.username == username).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|user| user.email == email).await)
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_where(|user| user.reset_password_token.as_deref() == Some(token))
            .await)
    }

    async fn list(&self, offset: u64, limit: i64) -> Result<Vec<User>, StoreError> {
        let mut users = self.users.read().await.clone();
        users.sort_by_key(|user| user.created_at);

        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(users.into_iter().skip(offset as usize).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PermissionInfo;

    fn draft(name: &str) -> RoleDraft {
        RoleDraft {
            name: name.to_string(),
            node_id: "node-1".to_string(),
            permissions: vec![PermissionInfo {
                code: "ROLE_READ".to_string(),
                name: "Read roles".to_string(),
            }],
        }
    }

    fn user_draft(username: &str) -> UserDraft {
        UserDraft {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hash".to_string(),
            role_id: None,
        }
    }

    #[tokio::test]
    async fn roles_are_listed_in_creation_order() {
        let store = MemoryRoleStore::default();
        let first = store.insert(draft("admin")).await.unwrap();
        let second = store.insert(draft("editor")).await.unwrap();

        let roles = store.find_all().await.unwrap();
        assert_eq!(roles.iter().map(|r| &r.id).collect::<Vec<_>>(), vec![&first.id, &second.id]);
    }

    #[tokio::test]
    async fn update_touches_only_updated_at() {
        let store = MemoryRoleStore::default();
        let role = store.insert(draft("admin")).await.unwrap();

        let mut changed = role.clone();
        changed.name = "owner".to_string();
        let updated = store.update(changed).await.unwrap();

        assert_eq!(updated.created_at, role.created_at);
        assert!(updated.updated_at > role.updated_at);
        assert_eq!(store.find_by_id(&role.id).await.unwrap().unwrap().name, "owner");
    }

    #[tokio::test]
    async fn updating_an_unknown_role_fails() {
        let store = MemoryRoleStore::default();
        let orphan = Role::stamped(draft("ghost"));

        assert!(matches!(store.update(orphan).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn users_are_paged() {
        let store = MemoryUserStore::default();
        for name in ["alice", "bobby", "carol"] {
            store.insert(user_draft(name)).await.unwrap();
        }

        let page = store.list(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "bobby");
        assert!(store.find_by_email("carol@example.com").await.unwrap().is_some());
    }
}
