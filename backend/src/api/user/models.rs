//! Input types accepted by the user mutations.

use async_graphql::InputObject;
use serde::Serialize;

use crate::database::models::{User, UserDraft};
use crate::services::validation::InputShape;

#[derive(Debug, Clone, Serialize, InputObject)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl InputShape for CreateUserInput {
    const SHAPE: &'static str = "CreateUserInput";
}

#[derive(Debug, Clone, Serialize, InputObject)]
pub struct LoginUserInput {
    pub username: String,
    pub password: String,
}

impl InputShape for LoginUserInput {
    const SHAPE: &'static str = "LoginUserInput";
}

/// Placeholder users served while mocks are enabled.
pub fn mock_users(count: usize) -> Vec<User> {
    (1..=count)
        .map(|n| {
            User::stamped(UserDraft {
                username: format!("mock-user-{n}"),
                email: format!("mock-user-{n}@example.com"),
                password: String::new(),
                role_id: None,
            })
        })
        .collect()
}
