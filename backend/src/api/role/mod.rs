//! Roles and their permissions exposed over GraphQL.

pub mod models;
pub mod resolvers;

pub use resolvers::{RoleMutation, RoleQuery};
