//! User accounts exposed over GraphQL: sign-up, login, lookup, locking and
//! password reset.

pub mod models;
pub mod resolvers;

pub use resolvers::{UserMutation, UserQuery};
