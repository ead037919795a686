//! Data structures for authentication-related entities.
//!
//! This module defines the JWT claims carried by access tokens and the login
//! response returned to clients.

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct LoginResponse {
    pub token: String,
}
