//! Custom error types specific to authentication failures.
//!
//! This module defines the errors that can occur while issuing or verifying
//! tokens, checking credentials and resetting passwords.

use thiserror::Error;

use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token subject no longer exists")]
    UnknownUser,

    #[error("user is locked")]
    Locked,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("reset token is invalid or expired")]
    InvalidResetToken,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Blocking(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
