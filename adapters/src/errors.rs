//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while rendering or delivering mail
//! and while talking to the persisted-query cache cluster.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("cannot read mail template {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render mail: {0}")]
    Render(String),

    #[error("invalid mail address: {0}")]
    Address(String),

    /// The configured sender (`MAIL_USER`) is not a mail address.
    #[error("invalid sender address: {0}")]
    Sender(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache operation failed: {0}")]
    Operation(String),

    #[error("cache cluster unavailable")]
    Unavailable,
}
