//! Core `adapters` crate for the external services the backend talks to.
//!
//! This crate defines the `Mailer` trait for outgoing mail and the memcached
//! client backing the persisted-query cache, and provides a central point for
//! accessing their concrete implementations (SMTP, memcached).

pub mod errors;
pub mod memcached;
pub mod models;
pub mod smtp;

pub use errors::{CacheError, MailError};
pub use memcached::MemcachedCache;
pub use models::{CacheSettings, ResetPasswordMail, SmtpSettings};
pub use smtp::{Mailer, SmtpMailer};
