//! Generic data models for the `adapters` crate.
//!
//! These models describe what the backend hands to an adapter (a reset mail to
//! send) and how each adapter is configured, independent of the concrete
//! transport behind it.

use std::{path::PathBuf, time::Duration};

/// A password-reset notification for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPasswordMail {
    pub email: String,
    /// Host the originating request was addressed to; used to build the link.
    pub host: String,
    pub token: String,
}

/// Credentials and template location for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub relay: String,
    pub user: String,
    pub pass: String,
    pub sender_name: String,
    pub template_path: PathBuf,
}

impl SmtpSettings {
    pub fn gmail(user: String, pass: String, template_path: PathBuf) -> Self {
        Self {
            relay: "smtp.gmail.com".to_string(),
            user,
            pass,
            sender_name: "Acexis 📧".to_string(),
            template_path,
        }
    }
}

/// Memcached cluster settings for the persisted-query cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub servers: Vec<String>,
    /// Extra attempts made for a failing operation before giving up.
    pub retries: u32,
    /// How long a failed cluster is left alone before it is tried again.
    pub retry: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            servers: vec![
                "memcached-server-1".to_string(),
                "memcached-server-2".to_string(),
                "memcached-server-3".to_string(),
            ],
            retries: 10,
            retry: Duration::from_millis(10_000),
        }
    }
}
