//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the server port, token secret, mail credentials, cloud credentials and the
//! document store location. Values come from the process environment (after an
//! optional `.env` file is loaded by `main`) with the defaults the service ships with.

use std::{fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Deployment discriminator read from `NODE_ENV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Production,
    Testing,
    Development,
    Other(String),
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value {
            "production" => Environment::Production,
            "testing" => Environment::Testing,
            "development" => Environment::Development,
            other => Environment::Other(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Environment::Production => "production",
            Environment::Testing => "testing",
            Environment::Development => "development",
            Environment::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub user: String,
    pub pass: String,
    pub template_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MongoDB connection string. In-memory stores are used when absent.
    pub url: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub secret_key: String,
    pub domain: String,
    pub end_point: String,
    pub fe_url: String,
    pub mail: MailConfig,
    pub cloud: CloudConfig,
    pub database: DatabaseConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| {
                debug!("{key} not set, using default");
                default.to_string()
            })
        };

        let secret_key = var("SECRET_KEY", "");
        if secret_key.is_empty() {
            warn!("SECRET_KEY is empty, issued tokens are signed with an empty key");
        }

        Ok(Self {
            environment: Environment::parse(&var("NODE_ENV", "development")),
            port: parse("PORT", &var("PORT", "11048"))?,
            secret_key,
            domain: var("DOMAIN", "devcloud4.digihcs.com"),
            end_point: var("END_POINT", "graphql"),
            fe_url: var("FE_URL", ""),
            mail: MailConfig {
                user: var("MAIL_USER", ""),
                pass: var("MAIL_PASS", ""),
                template_path: PathBuf::from(var("MAIL_TEMPLATE", "assets/templates/index.html")),
            },
            cloud: CloudConfig {
                cloud_name: var("CLOUD_NAME", ""),
                api_key: var("API_KEY", "API key test"),
                api_secret: var("API_SECRET", ""),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
                name: var("DATABASE_NAME", "acexis"),
            },
        })
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value.parse().map_err(|err: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
