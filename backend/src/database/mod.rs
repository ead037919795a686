//! Module for document-store connection setup and common utilities.
//!
//! This module is responsible for connecting to MongoDB and handing out the
//! role and user stores the rest of the backend works against. When no
//! connection string is configured, in-process stores are used instead.

pub mod memory;
pub mod models;
pub mod queries;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use memory::{MemoryRoleStore, MemoryUserStore};
use queries::{MongoRoleStore, MongoUserStore, RoleStore, UserStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),
}

#[derive(Clone)]
pub struct Database {
    pub roles: Arc<dyn RoleStore>,
    pub users: Arc<dyn UserStore>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            roles: Arc::new(MemoryRoleStore::default()),
            users: Arc::new(MemoryUserStore::default()),
        }
    }
}

pub async fn connect(config: &DatabaseConfig) -> Result<Database, StoreError> {
    let Some(url) = &config.url else {
        warn!("DATABASE_URL not set, using in-memory stores");
        return Ok(Database::in_memory());
    };

    let client = mongodb::Client::with_uri_str(url).await?;
    let db = client.database(&config.name);
    info!(database = %config.name, "Database connected");

    Ok(Database {
        roles: Arc::new(MongoRoleStore::new(&db)),
        users: Arc::new(MongoUserStore::new(&db)),
    })
}
