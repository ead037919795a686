//! Automatic persisted queries.
//!
//! Clients may send only the SHA-256 hash of a query in
//! `extensions.persistedQuery`. A known hash is expanded to its query text; an
//! unknown one is answered with `PersistedQueryNotFound`, after which the client
//! resends hash and text together and the pair is stored. Cache failures are
//! treated like misses.

use std::sync::Arc;

use adapters::MemcachedCache;
use async_graphql::{
    extensions::{Extension, ExtensionContext, ExtensionFactory, NextPrepareRequest},
    from_value, ErrorExtensionValues, Request, ServerError, ServerResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const EXTENSION_KEY: &str = "persistedQuery";
const SUPPORTED_VERSION: u32 = 1;

/// Hash to query text storage.
#[async_trait]
pub trait PersistedQueryStore: Send + Sync + 'static {
    async fn load(&self, hash: &str) -> Option<String>;

    async fn store(&self, hash: &str, query: &str);
}

#[async_trait]
impl PersistedQueryStore for MemcachedCache {
    async fn load(&self, hash: &str) -> Option<String> {
        match self.get(hash).await {
            Ok(query) => query,
            Err(err) => {
                debug!(error = %err, "Persisted query lookup failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, hash: &str, query: &str) {
        if let Err(err) = self.set(hash, query).await {
            warn!(error = %err, "Failed to store persisted query");
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQuery {
    version: u32,
    sha256_hash: String,
}

pub fn query_hash(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

pub struct PersistedQueries {
    store: Arc<dyn PersistedQueryStore>,
}

impl PersistedQueries {
    pub fn new(store: Arc<dyn PersistedQueryStore>) -> Self {
        Self { store }
    }
}

impl ExtensionFactory for PersistedQueries {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(PersistedQueriesExtension {
            store: self.store.clone(),
        })
    }
}

struct PersistedQueriesExtension {
    store: Arc<dyn PersistedQueryStore>,
}

fn protocol_error(message: &str, code: &str) -> ServerError {
    let mut extensions = ErrorExtensionValues::default();
    extensions.set("code", code);

    let mut err = ServerError::new(message, None);
    err.extensions = Some(extensions);
    err
}

#[async_trait]
impl Extension for PersistedQueriesExtension {
    async fn prepare_request(
        &self,
        ctx: &ExtensionContext<'_>,
        mut request: Request,
        next: NextPrepareRequest<'_>,
    ) -> ServerResult<Request> {
        let Some(value) = request.extensions.remove(EXTENSION_KEY) else {
            return next.run(ctx, request).await;
        };

        let persisted: PersistedQuery = from_value(value)
            .map_err(|_| protocol_error("Invalid \"PersistedQuery\" extension", "BAD_USER_INPUT"))?;

        if persisted.version != SUPPORTED_VERSION {
            return Err(protocol_error(
                "PersistedQueryNotSupported",
                "PERSISTED_QUERY_NOT_SUPPORTED",
            ));
        }

        if request.query.is_empty() {
            match self.store.load(&persisted.sha256_hash).await {
                Some(query) => request.query = query,
                None => {
                    return Err(protocol_error(
                        "PersistedQueryNotFound",
                        "PERSISTED_QUERY_NOT_FOUND",
                    ))
                }
            }
        } else if query_hash(&request.query) != persisted.sha256_hash {
            return Err(protocol_error("provided sha does not match query", "BAD_USER_INPUT"));
        } else {
            self.store.store(&persisted.sha256_hash, &request.query).await;
        }

        next.run(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema, Value};
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryQueryStore {
        queries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl PersistedQueryStore for MemoryQueryStore {
        async fn load(&self, hash: &str) -> Option<String> {
            self.queries.lock().await.get(hash).cloned()
        }

        async fn store(&self, hash: &str, query: &str) {
            self.queries.lock().await.insert(hash.to_string(), query.to_string());
        }
    }

    struct Query;

    #[Object]
    impl Query {
        async fn value(&self) -> i32 {
            100
        }
    }

    fn schema(store: Arc<MemoryQueryStore>) -> Schema<Query, EmptyMutation, EmptySubscription> {
        Schema::build(Query, EmptyMutation, EmptySubscription)
            .extension(PersistedQueries::new(store))
            .finish()
    }

    fn persisted(query: &str, hash: &str) -> Request {
        let extension = json!({ "version": 1, "sha256Hash": hash });
        let mut request = Request::new(query);
        request
            .extensions
            .insert(EXTENSION_KEY.to_string(), Value::from_json(extension).unwrap());
        request
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        assert_eq!(
            query_hash("{ value }"),
            hex::encode(Sha256::digest(b"{ value }"))
        );
        assert_eq!(query_hash("").len(), 64);
    }

    #[tokio::test]
    async fn unknown_hash_asks_for_the_query() {
        let schema = schema(Arc::new(MemoryQueryStore::default()));

        let response = schema.execute(persisted("", &query_hash("{ value }"))).await;
        assert_eq!(response.errors[0].message, "PersistedQueryNotFound");
    }

    #[tokio::test]
    async fn registered_query_is_served_by_hash() {
        let store = Arc::new(MemoryQueryStore::default());
        let schema = schema(store.clone());
        let hash = query_hash("{ value }");

        let first = schema.execute(persisted("{ value }", &hash)).await;
        assert!(first.errors.is_empty());
        assert_eq!(store.load(&hash).await.as_deref(), Some("{ value }"));

        let second = schema.execute(persisted("", &hash)).await;
        assert!(second.errors.is_empty());
        assert_eq!(second.data.into_json().unwrap(), json!({ "value": 100 }));
    }

    #[tokio::test]
    async fn mismatched_hash_is_rejected_and_not_stored() {
        let store = Arc::new(MemoryQueryStore::default());
        let schema = schema(store.clone());

        let response = schema.execute(persisted("{ value }", "deadbeef")).await;
        assert_eq!(response.errors[0].message, "provided sha does not match query");
        assert!(store.load("deadbeef").await.is_none());
    }

    #[tokio::test]
    async fn plain_requests_are_untouched() {
        let schema = schema(Arc::new(MemoryQueryStore::default()));

        let response = schema.execute("{ value }").await;
        assert!(response.errors.is_empty());
    }
}
