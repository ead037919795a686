//! Memcached adapter backing the persisted-query cache.
//!
//! The memcached client is blocking, so every call runs on the blocking pool.
//! The connection to the cluster is established lazily on first use. A cluster
//! that keeps failing is skipped for the configured retry interval, and callers
//! treat that as a cache miss.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::errors::CacheError;
use crate::models::CacheSettings;

const DEFAULT_PORT: u16 = 11211;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const KEY_PREFIX: &str = "apq:";

pub struct MemcachedCache {
    settings: CacheSettings,
    client: OnceCell<Arc<memcache::Client>>,
    /// Epoch millis before which the cluster is not contacted.
    unavailable_until: AtomicI64,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

impl MemcachedCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
            unavailable_until: AtomicI64::new(0),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Connection URLs for the configured servers, defaulting the port.
    pub fn urls(&self) -> Vec<String> {
        self.settings
            .servers
            .iter()
            .map(|server| {
                if server.starts_with("memcache://") {
                    server.clone()
                } else if server.contains(':') {
                    format!("memcache://{server}")
                } else {
                    format!("memcache://{server}:{DEFAULT_PORT}")
                }
            })
            .collect()
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let key = cache_key(key);
        self.run(move |client| client.get::<String>(&key)).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let key = cache_key(key);
        let value = value.to_string();
        self.run(move |client| client.set(&key, value.as_str(), 0)).await
    }

    pub fn is_backing_off(&self) -> bool {
        now_millis() < self.unavailable_until.load(Ordering::Relaxed)
    }

    fn back_off(&self) {
        let until = now_millis() + self.settings.retry.as_millis() as i64;
        self.unavailable_until.store(until, Ordering::Relaxed);
        warn!(
            retry_in_ms = self.settings.retry.as_millis() as u64,
            "Persisted query cache unavailable, backing off"
        );
    }

    async fn client(&self) -> Result<Arc<memcache::Client>, CacheError> {
        self.client
            .get_or_try_init(|| async {
                let urls = self.urls();
                let connect = tokio::task::spawn_blocking(move || memcache::Client::connect(urls));

                tokio::time::timeout(CONNECT_TIMEOUT, connect)
                    .await
                    .map_err(|_| CacheError::Connection("timed out".to_string()))?
                    .map_err(|err| CacheError::Connection(err.to_string()))?
                    .map(Arc::new)
                    .map_err(|err| CacheError::Connection(err.to_string()))
            })
            .await
            .cloned()
    }

    async fn run<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: Fn(&memcache::Client) -> Result<T, memcache::MemcacheError> + Clone + Send + 'static,
    {
        if self.is_backing_off() {
            return Err(CacheError::Unavailable);
        }

        let client = match self.client().await {
            Ok(client) => client,
            Err(err) => {
                self.back_off();
                return Err(err);
            }
        };

        let mut last_error = CacheError::Unavailable;
        for attempt in 0..=self.settings.retries {
            let client = client.clone();
            let operation = operation.clone();

            let outcome = tokio::task::spawn_blocking(move || operation(&client))
                .await
                .map_err(|err| CacheError::Operation(err.to_string()))
                .and_then(|result| result.map_err(|err| CacheError::Operation(err.to_string())));

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) => {
                    debug!(attempt, error = %err, "Memcached operation failed");
                    last_error = err;
                }
            }
        }

        self.back_off();
        Err(last_error)
    }
}

fn cache_key(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_target_three_servers() {
        let settings = CacheSettings::default();

        assert_eq!(settings.servers.len(), 3);
        assert_eq!(settings.retries, 10);
        assert_eq!(settings.retry, Duration::from_secs(10));
    }

    #[test]
    fn urls_default_the_memcached_port() {
        let cache = MemcachedCache::new(CacheSettings {
            servers: vec![
                "memcached-server-1".to_string(),
                "cache.internal:11300".to_string(),
                "memcache://already:1".to_string(),
            ],
            ..CacheSettings::default()
        });

        assert_eq!(
            cache.urls(),
            vec![
                "memcache://memcached-server-1:11211",
                "memcache://cache.internal:11300",
                "memcache://already:1",
            ]
        );
    }

    #[tokio::test]
    async fn backing_off_cluster_is_not_contacted() {
        let cache = MemcachedCache::new(CacheSettings::default());
        cache.back_off();

        assert!(cache.is_backing_off());
        assert!(matches!(cache.get("abc").await, Err(CacheError::Unavailable)));
        assert!(cache.client.get().is_none());
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(cache_key("ecf4edb4"), "apq:ecf4edb4");
    }
}
