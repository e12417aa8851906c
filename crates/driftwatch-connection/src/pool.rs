//! Keyed HTTP client pool.
//!
//! One `reqwest::Client` per logical target, built lazily on first use and
//! reused thereafter. Construction is the expensive part (TLS config,
//! connection pool warmup) so we guard it with a double-checked lock rather
//! than rebuilding on every lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use driftwatch_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build client for target '{target}': {source}")]
    Build {
        target: String,
        #[source]
        source: reqwest::Error,
    },
}

impl HasErrorKind for PoolError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
pub struct ClientPool {
    config: PoolConfig,
    clients: RwLock<HashMap<String, Arc<reqwest::Client>>>,
}

impl ClientPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn client_for(&self, target: &str) -> Result<Arc<reqwest::Client>, PoolError> {
        if let Some(client) = self.clients.read().unwrap().get(target) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().unwrap();
        if let Some(client) = clients.get(target) {
            return Ok(client.clone());
        }

        let built = self.build_client(target)?;
        clients.insert(target.to_string(), built.clone());
        Ok(built)
    }

    fn build_client(&self, target: &str) -> Result<Arc<reqwest::Client>, PoolError> {
        // HTTP/2 is negotiated via TLS ALPN automatically; no explicit
        // opt-in needed here.
        reqwest::Client::builder()
            .pool_idle_timeout(self.config.pool_idle_timeout)
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .build()
            .map(Arc::new)
            .map_err(|source| PoolError::Build {
                target: target.to_string(),
                source,
            })
    }
}
