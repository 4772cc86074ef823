use std::sync::Arc;

use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::executor::{Execute, WorkerPool};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::Method;

/// Entry point for building requests.
///
/// Holds the transport, the execution mechanism and the configuration
/// every builder starts from. Cheap to clone; clones share the same
/// worker pool.
///
/// The default transport wraps reqwest's blocking client, so the last
/// clone must not be dropped from inside an async runtime.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    executor: Arc<dyn Execute>,
    config: ClientConfig,
}

impl Client {
    /// Client with the default configuration (30 second timeout, four
    /// workers).
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Client with the reqwest transport and a worker pool sized from `config`.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        let executor = WorkerPool::new(config.effective_workers())?;
        Ok(Self::from_parts(config, Arc::new(transport), Arc::new(executor)))
    }

    /// Assemble a client from custom parts.
    pub fn from_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        executor: Arc<dyn Execute>,
    ) -> Self {
        Self {
            transport,
            executor,
            config,
        }
    }

    /// Configuration new builders start from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a request with an arbitrary method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(
            method,
            url,
            &self.config,
            Arc::clone(&self.transport),
            Arc::clone(&self.executor),
        )
    }

    /// Start a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start a POST request.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start a PUT request.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }
}
