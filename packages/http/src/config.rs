//! Client configuration.
//!
//! Every knob that used to live in process-wide state (the diagnostic flag)
//! or was left unset (timeouts) is an explicit field here. The struct is
//! serde-friendly so a host can keep it in a JSON settings file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Priority;

/// Default overall request timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default connect timeout, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Size of each read from the response body.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Default number of worker threads in the shared pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Settings shared by every request a `Client` builds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Log request and response details for every request.
    pub verbose: bool,

    /// Overall deadline per request. `None` waits forever.
    pub timeout_ms: Option<u64>,

    /// Deadline for establishing the connection. `None` waits forever.
    pub connect_timeout_ms: Option<u64>,

    /// Bytes requested per read while streaming a body.
    pub chunk_size: usize,

    /// Worker threads in the shared pool.
    pub workers: usize,

    /// Priority used when a request does not set one.
    pub priority: Priority,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            connect_timeout_ms: Some(DEFAULT_CONNECT_TIMEOUT_MS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            priority: Priority::Normal,
        }
    }
}

impl ClientConfig {
    /// Configuration with no deadlines at all, matching a bare platform
    /// connection.
    pub fn unbounded() -> Self {
        Self {
            timeout_ms: None,
            connect_timeout_ms: None,
            ..Default::default()
        }
    }

    /// Log details for every request by default.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Overall request deadline; `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map(millis);
        self
    }

    /// Connection deadline; `None` waits forever.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout_ms = timeout.map(millis);
        self
    }

    /// Number of worker threads in the shared pool.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Bytes requested per body read.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Overall request deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Connection deadline.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Chunk size, never zero.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Worker count, never zero.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
