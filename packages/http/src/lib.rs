//! # jsonwire-http
//!
//! Callback-based JSON HTTP client.
//!
//! Requests are configured with a fluent builder, executed on a background
//! worker pool, and their response bodies streamed with progress
//! reporting. Exactly one outcome reaches the caller's callback: the
//! response decoded as a JSON object or array, or an error.
//!
//! ```ignore
//! use jsonwire_http::Client;
//!
//! let client = Client::new()?;
//!
//! client
//!     .get("https://api.example.com/users")
//!     .query("page", "2")
//!     .send_array(|result| match result {
//!         Ok((users, response)) => println!("{}: {} users", response.status(), users.len()),
//!         Err(e) => eprintln!("{}", e),
//!     })?;
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through the `log` facade. Install any logger in the host
//! application; per-request detail is switched on with
//! `RequestBuilder::logging(true)` or `ClientConfig::verbose`.

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod request;
pub mod response;
pub mod task;
pub mod transport;
pub mod types;

// Re-export main types
pub use builder::RequestBuilder;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use executor::{Execute, Job, ThreadPerRequest, WorkerPool};
pub use request::HttpRequest;
pub use response::{Reply, Response};
pub use task::RequestTask;
pub use transport::{Incoming, ReqwestTransport, Transport};
pub use types::{Method, Priority, Progress, Shape, Structured};
