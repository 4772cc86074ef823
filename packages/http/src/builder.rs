//! Fluent request configuration and submission.
//!
//! A `RequestBuilder` is configured on one thread with chained calls and
//! then consumed by exactly one `send*` call. Because every `send*` takes
//! the builder by value and the callback as an argument, a request cannot
//! be submitted twice or without a callback.
//!
//! ```ignore
//! use jsonwire_http::{Client, Priority};
//!
//! let client = Client::new()?;
//! client
//!     .post("https://api.example.com/items")
//!     .query("draft", "true")
//!     .header("Authorization", "Bearer token")
//!     .json(&serde_json::json!({"name": "widget"}))?
//!     .priority(Priority::High)
//!     .on_progress(|p| println!("{:?}%", p.percent()))
//!     .send_object(|result| match result {
//!         Ok((body, response)) => println!("{} {:?}", response.status(), body),
//!         Err(e) => eprintln!("request failed: {}", e),
//!     })?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::executor::Execute;
use crate::request::{HttpRequest, APPLICATION_JSON, CONTENT_TYPE, TEXT_PLAIN};
use crate::response::{Reply, Response};
use crate::task::RequestTask;
use crate::transport::Transport;
use crate::types::{Method, Priority, Progress, Shape};

/// A request being configured. Consumed by one of the `send*` methods.
pub struct RequestBuilder {
    request: HttpRequest,
    transport: Arc<dyn Transport>,
    executor: Arc<dyn Execute>,
    chunk_size: usize,
    verbose: bool,
    priority: Priority,
    progress: Option<Box<dyn FnMut(Progress) + Send>>,
}

impl RequestBuilder {
    pub(crate) fn new(
        method: Method,
        url: impl Into<String>,
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        executor: Arc<dyn Execute>,
    ) -> Self {
        Self {
            request: HttpRequest::new(method, url),
            transport,
            executor,
            chunk_size: config.effective_chunk_size(),
            verbose: config.verbose,
            priority: config.priority,
            progress: None,
        }
    }

    /// Replace the target URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.request.url = url.into();
        self
    }

    /// Add a query parameter, replacing an earlier value for the same name.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query.insert(name.into(), value.into());
        self
    }

    /// Merge query parameters; later values win.
    pub fn queries<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in pairs {
            self.request.query.insert(name.into(), value.into());
        }
        self
    }

    /// Set a header, replacing any header whose name differs only in case.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.set_header(name, value);
        self
    }

    /// Merge headers; later values win.
    pub fn headers<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in pairs {
            self.request.set_header(name, value);
        }
        self
    }

    /// JSON object body; sets `Content-Type: application/json`.
    pub fn json_object(self, body: &Map<String, Value>) -> Self {
        let bytes = Value::Object(body.clone()).to_string().into_bytes();
        self.typed_body(bytes, APPLICATION_JSON)
    }

    /// JSON array-of-objects body; sets `Content-Type: application/json`.
    pub fn json_list(self, items: &[Map<String, Value>]) -> Self {
        let array = Value::Array(items.iter().cloned().map(Value::Object).collect());
        self.typed_body(array.to_string().into_bytes(), APPLICATION_JSON)
    }

    /// Any serializable value as a JSON body; sets `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(Error::Serialize)?;
        Ok(self.typed_body(bytes, APPLICATION_JSON))
    }

    /// Plain text body; sets `Content-Type: text/plain`.
    pub fn text(self, body: impl Into<String>) -> Self {
        self.typed_body(body.into().into_bytes(), TEXT_PLAIN)
    }

    /// Raw body bytes. Leaves `Content-Type` untouched.
    pub fn bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    fn typed_body(mut self, bytes: Vec<u8>, content_type: &str) -> Self {
        self.request.body = Some(bytes);
        self.request.set_header(CONTENT_TYPE, content_type);
        self
    }

    /// Log request and response details for this request.
    pub fn logging(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Scheduling hint for the executor.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Run this request on a different execution mechanism.
    pub fn executor(mut self, executor: Arc<dyn Execute>) -> Self {
        self.executor = executor;
        self
    }

    /// Observe body transfer. Only called when the server sends a
    /// `Content-Length`.
    pub fn on_progress<F>(mut self, observer: F) -> Self
    where
        F: FnMut(Progress) + Send + 'static,
    {
        self.progress = Some(Box::new(observer));
        self
    }

    /// The request as configured so far.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Finish configuration without submitting.
    pub fn build(mut self) -> HttpRequest {
        self.request.ensure_content_type();
        self.request
    }

    /// Submit, delivering the body decoded into `shape`.
    pub fn send<F>(self, shape: Shape, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        self.submit(move |result| callback(result.and_then(|r| Reply::from_response(r, shape))))
    }

    /// Submit, delivering the body as a JSON object.
    pub fn send_object<F>(self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<(Map<String, Value>, Response)>) + Send + 'static,
    {
        self.submit(move |result| {
            callback(result.and_then(|response| Ok((response.json_object()?, response))))
        })
    }

    /// Submit, delivering the body as a JSON array.
    pub fn send_array<F>(self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<(Vec<Value>, Response)>) + Send + 'static,
    {
        self.submit(move |result| {
            callback(result.and_then(|response| Ok((response.json_array()?, response))))
        })
    }

    /// Submit, deserializing the body into `T`.
    pub fn send_json<T, F>(self, callback: F) -> Result<()>
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<(T, Response)>) + Send + 'static,
    {
        self.submit(move |result| {
            callback(result.and_then(|response| Ok((response.json::<T>()?, response))))
        })
    }

    /// Submit, delivering the undecoded response.
    pub fn send_raw<F>(self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        self.submit(callback)
    }

    /// Schedule the request task. Returns as soon as it is queued; the
    /// callback runs later on the executor's thread, exactly once, after
    /// the connection has been released. If scheduling itself fails the
    /// error is returned here and the callback is never called.
    fn submit<F>(mut self, deliver: F) -> Result<()>
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        self.request.ensure_content_type();

        let submitted_at = Instant::now();
        let mut task = RequestTask::new(self.request, self.transport)
            .chunk_size(self.chunk_size)
            .verbose(self.verbose)
            .submitted_at(submitted_at);
        if let Some(progress) = self.progress {
            task = task.on_progress(progress);
        }

        log::debug!(
            "Submitting {} {} at {} priority",
            task.request().method,
            task.request().url,
            self.priority
        );

        self.executor
            .execute(self.priority, Box::new(move || deliver(task.run())))
    }
}
