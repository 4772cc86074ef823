//! The request task: one network exchange, run on a background thread.
//!
//! Opens the exchange through a `Transport`, reads the body in fixed-size
//! chunks while reporting progress, and returns the finished `Response`.
//! The body stream is dropped (releasing the connection) before `run`
//! returns, on success and on every error path.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::error::Result;
use crate::request::HttpRequest;
use crate::response::{self, Response};
use crate::transport::{Incoming, Transport};
use crate::types::Progress;

/// Observer invoked with each progress signal.
pub type ProgressFn = Box<dyn FnMut(Progress) + Send>;

/// One submitted request, run to completion on an executor thread.
pub struct RequestTask {
    request: HttpRequest,
    transport: Arc<dyn Transport>,
    chunk_size: usize,
    verbose: bool,
    submitted_at: Instant,
    progress: Option<ProgressFn>,
}

impl RequestTask {
    /// Task for `request` over `transport`.
    pub fn new(request: HttpRequest, transport: Arc<dyn Transport>) -> Self {
        Self {
            request,
            transport,
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            verbose: false,
            submitted_at: Instant::now(),
            progress: None,
        }
    }

    /// Bytes requested per body read.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Log request and response details.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// When the request was handed to the execution mechanism; used for
    /// elapsed-time logging.
    pub fn submitted_at(mut self, submitted_at: Instant) -> Self {
        self.submitted_at = submitted_at;
        self
    }

    /// Observer for body transfer.
    pub fn on_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The request this task sends.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Perform the exchange.
    pub fn run(mut self) -> Result<Response> {
        let result = self.exchange();
        match &result {
            Ok(response) if self.verbose => self.log_response(response),
            Ok(_) => {}
            Err(e) => log::warn!(
                "{} {} failed after {} ms: {}",
                self.request.method,
                self.request.url,
                self.submitted_at.elapsed().as_millis(),
                e
            ),
        }
        result
    }

    fn exchange(&mut self) -> Result<Response> {
        let url = Url::parse(&self.request.full_url())?;

        if self.verbose {
            self.log_request(&url);
        }

        let Incoming {
            status,
            status_text,
            headers,
            mut body,
        } = self.transport.open(&self.request, &url)?;

        let total = response::content_length(&headers);
        let mut buffer = Vec::with_capacity(total.unwrap_or(0).min(1 << 20) as usize);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut bytes_read: u64 = 0;

        if let Some(total) = total {
            self.emit(Progress::new(0, Some(total)));
        }

        loop {
            let n = match body.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            buffer.extend_from_slice(&chunk[..n]);
            bytes_read += n as u64;

            if let Some(total) = total {
                self.emit(Progress::new(bytes_read.min(total), Some(total)));
            }
        }

        if let Some(total) = total {
            self.emit(Progress::new(total, Some(total)));
        }

        drop(body);

        Ok(Response::new(status, status_text, headers, buffer))
    }

    fn emit(&mut self, progress: Progress) {
        if let Some(observer) = self.progress.as_mut() {
            observer(progress);
        }
    }

    fn log_request(&self, url: &Url) {
        log::info!("URL: {}", url);
        log::info!("Method: {}", self.request.method);
        for (name, value) in &self.request.headers {
            log::info!("Header: {}: {}", name, value);
        }
        if let Some(body) = &self.request.body {
            log::info!("Body: {}", String::from_utf8_lossy(body));
        }
    }

    fn log_response(&self, response: &Response) {
        log::info!(
            "{} {} -> {} {} in {} ms",
            self.request.method,
            self.request.url,
            response.status(),
            response.status_text(),
            self.submitted_at.elapsed().as_millis()
        );
        if !response.is_success() {
            log::info!("Response body: {}", response.text());
        }
    }
}
