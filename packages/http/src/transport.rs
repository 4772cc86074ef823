//! Network transport abstraction.
//!
//! A `Transport` opens one exchange: it sends the request line, headers and
//! body, and hands back the status, headers and an unread body stream. The
//! request task owns the streaming loop, so progress reporting works the
//! same over any transport, including the mock used in tests.

use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::HttpRequest;

/// An exchange whose status line and headers have arrived but whose body
/// has not been read yet.
///
/// Dropping it releases the underlying connection.
pub struct Incoming {
    pub status: u16,
    /// Reason phrase for `status`; the reqwest transport reports the
    /// canonical one.
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for Incoming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Incoming")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Trait for opening HTTP exchanges.
///
/// Implementations can use real HTTP clients or canned responses for testing.
pub trait Transport: Send + Sync {
    /// Connect, send `request` to `url` (the query string is already part
    /// of `url`), and return once the response head has been received.
    fn open(&self, request: &HttpRequest, url: &Url) -> Result<Incoming>;
}

/// Production transport using reqwest's blocking client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Blocking reqwest client with the deadlines from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self { client })
    }

    /// Create with the default configuration (30 second timeout).
    pub fn with_default_timeout() -> Result<Self> {
        Self::new(&ClientConfig::default())
    }

    /// Wrap an already configured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn open(&self, request: &HttpRequest, url: &Url) -> Result<Incoming> {
        let method: http::Method = request.method.into();

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::try_from(name.as_str())?;
            let header_value = HeaderValue::try_from(value.as_str())?;
            headers.insert(header_name, header_value);
        }

        let mut req_builder = self.client.request(method, url.clone()).headers(headers);

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let response = req_builder.send()?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("Unknown").to_string();
        let headers = response.headers().clone();

        Ok(Incoming {
            status: status.as_u16(),
            status_text,
            headers,
            body: Box::new(response),
        })
    }
}

/// Mock transport for testing.
///
/// Returns one configured reply for every request, delivering the body in
/// the configured chunks.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::error::Error;

    /// A canned response.
    #[derive(Clone, Debug)]
    pub struct MockReply {
        pub status: u16,
        pub status_text: String,
        pub headers: HeaderMap,
        pub chunks: Vec<Vec<u8>>,
        /// Fail the body read with this message once the chunks run out.
        pub fail_mid_body: Option<String>,
    }

    impl MockReply {
        pub fn new(status: u16) -> Self {
            let status_text = http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown")
                .to_string();
            Self {
                status,
                status_text,
                headers: HeaderMap::new(),
                chunks: Vec::new(),
                fail_mid_body: None,
            }
        }

        pub fn chunk(mut self, bytes: impl Into<Vec<u8>>) -> Self {
            self.chunks.push(bytes.into());
            self
        }

        pub fn header(mut self, name: &'static str, value: &str) -> Self {
            self.headers.append(
                HeaderName::from_static(name),
                HeaderValue::try_from(value).unwrap(),
            );
            self
        }

        /// Advertise the total chunk length as `Content-Length`.
        pub fn with_content_length(self) -> Self {
            let total: usize = self.chunks.iter().map(Vec::len).sum();
            self.header("content-length", &total.to_string())
        }

        pub fn fail_mid_body(mut self, message: impl Into<String>) -> Self {
            self.fail_mid_body = Some(message.into());
            self
        }

        /// A 200 reply whose body arrives in one chunk with a `Content-Length`.
        pub fn json(body: serde_json::Value) -> Self {
            Self::new(200).chunk(body.to_string()).with_content_length()
        }
    }

    /// Body reader that yields at most one configured chunk per read call.
    struct ChunkReader {
        chunks: VecDeque<Vec<u8>>,
        fail: Option<String>,
        released: Arc<AtomicUsize>,
    }

    impl Read for ChunkReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(mut chunk) = self.chunks.pop_front() else {
                return match self.fail.take() {
                    Some(message) => Err(io::Error::new(io::ErrorKind::ConnectionReset, message)),
                    None => Ok(0),
                };
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                let rest = chunk.split_off(n);
                self.chunks.push_front(rest);
            }
            Ok(n)
        }
    }

    impl Drop for ChunkReader {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// A mock transport that returns a predefined reply.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        reply: Arc<Mutex<Option<MockReply>>>,
        /// Recorded requests and the URL each was sent to.
        recorded_requests: Arc<Mutex<Vec<(HttpRequest, String)>>>,
        /// Fail every `open` with this message.
        error_message: Arc<Mutex<Option<String>>>,
        released: Arc<AtomicUsize>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_reply(self, reply: MockReply) -> Self {
            *self.reply.lock().unwrap() = Some(reply);
            self
        }

        /// Configure to fail all requests with a connection error.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            *self.error_message.lock().unwrap() = Some(message.into());
            self
        }

        pub fn recorded_requests(&self) -> Vec<(HttpRequest, String)> {
            self.recorded_requests.lock().unwrap().clone()
        }

        /// Number of body streams that have been dropped.
        pub fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl Transport for MockTransport {
        fn open(&self, request: &HttpRequest, url: &Url) -> Result<Incoming> {
            self.recorded_requests
                .lock()
                .unwrap()
                .push((request.clone(), url.to_string()));

            if let Some(message) = self.error_message.lock().unwrap().clone() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    message,
                )));
            }

            let reply = self
                .reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| MockReply::new(404));

            Ok(Incoming {
                status: reply.status,
                status_text: reply.status_text,
                headers: reply.headers,
                body: Box::new(ChunkReader {
                    chunks: reply.chunks.into(),
                    fail: reply.fail_mid_body,
                    released: Arc::clone(&self.released),
                }),
            })
        }
    }
}
