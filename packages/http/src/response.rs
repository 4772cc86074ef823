use std::borrow::Cow;

use http::header::{HeaderMap, CONTENT_LENGTH};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{Shape, Structured};

/// A completed HTTP exchange.
///
/// Built by the request task once the whole body has been read; immutable
/// from then on. Header names are case-insensitive and each name keeps its
/// values in the order the server sent them.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// Assemble a fully read response.
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers,
            body,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Status text (e.g., "OK", "Not Found").
    ///
    /// With `ReqwestTransport` this is the canonical reason phrase for the
    /// status code, not the phrase the server put on the status line;
    /// reqwest does not expose the latter. Unregistered codes read
    /// "Unknown".
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// All response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a header, in received order.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        content_length(&self.headers)
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Take the raw body bytes.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Status 200-399. Anything else came from the server's error stream.
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }

    /// Body decoded as UTF-8; invalid sequences become U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode the body into the requested JSON shape.
    ///
    /// An empty (or all-whitespace) body yields the empty value of that
    /// shape. A non-empty body that is not JSON, or is JSON of the other
    /// shape, is an error.
    pub fn decode(&self, shape: Shape) -> Result<Structured> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Structured::empty(shape));
        }

        let value: Value = serde_json::from_slice(&self.body).map_err(|source| Error::Decode {
            expected: shape,
            status: self.status,
            source,
        })?;

        match (shape, value) {
            (Shape::Object, Value::Object(map)) => Ok(Structured::Object(map)),
            (Shape::Array, Value::Array(items)) => Ok(Structured::Array(items)),
            _ => Err(Error::UnexpectedShape {
                expected: shape,
                status: self.status,
            }),
        }
    }

    /// Decode the body as a JSON object; an empty body is `{}`.
    pub fn json_object(&self) -> Result<Map<String, Value>> {
        self.decode(Shape::Object)?
            .into_object()
            .ok_or(Error::UnexpectedShape {
                expected: Shape::Object,
                status: self.status,
            })
    }

    /// Decode the body as a JSON array; an empty body is `[]`.
    pub fn json_array(&self) -> Result<Vec<Value>> {
        self.decode(Shape::Array)?
            .into_array()
            .ok_or(Error::UnexpectedShape {
                expected: Shape::Array,
                status: self.status,
            })
    }

    /// Try to deserialize the body into a specific type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// A response together with its body decoded into the shape the caller
/// asked for.
#[derive(Debug, Clone)]
pub struct Reply {
    pub body: Structured,
    pub response: Response,
}

impl Reply {
    /// Decode `response` into `shape`.
    pub fn from_response(response: Response, shape: Shape) -> Result<Self> {
        let body = response.decode(shape)?;
        Ok(Self { body, response })
    }

    /// HTTP status code of the underlying response.
    pub fn status(&self) -> u16 {
        self.response.status()
    }
}

pub(crate) fn is_success(status: u16) -> bool {
    (200..400).contains(&status)
}

pub(crate) fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
