use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP method for requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl Method {
    /// Method name as sent on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
        }
    }
}

/// Scheduling hint for the execution mechanism.
///
/// Variants are ordered, so `Priority::High > Priority::Low`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Background,
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Background => "background",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        };
        f.write_str(name)
    }
}

/// A progress report emitted while a response body is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes of the body read so far.
    pub bytes_read: u64,
    /// Expected body length, from `Content-Length`.
    pub total: Option<u64>,
}

impl Progress {
    /// Progress after `bytes_read` of `total` bytes.
    pub fn new(bytes_read: u64, total: Option<u64>) -> Self {
        Self { bytes_read, total }
    }

    /// `round(bytes_read / total * 100)`, or `None` when the total is unknown.
    ///
    /// A zero-length body is reported as complete.
    pub fn percent(&self) -> Option<u32> {
        let total = self.total?;
        if total == 0 {
            return Some(100);
        }
        Some((self.bytes_read as f64 / total as f64 * 100.0).round() as u32)
    }
}

/// The JSON shape a caller expects the response body to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Object,
    Array,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Object => f.write_str("object"),
            Shape::Array => f.write_str("array"),
        }
    }
}

/// A decoded response body: either a JSON object or a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub enum Structured {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

impl Structured {
    /// The empty value of the given shape.
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Object => Structured::Object(Map::new()),
            Shape::Array => Structured::Array(Vec::new()),
        }
    }

    /// Which shape this value has.
    pub fn shape(&self) -> Shape {
        match self {
            Structured::Object(_) => Shape::Object,
            Structured::Array(_) => Shape::Array,
        }
    }

    /// The object, if this is one.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Structured::Object(map) => Some(map),
            Structured::Array(_) => None,
        }
    }

    /// The array, if this is one.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Structured::Array(items) => Some(items),
            Structured::Object(_) => None,
        }
    }

    /// Take the object, if this is one.
    pub fn into_object(self) -> Option<Map<String, Value>> {
        match self {
            Structured::Object(map) => Some(map),
            Structured::Array(_) => None,
        }
    }

    /// Take the array, if this is one.
    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Structured::Array(items) => Some(items),
            Structured::Object(_) => None,
        }
    }
}

impl From<Structured> for Value {
    fn from(structured: Structured) -> Self {
        match structured {
            Structured::Object(map) => Value::Object(map),
            Structured::Array(items) => Value::Array(items),
        }
    }
}
