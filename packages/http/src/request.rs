use std::collections::HashMap;

use url::form_urlencoded;

use crate::types::Method;

/// Header name used for the body media type.
pub const CONTENT_TYPE: &str = "Content-Type";
/// Media type of JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";
/// Media type of text bodies.
pub const TEXT_PLAIN: &str = "text/plain";
/// Media type assumed for raw bodies without one.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// A fully configured HTTP request, as plain data.
///
/// Produced by `RequestBuilder` and handed to the request task once
/// submitted; it is never mutated after that point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,

    /// Target URL without the query parameters below.
    pub url: String,

    pub query: HashMap<String, String>,

    pub headers: HashMap<String, String>,

    /// Raw body bytes, sent as-is.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Request with no query, headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Form-encode the query parameters as `k1=v1&k2=v2`.
    ///
    /// Keys are emitted in sorted order so the result is stable. An empty
    /// map yields an empty string.
    pub fn query_string(&self) -> String {
        encode_query(&self.query)
    }

    /// The target URL with the query string appended.
    pub fn full_url(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') {
            if self.url.ends_with('?') || self.url.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };
        format!("{}{}{}", self.url, separator, query)
    }

    /// Look up a header, ignoring the case of its name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing header whose name differs only
    /// in case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// The `Content-Type` header, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// A request with a body must name its content type before dispatch;
    /// fall back to `application/octet-stream` when nothing was set.
    pub fn ensure_content_type(&mut self) {
        if self.body.is_some() && self.content_type().is_none() {
            self.set_header(CONTENT_TYPE, APPLICATION_OCTET_STREAM);
        }
    }
}

/// Form-encode `query` with keys in sorted order.
pub fn encode_query(query: &HashMap<String, String>) -> String {
    let mut pairs: Vec<(&String, &String)> = query.iter().collect();
    pairs.sort();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
