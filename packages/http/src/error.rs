use crate::types::Shape;

/// Errors returned on submission or delivered to a callback.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("Could not serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Could not decode HTTP {status} body as JSON {expected}: {source}")]
    Decode {
        expected: Shape,
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP {status} body is valid JSON but not a JSON {expected}")]
    UnexpectedShape { expected: Shape, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request rejected: {message}")]
    Rejected { message: String },
}

impl Error {
    /// True for failures of the network exchange itself, as opposed to
    /// failures interpreting a body that was received in full.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Io(_)
                | Error::UrlParse(_)
                | Error::InvalidHeaderName(_)
                | Error::InvalidHeaderValue(_)
        )
    }

    /// True when the exchange succeeded but the body could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::UnexpectedShape { .. } | Error::Json(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
