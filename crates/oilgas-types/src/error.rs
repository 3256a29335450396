use std::fmt;

/// Result type for oilgas-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the canonical schema layer
#[derive(Debug)]
pub enum Error {
    /// JSON encoding/decoding failed
    Json(serde_json::Error),

    /// A required field was missing or malformed beyond local recovery
    InputMalformed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::InputMalformed(msg) => write!(f, "malformed input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::InputMalformed(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
