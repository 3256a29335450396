use std::fmt;

/// Result type for oilgas-http operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the fetch substrate.
///
/// Upstream-unavailable conditions never surface as this error — the
/// client swallows them and returns an empty value instead. This
/// type exists only for configuration-level failures (e.g. an unset
/// User-Agent) that are fatal and must be surfaced to the caller.
#[derive(Debug)]
pub enum Error {
    ConfigurationMissing(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigurationMissing(msg) => write!(f, "configuration missing: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
