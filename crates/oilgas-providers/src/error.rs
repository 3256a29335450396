use std::fmt;

/// Result type for oilgas-providers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while canonicalizing or ingesting source records.
///
/// A malformed individual record never reaches this type — adapters skip
/// the line or null the field locally. This type exists only
/// for conditions that are fatal to an entire ingest run.
#[derive(Debug)]
pub enum Error {
    /// The storage repository failed
    Index(oilgas_index::Error),

    /// IO operation failed while reading a fixture file
    Io(std::io::Error),

    /// Adapter name passed to the registry does not exist
    UnknownAdapter(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "storage error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::UnknownAdapter(name) => write!(f, "unknown source adapter: {}", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::UnknownAdapter(_) => None,
        }
    }
}

impl From<oilgas_index::Error> for Error {
    fn from(err: oilgas_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
