//! Error taxonomy shared by the store, the HTTP layer and the CLI.
//!
//! Every failure the store can report is one of five kinds. Each kind maps to
//! an HTTP status via [`Error::http_status`] so the transport layer never has
//! to inspect error messages.

/// Store-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The filename sanitized down to nothing usable.
    #[error("Invalid filename")]
    InvalidName,

    /// The filename's extension is not in the allow-list.
    #[error("File type not allowed: {0}")]
    UnsupportedType(String),

    /// The payload is larger than the configured maximum.
    #[error("File exceeds the maximum upload size of {limit} bytes")]
    PayloadTooLarge {
        /// Configured maximum in bytes.
        limit: u64,
    },

    /// No stored image with the given name.
    #[error("Image not found: {0}")]
    NotFound(String),

    /// An I/O operation on the storage directory failed.
    #[error("Storage failure: {source}")]
    Storage {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidName => 400,
            Error::UnsupportedType(_) => 400,
            Error::PayloadTooLarge { .. } => 413,
            Error::NotFound(_) => 404,
            Error::Storage { .. } => 500,
        }
    }

    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidName => "invalid_name",
            Error::UnsupportedType(_) => "unsupported_type",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::NotFound(_) => "not_found",
            Error::Storage { .. } => "storage_failure",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound(name.into())
    }

    /// Build a [`Error::Storage`] from a message, for failures that do not
    /// originate from an `io::Error` (a panicked blocking task, for example).
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage {
            source: std::io::Error::other(msg.into()),
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
