//! Error types for catalog-mirror
//!
//! The taxonomy follows the pipeline's isolation rules:
//! - [`Error::TotalCountUnavailable`] is the only fatal error; enumeration cannot page without it
//! - [`DatabaseError`] covers record persistence failures (one record lost, loop continues)
//! - [`RemoteFetchError`] covers a failed page, product detail or image request
//! - [`FileSystemError`] covers directory and asset write failures
//! - [`Error::Decode`] covers images that cannot be re-encoded
//!
//! "Already exists" conditions on disk are not errors at all; they are reported as
//! outcomes by [`crate::file_store`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for catalog-mirror
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "catalog.base_url")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The total record count could not be fetched; enumeration is impossible
    #[error("couldn't fetch total number of products: {0}")]
    TotalCountUnavailable(#[source] RemoteFetchError),

    /// A page, product detail or image request failed
    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] RemoteFetchError),

    /// Directory provisioning or asset write failed
    #[error("file system error: {0}")]
    FileSystem(#[from] FileSystemError),

    /// Image payload could not be decoded or re-encoded
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// A single remote call failed
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    /// The request never produced a response, or the body could not be read
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("server responded with {status} for {url}: {body}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body text (may be empty)
        body: String,
    },

    /// A JSON endpoint answered with a different content type
    #[error("expected JSON from {url}, got {}", .content_type.as_deref().unwrap_or("no content type"))]
    NotJson {
        /// Requested URL
        url: String,
        /// The `Content-Type` header, if any
        content_type: Option<String>,
    },

    /// The body claimed to be JSON but did not match the expected shape
    #[error("malformed response from {url}: {source}")]
    MalformedBody {
        /// Requested URL
        url: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteFetchError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteFetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// File store errors
///
/// "Already exists" is deliberately absent: an existing directory or asset is a
/// successful outcome, not a failure.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Creating a product directory failed for a reason other than it already existing
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Opening or writing an asset failed
    #[error("failed to write {path}: {source}")]
    WriteAsset {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An identifier cannot be used as a single path component
    #[error("identifier {id:?} cannot be used as a path component: {reason}")]
    InvalidIdentifier {
        /// The offending identifier
        id: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Coarse classification of an [`Error`] for logging and exit handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The run cannot proceed at all
    FatalSetup,
    /// A store read or write failed
    RecordPersistence,
    /// A remote call failed or returned an unexpected response
    RemoteFetch,
    /// A directory or file operation failed
    FileSystem,
    /// An image could not be decoded or re-encoded
    Decode,
    /// Invalid configuration
    Config,
    /// Anything else
    Other,
}

impl ErrorKind {
    /// Machine-readable code used in structured log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FatalSetup => "fatal_setup",
            ErrorKind::RecordPersistence => "record_persistence",
            ErrorKind::RemoteFetch => "remote_fetch",
            ErrorKind::FileSystem => "file_system",
            ErrorKind::Decode => "decode",
            ErrorKind::Config => "config",
            ErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TotalCountUnavailable(_) => ErrorKind::FatalSetup,
            Error::Database(_) => ErrorKind::RecordPersistence,
            Error::RemoteFetch(_) => ErrorKind::RemoteFetch,
            Error::FileSystem(_) => ErrorKind::FileSystem,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Config { .. } => ErrorKind::Config,
            Error::Serialization(_) | Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::FatalSetup
    }
}
