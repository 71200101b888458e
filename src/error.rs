//! Error types for the simulator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the response table.
///
/// All of these are fatal at startup: the listener is never bound when
/// the table fails to load.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML/JSON.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but does not have the `path -> verb -> attributes` shape.
    #[error("invalid configuration shape: {0}")]
    InvalidShape(String),

    /// A route declares no `statusCode`.
    #[error("route {verb} /{path}: missing required field `statusCode`")]
    MissingStatusCode {
        /// Normalized route path.
        path: String,
        /// Verb as written in the document.
        verb: String,
    },

    /// `statusCode` is outside the valid HTTP range.
    #[error("route {verb} /{path}: invalid status code {status}")]
    InvalidStatusCode {
        path: String,
        verb: String,
        status: i64,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("route {verb} /{path}: invalid header `{name}`")]
    InvalidHeader {
        path: String,
        verb: String,
        name: String,
    },

    /// `contentType` is not a valid header value.
    #[error("route {verb} /{path}: invalid contentType `{content_type}`")]
    InvalidContentType {
        path: String,
        verb: String,
        content_type: String,
    },

    /// The attribute mapping has unknown fields or wrongly typed values.
    #[error("route {verb} /{path}: {message}")]
    InvalidAttributes {
        path: String,
        verb: String,
        message: String,
    },
}

/// Failures while answering a single request.
///
/// Never surfaced past the request boundary; the dispatcher degrades every
/// one of these into the not-found outcome.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[from] hyper::Error),

    /// The response could not be assembled.
    #[error("failed to build response: {0}")]
    Build(#[from] http::Error),
}

/// Listener errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
