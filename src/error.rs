//! Error types for REDCap API operations.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur during REDCap API operations.
///
/// The taxonomy is flat: every failure surfaces as exactly one variant
/// carrying the full detail available at the point of failure. Transport
/// and HTTP detail (error numbers, status codes, redirect targets) is
/// passed through unmodified, never summarized away.
#[derive(Debug, Error)]
pub enum RedcapError {
    /// An argument failed validation before any request was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A caller-supplied parameter collided with one the operation
    /// already sets.
    #[error("too many arguments: {0}")]
    TooManyArguments(String),

    /// The configured API URL appears to be wrong (the server redirected
    /// or returned 404, or the URL did not parse).
    #[error("invalid URL: {message}")]
    InvalidUrl {
        message: String,
        /// Redirect target from a 301 response, if the server sent one.
        /// Redirects are never followed automatically; following one
        /// silently could hand the token to an unintended host.
        redirect: Option<String>,
    },

    /// The configured CA certificate file does not exist.
    #[error("CA certificate file '{0}' does not exist")]
    CaCertificateFileNotFound(String),

    /// The configured CA certificate file exists but cannot be read.
    #[error("CA certificate file '{path}' cannot be read: {source}")]
    CaCertificateFileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure: DNS, connect, TLS handshake, or timeout.
    #[error("connection error: {message}")]
    ConnectionError {
        /// Numeric error code reported by the transport, when it has one.
        code: Option<i32>,
        message: String,
    },

    /// The server was reached but rejected the request inside an
    /// HTTP-successful response (the `{"error": ...}` envelope).
    #[error("REDCap API error: {message}")]
    ApiError {
        /// The server's message, verbatim.
        message: String,
        status_code: Option<u16>,
    },

    /// Malformed JSON where JSON was expected.
    #[error("failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing exported content to a local file failed.
    #[error("cannot write output file '{path}': {source}")]
    OutputFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A local file to be imported does not exist.
    #[error("input file '{0}' does not exist")]
    InputFileNotFound(String),

    /// A local file to be imported exists but cannot be read.
    #[error("input file '{path}' cannot be read: {source}")]
    InputFileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure while reading a local file to be imported.
    #[error("input file '{path}': {source}")]
    InputFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for REDCap operations.
pub type Result<T> = core::result::Result<T, RedcapError>;

/// The application-error envelope: a body that is exactly one JSON
/// object with a single string-valued `error` key.
///
/// `deny_unknown_fields` anchors the shape, so `{"error":"x","y":1}` and
/// `{"data":{"error":"x"}}` are both treated as success data.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorEnvelope {
    error: String,
}

/// Detect the API's application-level error envelope in a response body.
///
/// The server reports failures inside HTTP-successful responses as a
/// JSON object `{"error": "<message>"}` regardless of the requested
/// format. The whole whitespace-trimmed body must be exactly that shape;
/// anything else (including an empty body, which means "no data") passes
/// through as success.
pub fn application_error(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body.trim())
        .ok()
        .map(|envelope| envelope.error)
}
