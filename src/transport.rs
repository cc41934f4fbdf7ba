//! Transport abstraction for API calls.
//!
//! The connection depends on this seam rather than on an HTTP library
//! directly, so tests substitute a scripted or failing transport instead
//! of mutating shared state. [`HttpTransport`] is the production
//! implementation, backed by a [`reqwest::Client`] built once with the
//! connection's timeout and TLS settings.

use std::error::Error as _;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::multipart;
use reqwest::redirect::Policy;
use url::Url;

/// A single outgoing API request, already validated and encoded.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    /// Ordered form pairs; sent url-encoded, or as the text parts of a
    /// multipart body when a file is attached.
    pub form: Vec<(String, String)>,
    /// File content attached as multipart data (file import only).
    pub file: Option<FileUpload>,
}

/// A file attached to a request as multipart content.
#[derive(Clone)]
pub struct FileUpload {
    /// Wire field name, normally `file`.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// File content, read by the caller before the request is built.
    pub content: Vec<u8>,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_len", &self.content.len())
            .finish()
    }
}

/// Raw response as seen by the transport, before any classification.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// `Location` header, present on redirects.
    pub location: Option<String>,
    pub body: Vec<u8>,
}

/// Transport-level failure: DNS, connect, TLS handshake, or timeout.
///
/// Carries the transport's numeric error code and message verbatim;
/// nothing is summarized away.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub code: Option<i32>,
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Extract the deepest OS error number reqwest can offer, keeping
    /// the message unmodified.
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let mut code = None;
        let mut source = err.source();
        while let Some(inner) = source {
            if let Some(io) = inner.downcast_ref::<std::io::Error>() {
                if let Some(os) = io.raw_os_error() {
                    code = Some(os);
                    break;
                }
            }
            source = inner.source();
        }
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Strategy object performing one HTTP exchange.
///
/// The connection owns exactly one transport; substituting a fake here
/// is how tests simulate transport failures.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Issue one POST and return the raw response, or the transport's
    /// own failure.
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> core::result::Result<TransportResponse, TransportError>;
}

/// Settings [`HttpTransport`] is built with. Fixed for the transport's
/// lifetime.
#[derive(Debug, Clone)]
pub(crate) struct TransportSettings {
    pub ssl_verify: bool,
    /// PEM bytes of an extra root certificate, already read from disk.
    pub ca_certificate: Option<Vec<u8>>,
    /// Total time budget for one call.
    pub timeout: Duration,
    /// Handshake time budget.
    pub connect_timeout: Duration,
}

const USER_AGENT: &str = concat!("redcapi/", env!("CARGO_PKG_VERSION"));

/// Production transport backed by reqwest.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build the underlying HTTP client once with the given settings.
    ///
    /// Redirects are never followed: a 301 must surface to the caller so
    /// the token is not silently re-sent to another host.
    pub(crate) fn new(settings: &TransportSettings) -> crate::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .redirect(Policy::none())
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout);

        if !settings.ssl_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(pem) = &settings.ca_certificate {
            let certificate = reqwest::Certificate::from_pem(pem).map_err(|e| {
                crate::RedcapError::InvalidArgument(format!(
                    "CA certificate file is not a valid PEM certificate: {e}"
                ))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let http = builder.build().map_err(|e| crate::RedcapError::ConnectionError {
            code: None,
            message: e.to_string(),
        })?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> core::result::Result<TransportResponse, TransportError> {
        let builder = self.http.post(request.url);
        let builder = match request.file {
            None => builder.form(&request.form),
            Some(upload) => {
                let mut form = multipart::Form::new();
                for (key, value) in request.form {
                    form = form.text(key, value);
                }
                let part =
                    multipart::Part::bytes(upload.content).file_name(upload.file_name);
                form = form.part(upload.field, part);
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let content_type = header_string(&response, CONTENT_TYPE);
        let location = header_string(&response, LOCATION);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?
            .to_vec();

        Ok(TransportResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
