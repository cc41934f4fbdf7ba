//! REDCap API connection.
//!
//! Low-level client owning the fixed endpoint URL, TLS settings, and
//! timeouts, and exposing one [`call`](RedcapClient::call) operation.
//! Project-level operations live on [`crate::RedcapProject`].

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use url::Url;

use crate::error::{RedcapError, Result};
use crate::params::RequestParameters;
use crate::transport::{
    FileUpload, HttpTransport, Transport, TransportRequest, TransportSettings,
};

/// Total-call timeout applied when the builder does not override it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1200);

/// Connect/handshake timeout applied when the builder does not override it.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection to one REDCap API endpoint.
///
/// All network I/O funnels through [`call`](RedcapClient::call): one
/// url-encoded form POST to the fixed URL, with transport and HTTP
/// failures classified before the body is handed back.
///
/// The configuration is immutable once built and this struct is cheaply
/// cloneable; clones share the same transport and connection pool, so a
/// project derived from another (for example by
/// [`crate::Redcap::create_project`]) reuses the connection by clone.
///
/// # Example
///
/// ```no_run
/// use redcapi::RedcapClient;
///
/// # fn example() -> redcapi::Result<()> {
/// let client = RedcapClient::new("https://redcap.example.edu/api/")?;
///
/// // Or configure transport settings explicitly
/// let client = RedcapClient::builder("https://redcap.example.edu/api/")
///     .timeout(std::time::Duration::from_secs(300))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedcapClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    url: Url,
    ssl_verify: bool,
    timeout: Duration,
    connect_timeout: Duration,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for RedcapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedcapClient")
            .field("url", &self.inner.url.as_str())
            .field("ssl_verify", &self.inner.ssl_verify)
            .field("timeout", &self.inner.timeout)
            .field("connect_timeout", &self.inner.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl RedcapClient {
    /// Create a client for `url` with default settings (TLS verification
    /// on, 1200 s total timeout, 20 s connect timeout).
    pub fn new(url: &str) -> Result<Self> {
        Self::builder(url).build()
    }

    /// Start configuring a client for `url`.
    pub fn builder(url: &str) -> ClientBuilder {
        ClientBuilder {
            url: url.to_string(),
            ssl_verify: true,
            ca_certificate_file: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            transport: None,
        }
    }

    /// The configured endpoint URL.
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// The total-call timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// The connect/handshake timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.inner.connect_timeout
    }

    /// Issue one API call and return the raw body with its diagnostics.
    ///
    /// Classification happens in priority order: a transport failure
    /// raises [`RedcapError::ConnectionError`] with the transport's
    /// numeric code and message verbatim; HTTP 301 raises
    /// [`RedcapError::InvalidUrl`] carrying the redirect target
    /// (redirects are never followed, so the token cannot leak to an
    /// unintended host); HTTP 404 raises [`RedcapError::InvalidUrl`].
    /// Any other response passes through unclassified; application-level
    /// error detection happens one layer up.
    #[tracing::instrument(skip(self, params))]
    pub async fn call(&self, params: RequestParameters) -> Result<CallOutcome> {
        self.dispatch(params, None).await
    }

    /// As [`call`](Self::call), with file content attached as multipart
    /// data (file import).
    #[tracing::instrument(skip(self, params, file))]
    pub async fn call_with_file(
        &self,
        params: RequestParameters,
        file: FileUpload,
    ) -> Result<CallOutcome> {
        self.dispatch(params, Some(file)).await
    }

    async fn dispatch(
        &self,
        params: RequestParameters,
        file: Option<FileUpload>,
    ) -> Result<CallOutcome> {
        let url = self.inner.url.clone();
        let request = TransportRequest {
            url: url.clone(),
            form: params.into_pairs(),
            file,
        };

        let started = Instant::now();
        let response = self
            .inner
            .transport
            .execute(request)
            .await
            .map_err(|e| RedcapError::ConnectionError {
                code: e.code,
                message: e.message,
            })?;
        let elapsed = started.elapsed();

        let info = CallInfo {
            url: url.to_string(),
            status_code: response.status,
            content_type: response.content_type,
            elapsed,
            body_bytes: response.body.len(),
        };

        match response.status {
            301 => {
                let message = match &response.location {
                    Some(target) => format!(
                        "the API endpoint redirected to '{target}'; update the configured URL"
                    ),
                    None => "the API endpoint returned a redirect; update the configured URL"
                        .to_string(),
                };
                Err(RedcapError::InvalidUrl {
                    message,
                    redirect: response.location,
                })
            }
            404 => Err(RedcapError::InvalidUrl {
                message: format!("nothing found at '{url}'; the configured URL appears to be wrong"),
                redirect: None,
            }),
            _ => Ok(CallOutcome {
                body: response.body,
                info,
            }),
        }
    }
}

/// Raw result of one API call: the body plus its per-call diagnostics.
///
/// The diagnostics are owned by the call that produced them, so sharing
/// one client across operations cannot clobber another call's snapshot.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub body: Vec<u8>,
    pub info: CallInfo,
}

impl CallOutcome {
    /// The body as text. Text formats are UTF-8; invalid sequences (only
    /// possible for binary file content) are replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Diagnostic snapshot of one call.
#[derive(Debug, Clone, Serialize)]
pub struct CallInfo {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub elapsed: Duration,
    pub body_bytes: usize,
}

/// Builder for [`RedcapClient`].
///
/// Construction performs no network I/O, but it does check the CA
/// certificate file when TLS verification is on: a missing file fails
/// with [`RedcapError::CaCertificateFileNotFound`] and an unreadable one
/// with [`RedcapError::CaCertificateFileUnreadable`], before the first
/// call can be made.
pub struct ClientBuilder {
    url: String,
    ssl_verify: bool,
    ca_certificate_file: Option<PathBuf>,
    timeout: Duration,
    connect_timeout: Duration,
    transport: Option<Box<dyn Transport>>,
}

impl ClientBuilder {
    /// Turn TLS certificate verification off. On by default.
    pub fn ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    /// Trust an extra root CA from a PEM file. Only consulted when TLS
    /// verification is on.
    pub fn ca_certificate_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certificate_file = Some(path.into());
        self
    }

    /// Total time budget for one call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handshake time budget.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Substitute the transport; used by tests to simulate transport
    /// failures without touching shared state.
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<RedcapClient> {
        if self.url.trim().is_empty() {
            return Err(RedcapError::InvalidArgument(
                "API URL must be a non-empty string".to_string(),
            ));
        }
        let url = Url::parse(&self.url).map_err(|e| RedcapError::InvalidUrl {
            message: format!("'{}' is not a valid URL: {e}", self.url),
            redirect: None,
        })?;

        if self.timeout.is_zero() {
            return Err(RedcapError::InvalidArgument(
                "timeout must be a positive number of seconds".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(RedcapError::InvalidArgument(
                "connection timeout must be a positive number of seconds".to_string(),
            ));
        }

        let ca_certificate = match (&self.ca_certificate_file, self.ssl_verify) {
            (Some(path), true) => Some(read_ca_certificate(path)?),
            _ => None,
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(&TransportSettings {
                ssl_verify: self.ssl_verify,
                ca_certificate,
                timeout: self.timeout,
                connect_timeout: self.connect_timeout,
            })?),
        };

        Ok(RedcapClient {
            inner: Arc::new(ClientInner {
                url,
                ssl_verify: self.ssl_verify,
                timeout: self.timeout,
                connect_timeout: self.connect_timeout,
                transport,
            }),
        })
    }
}

fn read_ca_certificate(path: &std::path::Path) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
            RedcapError::CaCertificateFileNotFound(path.display().to_string()),
        ),
        Err(e) => Err(RedcapError::CaCertificateFileUnreadable {
            path: path.display().to_string(),
            source: e,
        }),
    }
}
