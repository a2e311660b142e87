use std::time::Duration;

use thiserror::Error;

/// A request was rejected locally, before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", field_prefix(.field))]
pub struct ValidationError {
    pub message: String,
    /// Request field the message refers to.
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

fn field_prefix(field: &Option<String>) -> String {
    field.as_deref().map(|f| format!("{f}: ")).unwrap_or_default()
}

/// The Extend API answered with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {status}: {message}", .code.as_deref().unwrap_or("api error"))]
pub struct APIError {
    pub status: u16,
    /// Machine-readable error code, e.g. `NOT_FOUND`.
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
    /// Requests sent for this call, including retries.
    pub attempts: u32,
    /// Response body as received.
    pub body: Option<String>,
}

impl APIError {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Convenience alias for fallible SDK results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// No usable response arrived: connect failure, timeout or a broken body.
#[derive(Debug, Error)]
#[error("{kind} failure after {attempts} attempt(s): {source}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub attempts: u32,
    #[source]
    pub source: reqwest::Error,
}

impl TransportError {
    pub(crate) fn new(source: reqwest::Error, attempts: u32) -> Self {
        let kind = if source.is_timeout() {
            TransportErrorKind::Timeout
        } else if source.is_connect() {
            TransportErrorKind::Connect
        } else if source.is_body() || source.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self {
            kind,
            attempts,
            source,
        }
    }

    /// Worth another try on an idempotent call.
    pub(crate) fn is_transient(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportErrorKind {
    #[error("timeout")]
    Timeout,
    #[error("connect")]
    Connect,
    #[error("response body")]
    Body,
    #[error("transport")]
    Other,
}

/// Raised when `poll_until_done` exceeds its configured `max_wait`.
///
/// Retrieval failures are never reported through this type; they propagate
/// from the retrieve closure unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "polling timed out after {}ms (max wait {}ms)",
    .elapsed.as_millis(),
    .max_wait.as_millis()
)]
pub struct PollingTimeoutError {
    pub elapsed: Duration,
    pub max_wait: Duration,
}

impl PollingTimeoutError {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    pub fn max_wait_ms(&self) -> u128 {
        self.max_wait.as_millis()
    }
}

/// Raised when a cancellation token fires while polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("polling cancelled after {}ms", .elapsed.as_millis())]
pub struct PollingCancelledError {
    pub elapsed: Duration,
}

/// Any failure to authenticate or decode an inbound webhook.
///
/// The reason is carried in the message only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("webhook verification failed: {message}")]
pub struct WebhookVerificationError {
    pub message: String,
}

impl WebhookVerificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A verified event carried a signed-URL payload but the caller did not opt in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "webhook event {event_id} has a signed data URL payload; pass `allow_signed_url: true` \
     in VerifyOptions to accept it and resolve it with `fetch_signed_payload`"
)]
pub struct WebhookSignedUrlNotAllowedError {
    pub event_id: String,
}

/// Resolving a signed data URL failed (HTTP status, network or decode error).
#[derive(Debug, Error)]
#[error("failed to fetch signed webhook payload: {message}")]
pub struct SignedDataUrlFetchError {
    pub message: String,
    pub status: Option<u16>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SignedDataUrlFetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// A schema node could not be represented in the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", display_path(.path))]
pub struct SchemaConversionError {
    /// Field names from the root object to the offending field.
    pub path: Vec<String>,
    pub message: String,
}

impl SchemaConversionError {
    pub fn new(path: &[String], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// Dotted form of [`Self::path`] (`"<root>"` for the root object).
    pub fn dotted_path(&self) -> String {
        display_path(&self.path)
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

/// Unified error type surfaced by the SDK.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Api(#[from] APIError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    PollingTimeout(#[from] PollingTimeoutError),

    #[error("{0}")]
    PollingCancelled(#[from] PollingCancelledError),

    #[error("{0}")]
    WebhookVerification(#[from] WebhookVerificationError),

    #[error("{0}")]
    WebhookSignedUrlNotAllowed(#[from] WebhookSignedUrlNotAllowedError),

    #[error("{0}")]
    SignedDataUrlFetch(#[from] SignedDataUrlFetchError),

    #[error("schema conversion error: {0}")]
    SchemaConversion(#[from] SchemaConversionError),
}
