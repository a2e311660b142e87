//! Rust SDK core for the Extend document processing API.
//!
//! - [`poll_until_done`] drives any asynchronous run to a terminal status with a
//!   hybrid fixed-interval / exponential-backoff schedule.
//! - [`webhooks`] authenticates and parses inbound webhook deliveries.
//! - [`schema`] converts typed extraction schemas into the wire format.
//!
//! ```ignore
//! use extend::{Client, Config, ExtractRunCreateRequest, FileInput, PollingOptions, ProcessorRef};
//!
//! let client = Client::new(Config::default())?;
//! let run = client
//!     .extract_runs()
//!     .create_and_poll(
//!         ExtractRunCreateRequest::with_extractor(
//!             ProcessorRef::new("ex_abc123"),
//!             FileInput::from_url("https://example.com/invoice.pdf"),
//!         ),
//!         &PollingOptions::default(),
//!     )
//!     .await?;
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::result_large_err)]

use std::time::Duration;

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (60 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default client identification header value.
pub(crate) const DEFAULT_CLIENT_HEADER: &str = concat!("extend-rust/", env!("CARGO_PKG_VERSION"));

/// Environment variable read when no API key is configured.
pub const API_KEY_ENV: &str = "EXTEND_API_KEY";

/// HTTP header carrying the pinned API version.
pub const API_VERSION_HEADER: &str = "x-extend-api-version";

/// API version sent when none is configured.
pub const DEFAULT_API_VERSION: &str = "2025-04-21";

/// HTTP header name for request ID tracing.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

mod client;
mod errors;
mod http;
mod identifiers;
#[cfg(feature = "mock")]
mod mock;
pub mod polling;
pub mod runs;
pub mod schema;
mod telemetry;
#[doc(hidden)]
pub mod testing;
pub mod webhooks;

pub use client::{Client, Config, Environment};
pub use errors::{
    APIError, Error, PollingCancelledError, PollingTimeoutError, Result, SchemaConversionError, SignedDataUrlFetchError, TransportError, TransportErrorKind,
    ValidationError, WebhookSignedUrlNotAllowedError, WebhookVerificationError,
};
pub use http::{RequestOptions, RetryConfig};
pub use identifiers::{EventId, FileId, ProcessorId, RunId, WorkflowId};
#[cfg(feature = "mock")]
pub use mock::{fixtures, MockRuns};
pub use polling::{
    compute_delay, poll_until_done, poll_until_done_with, JitterSource, PollPhase,
    PollingOptions, RandomJitter,
};
pub use runs::{
    create_and_poll, ClassifyRunCreateRequest, ClassifyRunsClient, ExtractConfig,
    ExtractRunCreateRequest, ExtractRunsClient, FileInput, ProcessorRef, ProcessorRun,
    ProcessorRunStatus, RunResource, RunSnapshot, RunStatusKind, SplitRunCreateRequest,
    SplitRunsClient, WorkflowRef, WorkflowRun, WorkflowRunCreateRequest, WorkflowRunStatus,
    WorkflowRunsClient,
};
pub use telemetry::{HttpRequestMetrics, MetricsCallbacks};
pub use webhooks::{VerifyOptions, WebhookEvent, WebhookEventType, WebhookPayload, Webhooks};

// Re-exported so callers can cancel polling without a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
