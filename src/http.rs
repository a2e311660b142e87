//! Request plumbing shared by the run resources.
//!
//! The SDK issues exactly two kinds of call: `POST /{collection}` to create a
//! run and `GET /{collection}/{id}` to read it back. Only reads are retried;
//! a create whose response was lost may already have started a run.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, StatusCode, Url,
};
use serde::Deserialize;

use crate::{
    errors::{APIError, Error, Result},
    identifiers::RunId,
    REQUEST_ID_HEADER,
};

/// Per-call overrides for `create_with_options`.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Sent in addition to (and overriding) the client's headers.
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Backoff for retried reads.
///
/// Run polling has its own schedule, see [`crate::PollingOptions`]; this only
/// smooths over a transient failure of a single `GET`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Requests per call, counting the first. `1` disables retry.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryConfig {
    pub const fn disabled() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (1-based): the doubled backoff, capped,
    /// of which the upper half is randomised.
    pub(crate) fn delay(&self, retry: u32) -> Duration {
        let doubled = self
            .initial_backoff
            .saturating_mul(1u32 << retry.saturating_sub(1).min(16));
        let half = doubled.min(self.max_backoff) / 2;
        half + half.mul_f64(fastrand::f64())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Statuses that say "try again later" rather than "this request is wrong".
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// One request issued by a run resource.
#[derive(Debug)]
pub(crate) enum ApiCall<'a> {
    Create {
        collection: &'static str,
        body: serde_json::Value,
    },
    Retrieve {
        collection: &'static str,
        id: &'a RunId,
    },
}

impl ApiCall<'_> {
    pub(crate) fn method(&self) -> Method {
        match self {
            ApiCall::Create { .. } => Method::POST,
            ApiCall::Retrieve { .. } => Method::GET,
        }
    }

    pub(crate) fn is_idempotent(&self) -> bool {
        matches!(self, ApiCall::Retrieve { .. })
    }

    pub(crate) fn body(&self) -> Option<&serde_json::Value> {
        match self {
            ApiCall::Create { body, .. } => Some(body),
            ApiCall::Retrieve { .. } => None,
        }
    }

    /// Resolve against `base`, percent-encoding the run id as one segment.
    pub(crate) fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("base url {base} cannot have a path")))?;
            segments.pop_if_empty();
            match self {
                ApiCall::Create { collection, .. } => {
                    segments.push(collection);
                }
                ApiCall::Retrieve { collection, id } => {
                    segments.push(collection).push(id.as_str());
                }
            }
        }
        Ok(url)
    }
}

pub(crate) fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    error: Option<String>,
    request_id: Option<String>,
}

/// Turn a non-success response into an [`APIError`].
///
/// The API answers `{"code": ..., "message": ...}`. Anything else is kept as
/// the message verbatim, and an empty body falls back to the status reason.
pub(crate) fn api_error(
    status: StatusCode,
    request_id: Option<String>,
    body: String,
    attempts: u32,
) -> APIError {
    let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
    let (code, message, body_request_id) = match parsed {
        Some(ErrorBody {
            code,
            message,
            error,
            request_id,
        }) => (code, message.or(error), request_id),
        None => (None, None, None),
    };
    let message = message.unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.clone()
        }
    });
    APIError {
        status: status.as_u16(),
        code,
        message,
        request_id: request_id.or(body_request_id),
        attempts,
        body: (!body.is_empty()).then_some(body),
    }
}
