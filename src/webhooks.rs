//! Inbound webhook verification.
//!
//! Extend signs every delivery with HMAC-SHA256 over
//! `"v0:" + timestamp + ":" + raw_body`, keyed by the endpoint's signing
//! secret (`wss_...`). The hex digest is sent in `x-extend-request-signature`
//! and the unix timestamp in `x-extend-request-timestamp`.
//!
//! Large payloads may be delivered indirectly as a signed data URL. Those are
//! rejected unless the caller opts in with [`VerifyOptions::allow_signed_url`]
//! and then resolves them with [`Webhooks::fetch_signed_payload`].
//!
//! ```ignore
//! use extend::webhooks::{verify_and_parse, VerifyOptions};
//!
//! let event = verify_and_parse(&body, &headers, &secret, &VerifyOptions::default())?;
//! match event.event_type {
//!     WebhookEventType::ExtractRunProcessed => { /* ... */ }
//!     _ => {}
//! }
//! ```

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::Sha256;

use crate::{
    errors::{
        Result, SignedDataUrlFetchError, WebhookSignedUrlNotAllowedError,
        WebhookVerificationError,
    },
    identifiers::EventId,
};

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-extend-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-extend-request-signature";

/// `object` value marking an indirect payload.
pub const SIGNED_DATA_URL_OBJECT: &str = "signed_data_url";

/// Default replay window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

const SIGNATURE_VERSION: &str = "v0";
const CLOCK_SKEW_SECS: i64 = 60;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Oldest accepted timestamp age. `Duration::ZERO` disables the freshness check.
    pub max_age: Duration,
    /// Accept events whose payload is a signed data URL.
    pub allow_signed_url: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            allow_signed_url: false,
        }
    }
}

impl VerifyOptions {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn allow_signed_url(mut self, allow: bool) -> Self {
        self.allow_signed_url = allow;
        self
    }
}

/// Event name carried in `eventType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookEventType {
    ExtractRunProcessed,
    ExtractRunFailed,
    ClassifyRunProcessed,
    ClassifyRunFailed,
    SplitRunProcessed,
    SplitRunFailed,
    ParseRunProcessed,
    ParseRunFailed,
    WorkflowRunCompleted,
    WorkflowRunFailed,
    WorkflowRunNeedsReview,
    WorkflowRunRejected,
    WorkflowRunCancelled,
    WorkflowRunStepRunProcessed,
    Other(String),
}

impl WebhookEventType {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::ExtractRunProcessed => "extract_run.processed",
            WebhookEventType::ExtractRunFailed => "extract_run.failed",
            WebhookEventType::ClassifyRunProcessed => "classify_run.processed",
            WebhookEventType::ClassifyRunFailed => "classify_run.failed",
            WebhookEventType::SplitRunProcessed => "split_run.processed",
            WebhookEventType::SplitRunFailed => "split_run.failed",
            WebhookEventType::ParseRunProcessed => "parse_run.processed",
            WebhookEventType::ParseRunFailed => "parse_run.failed",
            WebhookEventType::WorkflowRunCompleted => "workflow_run.completed",
            WebhookEventType::WorkflowRunFailed => "workflow_run.failed",
            WebhookEventType::WorkflowRunNeedsReview => "workflow_run.needs_review",
            WebhookEventType::WorkflowRunRejected => "workflow_run.rejected",
            WebhookEventType::WorkflowRunCancelled => "workflow_run.cancelled",
            WebhookEventType::WorkflowRunStepRunProcessed => "workflow_run.step_run.processed",
            WebhookEventType::Other(other) => other.as_str(),
        }
    }
}

impl From<String> for WebhookEventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "extract_run.processed" => WebhookEventType::ExtractRunProcessed,
            "extract_run.failed" => WebhookEventType::ExtractRunFailed,
            "classify_run.processed" => WebhookEventType::ClassifyRunProcessed,
            "classify_run.failed" => WebhookEventType::ClassifyRunFailed,
            "split_run.processed" => WebhookEventType::SplitRunProcessed,
            "split_run.failed" => WebhookEventType::SplitRunFailed,
            "parse_run.processed" => WebhookEventType::ParseRunProcessed,
            "parse_run.failed" => WebhookEventType::ParseRunFailed,
            "workflow_run.completed" => WebhookEventType::WorkflowRunCompleted,
            "workflow_run.failed" => WebhookEventType::WorkflowRunFailed,
            "workflow_run.needs_review" => WebhookEventType::WorkflowRunNeedsReview,
            "workflow_run.rejected" => WebhookEventType::WorkflowRunRejected,
            "workflow_run.cancelled" => WebhookEventType::WorkflowRunCancelled,
            "workflow_run.step_run.processed" => WebhookEventType::WorkflowRunStepRunProcessed,
            _ => WebhookEventType::Other(value),
        }
    }
}

impl From<WebhookEventType> for String {
    fn from(value: WebhookEventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indirect payload: the real object must be fetched from `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedDataUrlPayload {
    pub object: String,
    /// Pre-signed URL of the full payload.
    pub data: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Event payload: either the domain object itself or a signed data URL.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookPayload {
    SignedDataUrl(SignedDataUrlPayload),
    Data(Value),
}

impl WebhookPayload {
    pub fn as_signed_data_url(&self) -> Option<&SignedDataUrlPayload> {
        match self {
            WebhookPayload::SignedDataUrl(payload) => Some(payload),
            WebhookPayload::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            WebhookPayload::Data(value) => Some(value),
            WebhookPayload::SignedDataUrl(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for WebhookPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let is_signed = value.get("object").and_then(Value::as_str) == Some(SIGNED_DATA_URL_OBJECT);
        if is_signed {
            let payload = SignedDataUrlPayload::deserialize(value).map_err(serde::de::Error::custom)?;
            return Ok(WebhookPayload::SignedDataUrl(payload));
        }
        Ok(WebhookPayload::Data(value))
    }
}

impl Serialize for WebhookPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            WebhookPayload::SignedDataUrl(payload) => payload.serialize(serializer),
            WebhookPayload::Data(value) => value.serialize(serializer),
        }
    }
}

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event_id: EventId,
    pub event_type: WebhookEventType,
    pub payload: WebhookPayload,
}

/// Signature for `body` at `timestamp`, as lowercase hex.
///
/// Fails only when `secret` is blank.
pub fn sign(body: &str, secret: &str, timestamp: &str) -> Result<String, WebhookVerificationError> {
    if secret.trim().is_empty() {
        return Err(WebhookVerificationError::new("missing signing secret"));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookVerificationError::new("invalid signing secret"))?;
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

fn auth_headers<I, K, V>(headers: I) -> (Option<String>, Option<String>)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut timestamp = None;
    let mut signature = None;
    for (key, value) in headers {
        let key = key.as_ref();
        if key.eq_ignore_ascii_case(TIMESTAMP_HEADER) {
            timestamp = Some(value.as_ref().trim().to_string());
        } else if key.eq_ignore_ascii_case(SIGNATURE_HEADER) {
            signature = Some(value.as_ref().trim().to_string());
        }
    }
    (timestamp, signature)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Check headers, secret, timestamp freshness and signature, in that order.
fn authenticate<I, K, V>(
    body: &str,
    headers: I,
    secret: &str,
    max_age: Duration,
    now: i64,
) -> Result<(), WebhookVerificationError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let (timestamp, signature) = auth_headers(headers);
    let timestamp = timestamp
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WebhookVerificationError::new(format!("missing {TIMESTAMP_HEADER} header")))?;
    let signature = signature
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WebhookVerificationError::new(format!("missing {SIGNATURE_HEADER} header")))?;

    if secret.trim().is_empty() {
        return Err(WebhookVerificationError::new("missing signing secret"));
    }

    let sent_at: i64 = timestamp
        .parse()
        .map_err(|_| WebhookVerificationError::new("invalid timestamp format"))?;

    if !max_age.is_zero() {
        let age = now.saturating_sub(sent_at);
        let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        if age > max_age_secs {
            return Err(WebhookVerificationError::new(format!(
                "timestamp too old ({age}s old, max {max_age_secs}s)"
            )));
        }
        if age < -CLOCK_SKEW_SECS {
            return Err(WebhookVerificationError::new("timestamp is in the future"));
        }
    }

    let expected = sign(body, secret, &timestamp)?;
    if !timing_safe_eq(&expected, &signature) {
        return Err(WebhookVerificationError::new("invalid signature"));
    }
    Ok(())
}

/// Parse a webhook body without verifying it.
///
/// Only for bodies that were authenticated by other means.
pub fn parse(body: &str) -> Result<WebhookEvent> {
    serde_json::from_str(body)
        .map_err(|err| WebhookVerificationError::new(format!("malformed body: {err}")).into())
}

/// Whether the event payload must be fetched with [`Webhooks::fetch_signed_payload`].
pub fn is_signed_url_event(event: &WebhookEvent) -> bool {
    matches!(event.payload, WebhookPayload::SignedDataUrl(_))
}

/// Authenticate a delivery without parsing it.
///
/// Returns `true` when the headers, timestamp and signature are valid.
pub fn verify<I, K, V>(body: &str, headers: I, secret: &str, options: &VerifyOptions) -> bool
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    authenticate(body, headers, secret, options.max_age, unix_now()).is_ok()
}

/// Authenticate and parse a delivery.
pub fn verify_and_parse<I, K, V>(
    body: &str,
    headers: I,
    secret: &str,
    options: &VerifyOptions,
) -> Result<WebhookEvent>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    verify_and_parse_at(body, headers, secret, options, unix_now())
}

/// [`verify_and_parse`] against an explicit clock (unix seconds).
pub fn verify_and_parse_at<I, K, V>(
    body: &str,
    headers: I,
    secret: &str,
    options: &VerifyOptions,
    now: i64,
) -> Result<WebhookEvent>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    if let Err(err) = authenticate(body, headers, secret, options.max_age, now) {
        #[cfg(feature = "tracing")]
        tracing::warn!(reason = %err.message, "webhook rejected");
        return Err(err.into());
    }

    let event = parse(body)?;
    if is_signed_url_event(&event) && !options.allow_signed_url {
        return Err(WebhookSignedUrlNotAllowedError {
            event_id: event.event_id.to_string(),
        }
        .into());
    }
    Ok(event)
}

/// `(name, value)` pairs of a [`reqwest::header::HeaderMap`], skipping non-UTF-8 values.
pub fn header_pairs(headers: &reqwest::header::HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
}

/// Webhook helper bound to an HTTP client for signed-URL resolution.
#[derive(Clone, Debug)]
pub struct Webhooks {
    http: reqwest::Client,
    fetch_timeout: Duration,
}

impl Default for Webhooks {
    fn default() -> Self {
        Self::with_http_client(reqwest::Client::new())
    }
}

impl Webhooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self {
            http,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn verify_and_parse<I, K, V>(
        &self,
        body: &str,
        headers: I,
        secret: &str,
        options: &VerifyOptions,
    ) -> Result<WebhookEvent>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        verify_and_parse(body, headers, secret, options)
    }

    pub fn verify<I, K, V>(&self, body: &str, headers: I, secret: &str, options: &VerifyOptions) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        verify(body, headers, secret, options)
    }

    pub fn parse(&self, body: &str) -> Result<WebhookEvent> {
        parse(body)
    }

    pub fn is_signed_url_event(&self, event: &WebhookEvent) -> bool {
        is_signed_url_event(event)
    }

    /// Resolve a signed data URL into a fully populated event.
    ///
    /// Events with an inline payload are returned unchanged. Every failure
    /// (HTTP status, network, invalid JSON) is a [`SignedDataUrlFetchError`].
    pub async fn fetch_signed_payload(&self, event: &WebhookEvent) -> Result<WebhookEvent> {
        let WebhookPayload::SignedDataUrl(signed) = &event.payload else {
            return Ok(event.clone());
        };

        let resp = self
            .http
            .get(&signed.data)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|err| SignedDataUrlFetchError::new(err.to_string()).with_source(err))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SignedDataUrlFetchError::new(format!("HTTP {}", status.as_u16()))
                .with_status(status.as_u16())
                .into());
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|err| SignedDataUrlFetchError::new(err.to_string()).with_source(err))?;
        let payload: Value = serde_json::from_slice(&bytes).map_err(|err| {
            SignedDataUrlFetchError::new(format!("invalid JSON: {err}")).with_source(err)
        })?;

        Ok(WebhookEvent {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            payload: WebhookPayload::Data(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Error;

    const SECRET: &str = "wss_test_secret";
    const NOW: i64 = 1_760_000_000;

    fn body() -> String {
        json!({
            "eventId": "evt_1",
            "eventType": "extract_run.processed",
            "payload": { "object": "extract_run", "id": "exr_1", "status": "PROCESSED" }
        })
        .to_string()
    }

    fn headers(ts: i64, sig: &str) -> Vec<(String, String)> {
        vec![
            (TIMESTAMP_HEADER.to_string(), ts.to_string()),
            (SIGNATURE_HEADER.to_string(), sig.to_string()),
        ]
    }

    fn signed(body: &str, ts: i64) -> Vec<(String, String)> {
        let sig = sign(body, SECRET, &ts.to_string()).unwrap();
        headers(ts, &sig)
    }

    fn verification_message(err: Error) -> String {
        match err {
            Error::WebhookVerification(e) => e.message,
            other => panic!("expected verification error, got {other:?}"),
        }
    }

    #[test]
    fn signature_covers_version_timestamp_and_body() {
        let sig = sign("{}", "secret", "1700000000").unwrap();
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"v0:1700000000:{}");
        assert_eq!(sig, hex::encode(mac.finalize().into_bytes()));
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn blank_secret_cannot_sign() {
        for secret in ["", "  \t"] {
            let err = sign("{}", secret, "1").unwrap_err();
            assert_eq!(err.message, "missing signing secret");
        }
    }

    #[test]
    fn valid_delivery_parses() {
        let body = body();
        let event = verify_and_parse_at(&body, signed(&body, NOW), SECRET, &VerifyOptions::default(), NOW)
            .expect("valid");
        assert_eq!(event.event_id.as_str(), "evt_1");
        assert_eq!(event.event_type, WebhookEventType::ExtractRunProcessed);
        assert_eq!(event.payload.as_data().unwrap()["id"], "exr_1");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let body = body();
        let sig = sign(&body, SECRET, &NOW.to_string()).unwrap();
        let headers = [
            ("X-Extend-Request-Timestamp", NOW.to_string()),
            ("X-EXTEND-REQUEST-SIGNATURE", sig),
        ];
        assert!(verify_and_parse_at(&body, headers, SECRET, &VerifyOptions::default(), NOW).is_ok());
    }

    #[test]
    fn missing_headers_fail_first() {
        let body = body();
        let err = verify_and_parse_at(
            &body,
            Vec::<(String, String)>::new(),
            "",
            &VerifyOptions::default(),
            NOW,
        )
        .unwrap_err();
        assert!(verification_message(err).contains(TIMESTAMP_HEADER));

        let only_ts = vec![(TIMESTAMP_HEADER, NOW.to_string())];
        let err = verify_and_parse_at(&body, only_ts, SECRET, &VerifyOptions::default(), NOW).unwrap_err();
        assert!(verification_message(err).contains(SIGNATURE_HEADER));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let body = body();
        let err = verify_and_parse_at(&body, signed(&body, NOW), " ", &VerifyOptions::default(), NOW)
            .unwrap_err();
        assert_eq!(verification_message(err), "missing signing secret");
    }

    #[test]
    fn non_numeric_timestamp_is_invalid_format() {
        let body = body();
        let err = verify_and_parse_at(&body, [(TIMESTAMP_HEADER, "soon"), (SIGNATURE_HEADER, "ab")], SECRET, &VerifyOptions::default(), NOW)
            .unwrap_err();
        assert_eq!(verification_message(err), "invalid timestamp format");
    }

    #[test]
    fn freshness_window_and_clock_skew() {
        let body = body();
        let opts = VerifyOptions::default();

        let old = NOW - 301;
        let err = verify_and_parse_at(&body, signed(&body, old), SECRET, &opts, NOW).unwrap_err();
        assert!(verification_message(err).starts_with("timestamp too old"));

        let edge = NOW - 300;
        assert!(verify_and_parse_at(&body, signed(&body, edge), SECRET, &opts, NOW).is_ok());

        let skewed = NOW + 60;
        assert!(verify_and_parse_at(&body, signed(&body, skewed), SECRET, &opts, NOW).is_ok());

        let future = NOW + 61;
        let err = verify_and_parse_at(&body, signed(&body, future), SECRET, &opts, NOW).unwrap_err();
        assert_eq!(verification_message(err), "timestamp is in the future");
    }

    #[test]
    fn zero_max_age_disables_freshness() {
        let body = body();
        let day_old = NOW - 86_400;
        let opts = VerifyOptions::default().with_max_age(Duration::ZERO);
        assert!(verify_and_parse_at(&body, signed(&body, day_old), SECRET, &opts, NOW).is_ok());
        assert!(
            verify_and_parse_at(&body, signed(&body, day_old), SECRET, &VerifyOptions::default(), NOW)
                .is_err()
        );
    }

    #[test]
    fn tampered_body_fails_signature() {
        let body = body();
        let headers = signed(&body, NOW);
        let tampered = body.replacen("exr_1", "exr_2", 1);
        let err = verify_and_parse_at(&tampered, headers, SECRET, &VerifyOptions::default(), NOW)
            .unwrap_err();
        assert_eq!(verification_message(err), "invalid signature");
    }

    #[test]
    fn short_signature_fails_without_panicking() {
        let body = body();
        let err = verify_and_parse_at(&body, headers(NOW, "abc"), SECRET, &VerifyOptions::default(), NOW)
            .unwrap_err();
        assert_eq!(verification_message(err), "invalid signature");
    }

    #[test]
    fn malformed_json_is_reported_after_signature() {
        let body = "{not json";
        let err = verify_and_parse_at(body, signed(body, NOW), SECRET, &VerifyOptions::default(), NOW)
            .unwrap_err();
        assert!(verification_message(err).starts_with("malformed body"));
    }

    #[test]
    fn signed_url_requires_opt_in() {
        let body = json!({
            "eventId": "evt_2",
            "eventType": "workflow_run.completed",
            "payload": {
                "object": "signed_data_url",
                "data": "https://files.extend.ai/payloads/evt_2?sig=abc",
                "id": "workflow_run_1"
            }
        })
        .to_string();

        let err = verify_and_parse_at(&body, signed(&body, NOW), SECRET, &VerifyOptions::default(), NOW)
            .unwrap_err();
        assert!(matches!(err, Error::WebhookSignedUrlNotAllowed(ref e) if e.event_id == "evt_2"));

        let opts = VerifyOptions::default().allow_signed_url(true);
        let event = verify_and_parse_at(&body, signed(&body, NOW), SECRET, &opts, NOW).unwrap();
        assert!(is_signed_url_event(&event));
        let signed_payload = event.payload.as_signed_data_url().unwrap();
        assert_eq!(signed_payload.id, "workflow_run_1");
        assert!(signed_payload.metadata.is_none());
    }

    #[test]
    fn parse_keeps_unknown_event_types() {
        let event = parse(r#"{"eventId":"e","eventType":"file.created","payload":{}}"#).unwrap();
        assert_eq!(event.event_type, WebhookEventType::Other("file.created".into()));
        assert!(!is_signed_url_event(&event));
    }

    #[test]
    fn timing_safe_eq_rejects_length_mismatch() {
        assert!(timing_safe_eq("abcd", "abcd"));
        assert!(!timing_safe_eq("abcd", "abce"));
        assert!(!timing_safe_eq("abcd", "abcde"));
    }
}
