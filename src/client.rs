use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION},
    Response, Url,
};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, Instant};

use crate::{
    errors::{Error, Result, TransportError},
    http::{api_error, is_transient_status, request_id, ApiCall, RequestOptions, RetryConfig},
    runs::{ClassifyRunsClient, ExtractRunsClient, SplitRunsClient, WorkflowRunsClient},
    telemetry::{HttpRequestMetrics, MetricsCallbacks},
    webhooks::Webhooks,
    API_KEY_ENV, API_VERSION_HEADER, DEFAULT_API_VERSION, DEFAULT_CLIENT_HEADER,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};

/// Hosted API deployments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    ProductionEu,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://api.extend.ai",
            Environment::ProductionEu => "https://api.eu1.extend.ai",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    /// API key; falls back to the `EXTEND_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Overrides `environment` when set.
    pub base_url: Option<String>,
    pub environment: Option<Environment>,
    /// Value of the `x-extend-api-version` header.
    pub api_version: Option<String>,
    pub http_client: Option<reqwest::Client>,
    /// Ignored when `http_client` is supplied. Defaults to 5s.
    pub connect_timeout: Option<Duration>,
    /// Per-request timeout. Defaults to 60s.
    pub timeout: Option<Duration>,
    /// Retry policy for reads. Defaults to 3 attempts.
    pub retry: Option<RetryConfig>,
    /// Sent with every request; these cannot replace the auth or version headers.
    pub default_headers: Option<HeaderMap>,
    pub metrics: Option<MetricsCallbacks>,
}

#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    base_url: Url,
    pub(crate) http: reqwest::Client,
    /// Everything constant across requests, auth included.
    headers: HeaderMap,
    timeout: Duration,
    retry: RetryConfig,
    metrics: MetricsCallbacks,
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self> {
        let base = cfg
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| cfg.environment.unwrap_or_default().base_url());
        let base_url =
            Url::parse(base).map_err(|err| Error::Config(format!("invalid base url: {err}")))?;

        let api_key = cfg
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "api key is required (set Config::api_key or {API_KEY_ENV})"
                ))
            })?;
        let api_version = cfg
            .api_version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let mut headers = cfg.default_headers.unwrap_or_default();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::Config("api key contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_str(&api_version)
                .map_err(|_| Error::Config(format!("invalid api version {api_version:?}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-extend-client"),
            HeaderValue::from_static(DEFAULT_CLIENT_HEADER),
        );

        let http = match cfg.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .build()
                .map_err(|err| Error::Config(format!("failed to build http client: {err}")))?,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                http,
                headers,
                timeout: cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
                retry: cfg.retry.unwrap_or_default(),
                metrics: cfg.metrics.unwrap_or_default(),
            }),
        })
    }

    /// Build a client from `EXTEND_API_KEY` with every other setting defaulted.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::default())
    }

    pub fn extract_runs(&self) -> ExtractRunsClient {
        ExtractRunsClient {
            inner: self.inner.clone(),
        }
    }

    pub fn classify_runs(&self) -> ClassifyRunsClient {
        ClassifyRunsClient {
            inner: self.inner.clone(),
        }
    }

    pub fn split_runs(&self) -> SplitRunsClient {
        SplitRunsClient {
            inner: self.inner.clone(),
        }
    }

    pub fn workflow_runs(&self) -> WorkflowRunsClient {
        WorkflowRunsClient {
            inner: self.inner.clone(),
        }
    }

    /// Webhook helpers sharing this client's HTTP connection pool.
    pub fn webhooks(&self) -> Webhooks {
        Webhooks::with_http_client(self.inner.http.clone())
    }
}

impl ClientInner {
    /// Send `call`, retrying reads on transient failures, and decode the body.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        call: ApiCall<'_>,
        options: &RequestOptions,
    ) -> Result<T> {
        let url = call.url(&self.base_url)?;
        let max_attempts = if call.is_idempotent() {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        let started = Instant::now();

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            let outcome = self.attempt(&call, &url, options).await;
            let transient = match &outcome {
                Ok(resp) => is_transient_status(resp.status()),
                Err(err) => TransportError::is_transient(err),
            };
            if !transient || attempt >= max_attempts {
                break outcome;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(path = url.path(), attempt, "transient failure; retrying");
            sleep(self.retry.delay(attempt)).await;
        };

        self.finish(&call, &url, outcome, attempt, started).await
    }

    async fn attempt(
        &self,
        call: &ApiCall<'_>,
        url: &Url,
        options: &RequestOptions,
    ) -> reqwest::Result<Response> {
        let mut request = self
            .http
            .request(call.method(), url.clone())
            .headers(self.headers.clone())
            .headers(options.headers.clone())
            .timeout(options.timeout.unwrap_or(self.timeout));
        if let Some(body) = call.body() {
            request = request.json(body);
        }
        #[cfg(feature = "tracing")]
        let sent = {
            use tracing::Instrument;
            let span = tracing::debug_span!("extend.http", method = %call.method(), path = url.path());
            request.send().instrument(span).await
        };
        #[cfg(not(feature = "tracing"))]
        let sent = request.send().await;
        sent
    }

    async fn finish<T: DeserializeOwned>(
        &self,
        call: &ApiCall<'_>,
        url: &Url,
        outcome: reqwest::Result<Response>,
        attempts: u32,
        started: Instant,
    ) -> Result<T> {
        let metrics = |status: Option<u16>, request_id: Option<String>, error: Option<String>| {
            HttpRequestMetrics {
                method: call.method().to_string(),
                path: url.path().to_string(),
                status,
                attempts,
                latency: started.elapsed(),
                request_id,
                error,
            }
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                self.metrics
                    .emit_http(|| metrics(None, None, Some(err.to_string())));
                #[cfg(feature = "tracing")]
                tracing::warn!(path = url.path(), attempts, error = %err, "request failed");
                return Err(TransportError::new(err, attempts).into());
            }
        };

        let status = response.status();
        let req_id = request_id(response.headers());
        self.metrics.emit_http(|| {
            let error = (!status.is_success()).then(|| format!("HTTP {}", status.as_u16()));
            metrics(Some(status.as_u16()), req_id.clone(), error)
        });

        if !status.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(path = url.path(), status = status.as_u16(), attempts, "api error");
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, req_id, body, attempts).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::new(err, attempts))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
