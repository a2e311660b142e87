use std::{fmt, sync::Arc, time::Duration};

/// Summary of one API call, reported once after its last attempt.
#[derive(Clone, Debug)]
pub struct HttpRequestMetrics {
    pub method: String,
    /// Percent-encoded URL path, e.g. `/extract_runs/exr_1`.
    pub path: String,
    /// `None` when no response arrived.
    pub status: Option<u16>,
    pub attempts: u32,
    /// From the first request to the final response or failure.
    pub latency: Duration,
    pub request_id: Option<String>,
    pub error: Option<String>,
}

type HttpCallback = Arc<dyn Fn(&HttpRequestMetrics) + Send + Sync>;

/// Hooks for exporting request metrics without a `tracing` subscriber.
#[derive(Clone, Default)]
pub struct MetricsCallbacks {
    http_request: Option<HttpCallback>,
}

impl MetricsCallbacks {
    pub fn with_http_request(
        mut self,
        callback: impl Fn(&HttpRequestMetrics) + Send + Sync + 'static,
    ) -> Self {
        self.http_request = Some(Arc::new(callback));
        self
    }

    /// Metrics are only assembled when someone listens.
    pub(crate) fn emit_http(&self, build: impl FnOnce() -> HttpRequestMetrics) {
        if let Some(callback) = &self.http_request {
            callback(&build());
        }
    }
}

impl fmt::Debug for MetricsCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCallbacks")
            .field("http_request", &self.http_request.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use super::*;

    fn sample() -> HttpRequestMetrics {
        HttpRequestMetrics {
            method: "GET".into(),
            path: "/extract_runs/exr_1".into(),
            status: Some(200),
            attempts: 1,
            latency: Duration::from_millis(5),
            request_id: None,
            error: None,
        }
    }

    #[test]
    fn registered_callback_receives_metrics() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callbacks = MetricsCallbacks::default()
            .with_http_request(move |m| sink.lock().unwrap().push(m.path.clone()));
        callbacks.emit_http(sample);
        assert_eq!(*seen.lock().unwrap(), vec!["/extract_runs/exr_1".to_string()]);
    }

    #[test]
    fn nothing_is_built_without_a_listener() {
        let built = AtomicBool::new(false);
        MetricsCallbacks::default().emit_http(|| {
            built.store(true, Ordering::SeqCst);
            sample()
        });
        assert!(!built.load(Ordering::SeqCst));
        assert_eq!(
            format!("{:?}", MetricsCallbacks::default()),
            "MetricsCallbacks { http_request: false }"
        );
    }
}
