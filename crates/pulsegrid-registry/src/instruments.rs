//! The Metrics component — instrument registration and exposition.
//!
//! Label sets are fixed at registration and carried in the observation
//! method signatures, so a mis-labeled observation cannot be expressed.
//! All instruments are internally synchronized per-instrument by the
//! prometheus crate; no coarse lock guards the registry.

use prometheus::core::Collector;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::RegistryError;

/// Default metric-family prefix, avoiding collisions with other processes
/// scraped by the same collector.
pub const DEFAULT_PREFIX: &str = "pulsegrid";

/// Latency buckets for the request-duration histogram, in seconds.
const REQUEST_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0];

/// Wider buckets for model inference, which routinely runs for seconds.
const MODEL_INFERENCE_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0];

/// The process-wide metric registry and its instruments.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_request_duration: HistogramVec,
    http_requests_total: IntCounterVec,
    gpu_utilization: Gauge,
    model_inference: HistogramVec,
}

impl Metrics {
    /// Build a registry with all contract instruments under `prefix`.
    ///
    /// A duplicate family name is a configuration error; callers treat it
    /// as fatal at startup.
    pub fn new(prefix: &str) -> Result<Self, RegistryError> {
        let registry = Registry::new_custom(Some(prefix.to_string()), None)
            .map_err(RegistryError::Register)?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(REQUEST_DURATION_BUCKETS.to_vec()),
            &["method", "route", "status_code"],
        )
        .map_err(RegistryError::Register)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "route", "status_code"],
        )
        .map_err(RegistryError::Register)?;

        let gpu_utilization = Gauge::with_opts(Opts::new(
            "gpu_utilization",
            "GPU utilization percentage",
        ))
        .map_err(RegistryError::Register)?;

        let model_inference = HistogramVec::new(
            HistogramOpts::new(
                "model_inference_seconds",
                "Model inference duration in seconds",
            )
            .buckets(MODEL_INFERENCE_BUCKETS.to_vec()),
            &["model_name"],
        )
        .map_err(RegistryError::Register)?;

        let metrics = Self {
            registry,
            http_request_duration,
            http_requests_total,
            gpu_utilization,
            model_inference,
        };

        metrics.register(metrics.http_request_duration.clone())?;
        metrics.register(metrics.http_requests_total.clone())?;
        metrics.register(metrics.gpu_utilization.clone())?;
        metrics.register(metrics.model_inference.clone())?;

        // Default process metrics (uptime, RSS, open fds) come from /proc.
        #[cfg(target_os = "linux")]
        metrics.register(prometheus::process_collector::ProcessCollector::for_self())?;

        Ok(metrics)
    }

    /// Build a registry with the default prefix.
    pub fn with_default_prefix() -> Result<Self, RegistryError> {
        Self::new(DEFAULT_PREFIX)
    }

    fn register<C: Collector + 'static>(&self, collector: C) -> Result<(), RegistryError> {
        self.registry
            .register(Box::new(collector))
            .map_err(RegistryError::Register)
    }

    /// The underlying registry, for collaborators registering their own
    /// instruments under the same prefix at startup.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one completed HTTP request: duration histogram + counter.
    pub fn observe_http_request(&self, method: &str, route: &str, status_code: u16, seconds: f64) {
        let status = status_code.to_string();
        let labels = [method, route, status.as_str()];
        self.http_request_duration
            .with_label_values(&labels)
            .observe(seconds);
        self.http_requests_total.with_label_values(&labels).inc();
    }

    /// Set the accelerator utilization gauge.
    ///
    /// Only a successful primary accelerator read may call this — the
    /// CPU-load fallback is informational and never reaches the gauge.
    pub fn set_gpu_utilization(&self, percent: f64) {
        self.gpu_utilization.set(percent);
    }

    /// Record one model inference duration.
    pub fn observe_model_inference(&self, model_name: &str, seconds: f64) {
        self.model_inference
            .with_label_values(&[model_name])
            .observe(seconds);
    }

    /// Render every registered family in the text exposition format.
    pub fn render(&self) -> Result<String, RegistryError> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buf)
            .map_err(RegistryError::Render)?;
        String::from_utf8(buf).map_err(|_| RegistryError::Utf8)
    }

    /// Content type of the text exposition format.
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruments_render_under_prefix() {
        let metrics = Metrics::new("testsvc").unwrap();
        metrics.observe_http_request("GET", "/api/v1/samples", 200, 0.05);
        metrics.set_gpu_utilization(37.5);
        metrics.observe_model_inference("qwen-vl", 1.8);

        let out = metrics.render().unwrap();
        assert!(out.contains("testsvc_http_request_duration_seconds_bucket"));
        assert!(out.contains("testsvc_http_requests_total"));
        assert!(out.contains("testsvc_gpu_utilization 37.5"));
        assert!(out.contains("testsvc_model_inference_seconds_count"));
    }

    #[test]
    fn request_labels_carry_method_route_status() {
        let metrics = Metrics::new("testsvc").unwrap();
        metrics.observe_http_request("POST", "/api/v1/issues", 201, 0.2);

        let out = metrics.render().unwrap();
        assert!(out.contains(
            "testsvc_http_requests_total{method=\"POST\",route=\"/api/v1/issues\",status_code=\"201\"} 1"
        ));
    }

    #[test]
    fn counter_accumulates_per_label_set() {
        let metrics = Metrics::new("testsvc").unwrap();
        metrics.observe_http_request("GET", "/a", 200, 0.01);
        metrics.observe_http_request("GET", "/a", 200, 0.02);
        metrics.observe_http_request("GET", "/a", 500, 0.03);

        let out = metrics.render().unwrap();
        assert!(out.contains("route=\"/a\",status_code=\"200\"} 2"));
        assert!(out.contains("route=\"/a\",status_code=\"500\"} 1"));
    }

    #[test]
    fn gauge_holds_last_set_value() {
        let metrics = Metrics::new("testsvc").unwrap();
        metrics.set_gpu_utilization(10.0);
        metrics.set_gpu_utilization(82.0);

        let out = metrics.render().unwrap();
        assert!(out.contains("testsvc_gpu_utilization 82"));
        assert!(!out.contains("testsvc_gpu_utilization 10"));
    }

    #[test]
    fn duplicate_family_registration_errors() {
        let metrics = Metrics::new("testsvc").unwrap();
        let dup = Gauge::with_opts(Opts::new("gpu_utilization", "duplicate")).unwrap();
        let err = metrics.registry().register(Box::new(dup));
        assert!(err.is_err());
    }

    #[test]
    fn separate_instances_are_isolated() {
        let a = Metrics::new("svc_a").unwrap();
        let b = Metrics::new("svc_b").unwrap();
        a.set_gpu_utilization(50.0);

        assert!(a.render().unwrap().contains("svc_a_gpu_utilization 50"));
        assert!(b.render().unwrap().contains("svc_b_gpu_utilization 0"));
    }

    #[test]
    fn render_parses_under_exposition_grammar() {
        let metrics = Metrics::new("testsvc").unwrap();
        metrics.observe_http_request("GET", "/x", 200, 0.4);
        metrics.set_gpu_utilization(12.0);
        metrics.observe_model_inference("m", 0.9);

        let sample_line = regex::Regex::new(
            r#"^[a-zA-Z_:][a-zA-Z0-9_:]*(\{[^{}]*\})? ([0-9eE.+-]+|[+-]?Inf|NaN)( [0-9]+)?$"#,
        )
        .unwrap();

        for line in metrics.render().unwrap().lines() {
            if line.is_empty() || line.starts_with("# HELP") || line.starts_with("# TYPE") {
                continue;
            }
            assert!(sample_line.is_match(line), "malformed exposition line: {line}");
        }
    }
}
