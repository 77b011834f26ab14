use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

pub type MetricsResult<T> = Result<T, prometheus::Error>;

#[derive(Clone)]
pub struct AdvisoryMetrics {
    registry: Registry,
    guard_decisions: IntCounterVec,
    backend_fetch_failures: IntCounterVec,
    backend_fetch_seconds: HistogramVec,
}

impl AdvisoryMetrics {
    pub fn new() -> MetricsResult<Self> {
        let registry = Registry::new();

        let guard_decisions = IntCounterVec::new(
            Opts::new(
                "advisory_guard_decisions_total",
                "Route guard evaluations grouped by guard and outcome",
            ),
            &["guard", "outcome"],
        )?;
        registry.register(Box::new(guard_decisions.clone()))?;

        let backend_fetch_failures = IntCounterVec::new(
            Opts::new(
                "advisory_backend_fetch_failures_total",
                "Failed reads against the managed backend, by table",
            ),
            &["table"],
        )?;
        registry.register(Box::new(backend_fetch_failures.clone()))?;

        let backend_fetch_seconds = HistogramVec::new(
            HistogramOpts::new(
                "advisory_backend_fetch_seconds",
                "Latency of reads against the managed backend",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
            &["table"],
        )?;
        registry.register(Box::new(backend_fetch_seconds.clone()))?;

        Ok(Self {
            registry,
            guard_decisions,
            backend_fetch_failures,
            backend_fetch_seconds,
        })
    }

    pub fn guard_decision(&self, guard: &str, outcome: &str) {
        self.guard_decisions.with_label_values(&[guard, outcome]).inc();
    }

    pub fn guard_decision_count(&self, guard: &str, outcome: &str) -> u64 {
        self.guard_decisions.with_label_values(&[guard, outcome]).get()
    }

    pub fn fetch_failure(&self, table: &str) {
        self.backend_fetch_failures.with_label_values(&[table]).inc();
    }

    pub fn fetch_failure_count(&self, table: &str) -> u64 {
        self.backend_fetch_failures.with_label_values(&[table]).get()
    }

    pub fn observe_fetch(&self, table: &str, seconds: f64) {
        self.backend_fetch_seconds.with_label_values(&[table]).observe(seconds);
    }

    pub fn encode(&self) -> MetricsResult<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }

    pub fn render(&self) -> Response {
        match self.encode() {
            Ok(buffer) => {
                let mut response = Response::new(Body::from(buffer));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode metrics");
                let mut response = Response::new(Body::from("metrics unavailable"));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
