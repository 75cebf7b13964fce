//! Metrics collection and Prometheus integration service.

use prometheus::{CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::{Duration, Instant};

/// Route label of the scrape endpoint, excluded from request metrics.
pub const METRICS_ROUTE: &str = "/metrics";

/// Application metrics collector for Prometheus integration
#[derive(Clone)]
pub struct AppMetrics {
    pub registry: Registry,
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub auth_failures_total: CounterVec,
    pub rate_limited_requests_total: CounterVec,
    pub app_uptime_seconds: Gauge,
    pub app_info: CounterVec,
    pub start_time: Instant,
}

impl AppMetrics {
    /// Create a collector on its own registry, labelled with the service name
    pub fn new(app_name: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "status", "route"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "route"],
        )?;

        let auth_failures_total = CounterVec::new(
            Opts::new("auth_failures_total", "Rejected bearer tokens by reason"),
            &["reason"],
        )?;

        let rate_limited_requests_total = CounterVec::new(
            Opts::new(
                "rate_limited_requests_total",
                "Requests rejected by the rate limiter",
            ),
            &["route"],
        )?;

        let app_uptime_seconds = Gauge::new("app_uptime_seconds", "Application uptime in seconds")?;

        let app_info = CounterVec::new(
            Opts::new("app_info", "Application information"),
            &["version", "name"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(rate_limited_requests_total.clone()))?;
        registry.register(Box::new(app_uptime_seconds.clone()))?;
        registry.register(Box::new(app_info.clone()))?;

        app_info
            .with_label_values(&[env!("CARGO_PKG_VERSION"), app_name])
            .inc();

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            auth_failures_total,
            rate_limited_requests_total,
            app_uptime_seconds,
            app_info,
            start_time: Instant::now(),
        })
    }

    /// Record an HTTP request with method, route, status, and duration
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        if route == METRICS_ROUTE {
            return;
        }

        self.http_requests_total
            .with_label_values(&[method, &status.to_string(), route])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration.as_secs_f64());
    }

    pub fn record_auth_failure(&self, reason: &str) {
        self.auth_failures_total.with_label_values(&[reason]).inc();
    }

    pub fn record_rate_limited(&self, route: &str) {
        self.rate_limited_requests_total
            .with_label_values(&[route])
            .inc();
    }

    /// Update the application uptime gauge
    pub fn update_uptime(&self) {
        let uptime = self.start_time.elapsed().as_secs_f64();
        self.app_uptime_seconds.set(uptime);
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render_with_labels() {
        let metrics = AppMetrics::new("keel-api").unwrap();
        metrics.record_request("GET", "/users/{user_id}", 200, Duration::from_millis(12));
        metrics.record_auth_failure("expired");
        metrics.record_rate_limited("/cache/{key}");
        metrics.update_uptime();

        let output = metrics.render().unwrap();
        assert!(output.contains(r#"http_requests_total{method="GET",route="/users/{user_id}",status="200"} 1"#));
        assert!(output.contains(r#"auth_failures_total{reason="expired"} 1"#));
        assert!(output.contains(r#"rate_limited_requests_total{route="/cache/{key}"} 1"#));
        assert!(output.contains("app_info"));
    }

    #[test]
    fn test_metrics_route_is_not_recorded() {
        let metrics = AppMetrics::new("keel-api").unwrap();
        metrics.record_request("GET", METRICS_ROUTE, 200, Duration::from_millis(1));

        let output = metrics.render().unwrap();
        assert!(!output.contains(r#"route="/metrics""#));
    }
}
