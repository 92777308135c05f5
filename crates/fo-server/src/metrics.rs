//! Request metrics in Prometheus text and JSON

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use fo_notifications::NotificationHub;
use tracing::{debug, info_span, Instrument};

pub struct Metrics {
    pub http_requests_total: AtomicU64,
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    pub http_request_duration_ms_total: AtomicU64,
    /// Requests currently being served
    pub in_flight_requests: AtomicU64,
    hub: NotificationHub,
    start_time: Instant,
}

impl Metrics {
    pub fn new(hub: NotificationHub) -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_duration_ms_total: AtomicU64::new(0),
            in_flight_requests: AtomicU64::new(0),
            hub,
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self, status: StatusCode, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_ms_total
            .fetch_add(duration_ms, Ordering::Relaxed);

        let code = status.as_u16();
        if (200..300).contains(&code) {
            self.http_requests_2xx.fetch_add(1, Ordering::Relaxed);
        } else if (400..500).contains(&code) {
            self.http_requests_4xx.fetch_add(1, Ordering::Relaxed);
        } else if code >= 500 {
            self.http_requests_5xx.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn notification_subscribers(&self) -> usize {
        self.hub.subscriber_count()
    }

    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();
        let mut metric = |name: &str, kind: &str, help: &str, samples: &[(&str, u64)]| {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} {}", name, kind);
            for (labels, value) in samples {
                let _ = writeln!(out, "{}{} {}", name, labels, value);
            }
        };

        metric(
            "http_requests_total",
            "counter",
            "Total number of HTTP requests",
            &[("", self.http_requests_total.load(Ordering::Relaxed))],
        );
        metric(
            "http_requests_by_status",
            "counter",
            "HTTP requests by status code range",
            &[
                ("{status=\"2xx\"}", self.http_requests_2xx.load(Ordering::Relaxed)),
                ("{status=\"4xx\"}", self.http_requests_4xx.load(Ordering::Relaxed)),
                ("{status=\"5xx\"}", self.http_requests_5xx.load(Ordering::Relaxed)),
            ],
        );
        metric(
            "http_request_duration_ms_total",
            "counter",
            "Total HTTP request duration in milliseconds",
            &[("", self.http_request_duration_ms_total.load(Ordering::Relaxed))],
        );
        metric(
            "http_requests_in_flight",
            "gauge",
            "Requests currently being served",
            &[("", self.in_flight_requests.load(Ordering::Relaxed))],
        );
        metric(
            "notification_subscribers",
            "gauge",
            "Open notification streams",
            &[("", self.notification_subscribers() as u64)],
        );
        metric(
            "uptime_seconds",
            "gauge",
            "Server uptime in seconds",
            &[("", self.uptime_seconds())],
        );

        out
    }

    pub fn export_json(&self) -> serde_json::Value {
        serde_json::json!({
            "http": {
                "requests_total": self.http_requests_total.load(Ordering::Relaxed),
                "requests_2xx": self.http_requests_2xx.load(Ordering::Relaxed),
                "requests_4xx": self.http_requests_4xx.load(Ordering::Relaxed),
                "requests_5xx": self.http_requests_5xx.load(Ordering::Relaxed),
                "request_duration_ms_total": self.http_request_duration_ms_total.load(Ordering::Relaxed),
                "in_flight": self.in_flight_requests.load(Ordering::Relaxed),
            },
            "notifications": {
                "subscribers": self.notification_subscribers(),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
    }
}

pub async fn metrics_middleware(State(metrics): State<Arc<Metrics>>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    metrics.in_flight_requests.fetch_add(1, Ordering::Relaxed);
    let response = next
        .run(request)
        .instrument(info_span!("http_request", %method, %uri))
        .await;
    metrics.in_flight_requests.fetch_sub(1, Ordering::Relaxed);

    let duration = start.elapsed();
    let status = response.status();
    debug!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        "Request completed"
    );
    metrics.record_request(status, duration.as_millis() as u64);

    response
}

/// GET /metrics
pub async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.export_prometheus()
}

/// GET /metrics.json
pub async fn json_metrics(State(metrics): State<Arc<Metrics>>) -> axum::Json<serde_json::Value> {
    axum::Json(metrics.export_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new(NotificationHub::default());

        metrics.record_request(StatusCode::OK, 50);
        metrics.record_request(StatusCode::NOT_FOUND, 10);
        metrics.record_request(StatusCode::INTERNAL_SERVER_ERROR, 100);

        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.http_requests_2xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_5xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_request_duration_ms_total.load(Ordering::Relaxed), 160);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new(NotificationHub::default());
        metrics.record_request(StatusCode::OK, 50);

        let output = metrics.export_prometheus();
        assert!(output.contains("http_requests_total 1"));
        assert!(output.contains("http_requests_by_status{status=\"2xx\"} 1"));
        assert!(output.contains("notification_subscribers 0"));
    }

    #[test]
    fn test_subscribers_are_counted() {
        let hub = NotificationHub::default();
        let metrics = Metrics::new(hub.clone());
        let _stream = hub.subscribe(7);

        assert_eq!(metrics.export_json()["notifications"]["subscribers"], 1);
    }
}
