use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::{DispatchRequest, HandlerResponse};

/// Middleware for collecting Prometheus-compatible metrics
///
/// All counters use atomic operations for thread-safe updates without locks.
///
/// Metrics collected:
/// - Total request count and average latency
/// - Responses by outcome (404, 405, other 4xx, 5xx)
/// - Coroutine stack size
/// - Top-level requests (`/health`, `/metrics`) that bypass dispatch
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    not_found: AtomicUsize,
    method_not_allowed: AtomicUsize,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    stack_size: AtomicUsize,
    top_level_requests: AtomicUsize,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            total_latency_ns: AtomicU64::new(0),
            not_found: AtomicUsize::new(0),
            method_not_allowed: AtomicUsize::new(0),
            client_errors: AtomicUsize::new(0),
            server_errors: AtomicUsize::new(0),
            stack_size: AtomicUsize::new(0),
            top_level_requests: AtomicUsize::new(0),
        }
    }
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests dispatched
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time, zero before the first request
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    pub fn not_found_count(&self) -> usize {
        self.not_found.load(Ordering::Relaxed)
    }

    pub fn method_not_allowed_count(&self) -> usize {
        self.method_not_allowed.load(Ordering::Relaxed)
    }

    pub fn client_error_count(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    pub fn server_error_count(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Coroutine stack size seen by the last request
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }

    /// Count an infrastructure request that never reached the dispatcher.
    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition of all counters.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let counters: [(&str, &str, u64); 6] = [
            (
                "resttree_requests_total",
                "Requests dispatched through the resource tree",
                self.request_count() as u64,
            ),
            (
                "resttree_not_found_total",
                "Requests answered 404",
                self.not_found_count() as u64,
            ),
            (
                "resttree_method_not_allowed_total",
                "Requests answered 405",
                self.method_not_allowed_count() as u64,
            ),
            (
                "resttree_client_errors_total",
                "Requests answered with any 4xx status",
                self.client_error_count() as u64,
            ),
            (
                "resttree_server_errors_total",
                "Requests answered with any 5xx status",
                self.server_error_count() as u64,
            ),
            (
                "resttree_top_level_requests_total",
                "Infrastructure requests served outside the dispatcher",
                self.top_level_request_count() as u64,
            ),
        ];
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {value}");
        }
        let _ = writeln!(
            out,
            "# HELP resttree_request_latency_seconds Average request latency"
        );
        let _ = writeln!(out, "# TYPE resttree_request_latency_seconds gauge");
        let _ = writeln!(
            out,
            "resttree_request_latency_seconds {:.6}",
            self.average_latency().as_secs_f64()
        );
        let _ = writeln!(out, "# HELP resttree_coroutine_stack_bytes Coroutine stack size");
        let _ = writeln!(out, "# TYPE resttree_coroutine_stack_bytes gauge");
        let _ = writeln!(out, "resttree_coroutine_stack_bytes {}", self.stack_size());
        out
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &DispatchRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &DispatchRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        match res.status {
            404 => {
                self.not_found.fetch_add(1, Ordering::Relaxed);
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            405 => {
                self.method_not_allowed.fetch_add(1, Ordering::Relaxed);
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}
