use std::time::Duration;

use tracing::{debug, info, warn};

use super::Middleware;
use crate::dispatcher::{DispatchRequest, HandlerResponse};

/// Logs one line per request with its outcome and latency.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &DispatchRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            "Request received"
        );
        None
    }

    fn after(&self, req: &DispatchRequest, res: &mut HandlerResponse, latency: Duration) {
        let allow = res.get_header("allow").unwrap_or_default();
        let latency_ms = latency.as_millis() as u64;
        if res.status >= 500 {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                status = res.status,
                latency_ms = latency_ms,
                "Request completed with server error"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                status = res.status,
                latency_ms = latency_ms,
                allow = %allow,
                "Request completed"
            );
        }
    }
}
