use std::io;
use std::sync::Arc;

use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use tracing::warn;

use super::request::parse_request;
use super::response::{write_handler_response, write_json_error};
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::middleware::MetricsMiddleware;

/// `may_minihttp` service: infrastructure endpoints first, then the resource tree.
///
/// Cloned once per connection; every clone shares the same dispatcher.
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Option<Arc<MetricsMiddleware>>,
    /// Serve `GET /health`
    pub health: bool,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            metrics: None,
            health: true,
        }
    }

    /// Serve `GET /metrics` from `metrics`. The same middleware should be installed
    /// on the dispatcher so dispatched requests are counted.
    pub fn set_metrics_middleware(&mut self, metrics: Arc<MetricsMiddleware>) {
        self.metrics = Some(metrics);
    }

    pub fn set_health_endpoint(&mut self, enabled: bool) {
        self.health = enabled;
    }
}

/// Health check response: `{ "status": "ok" }`.
#[must_use]
pub fn health_response() -> HandlerResponse {
    HandlerResponse::json(200, &json!({ "status": "ok" }))
}

/// Prometheus text exposition of `metrics`.
#[must_use]
pub fn metrics_response(metrics: &MetricsMiddleware) -> HandlerResponse {
    let mut resp = HandlerResponse::new(
        200,
        Default::default(),
        metrics.render_prometheus().into_bytes(),
    );
    resp.set_header("content-type", "text/plain; version=0.0.4".to_string());
    resp
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match parse_request(req) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Rejected request with invalid method");
                write_json_error(res, 400, "invalid request method");
                return Ok(());
            }
        };

        if request.method == Method::GET {
            if self.health && request.path == "/health" {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_top_level_request();
                }
                write_handler_response(res, health_response());
                return Ok(());
            }
            if let Some(metrics) = self.metrics.as_ref().filter(|_| request.path == "/metrics") {
                metrics.inc_top_level_request();
                write_handler_response(res, metrics_response(metrics));
                return Ok(());
            }
        }

        let resp = self.dispatcher.dispatch(&request);
        write_handler_response(res, resp);
        Ok(())
    }
}
