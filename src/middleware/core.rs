use std::time::Duration;

use crate::dispatcher::{DispatchRequest, HandlerResponse};

/// Request/response hook around dispatch.
pub trait Middleware: Send + Sync {
    /// Runs before resolution. Returning a response skips the walk and the handler.
    fn before(&self, _req: &DispatchRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &DispatchRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
