//! Dispatcher core: walks the resource tree for one request and invokes the handler.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use super::binder::{child_mount_index, BoundArgs, ParamVec};
use super::context::{effective_method, parse_query, split_path, DispatchPhase, ResolutionContext};
use super::verb::{resolve_default, resolve_local, LocalInput, LocalMatch};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::render::{Rendered, RendererRegistry};
use crate::resource::{HandlerCall, HandlerDescriptor, Lookup, LookupRequest, ResourceNode};

/// Maximum inline headers before heap allocation.
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names use `Arc<str>` (O(1) clone); values are per request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// One request as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// Literal HTTP verb (before any `_method` override)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Query string parameters (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// HTTP headers, names lower-cased
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl DispatchRequest {
    /// Build a request from a verb and a request target (`/path?query`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query_params: parse_query(query),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Response produced for a request: rendered handler output or an abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Encoded response body
    pub body: Vec<u8>,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Response carrying renderer output.
    #[must_use]
    pub fn rendered(status: u16, rendered: Rendered) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), rendered.content_type.to_string()));
        Self::new(status, headers, rendered.body)
    }

    /// Create a JSON response
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, body.to_string().into_bytes())
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message, "status": status }))
    }

    /// Abort response for a failed walk; 405s carry an `Allow` header.
    #[must_use]
    pub fn from_dispatch_error(err: &DispatchError) -> Self {
        let mut resp = Self::error(err.status(), &err.to_string());
        if let DispatchError::MethodNotAllowed { allowed, .. } = err {
            let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
            resp.set_header("allow", allowed.join(", "));
        }
        resp
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Body decoded as JSON, if it is JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Handler chosen by a successful walk, with its bound arguments.
#[derive(Debug, Clone)]
pub struct ResolvedHandler {
    pub handler: HandlerDescriptor,
    pub args: BoundArgs,
    /// Effective verb
    pub method: Method,
    /// Node the handler belongs to
    pub node: Arc<ResourceNode>,
    /// Slash-joined mount names from the root to `node`
    pub trail: String,
}

/// Resource-tree dispatcher.
///
/// Holds the immutable tree, the renderer registry and the middleware chain. Cheap to
/// clone and safe to share across request coroutines; all per-request state lives in
/// a [`ResolutionContext`].
#[derive(Clone)]
pub struct Dispatcher {
    root: Arc<ResourceNode>,
    renderers: Arc<RendererRegistry>,
    /// Ordered list of middleware to apply to requests/responses
    middlewares: Vec<Arc<dyn Middleware>>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Dispatcher over `root` with default settings and the built-in renderers.
    #[must_use]
    pub fn new(root: Arc<ResourceNode>) -> Self {
        Self {
            root,
            renderers: Arc::new(RendererRegistry::default()),
            middlewares: Vec::new(),
            config: DispatchConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = Arc::new(renderers);
        self
    }

    /// Add middleware to the processing pipeline
    ///
    /// Middleware is executed in the order it's added.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn root(&self) -> &Arc<ResourceNode> {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Walk the tree for `req` and return the handler that should serve it.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] and [`DispatchError::MethodNotAllowed`] for routing
    /// misses, a hook's [`DispatchError::LookupFailure`], or
    /// [`DispatchError::Cancelled`] when the configured request timeout expires.
    pub fn resolve(&self, req: &DispatchRequest) -> Result<ResolvedHandler, DispatchError> {
        let method = effective_method(
            &req.method,
            &req.query_params,
            &self.config.method_override_param,
        );
        if method != req.method {
            debug!(
                request_id = %req.request_id,
                literal = %req.method,
                effective = %method,
                "Method override applied"
            );
        }
        let deadline = self.config.request_timeout().map(|t| Instant::now() + t);
        let mut ctx = ResolutionContext::new(
            Arc::clone(&self.root),
            split_path(&req.path),
            method,
            deadline,
        );

        let result = self.walk(&mut ctx, req);
        if let Err(err) = &result {
            debug!(
                request_id = %req.request_id,
                method = %ctx.method,
                path = %req.path,
                trail = %ctx.trail_string(),
                depth = ctx.depth,
                status = err.status(),
                error = %err,
                "Resolution failed"
            );
        }
        result
    }

    fn walk(
        &self,
        ctx: &mut ResolutionContext,
        req: &DispatchRequest,
    ) -> Result<ResolvedHandler, DispatchError> {
        loop {
            ctx.enter(DispatchPhase::Descending)?;
            if ctx.depth > self.config.max_depth {
                warn!(
                    request_id = %req.request_id,
                    path = %req.path,
                    max_depth = self.config.max_depth,
                    "Resolution exceeded maximum depth"
                );
                return Err(ctx.fail(DispatchError::NotFound {
                    path: req.path.clone(),
                }));
            }
            let node = Arc::clone(&ctx.node);

            // static children win over everything local
            if let Some(index) = child_mount_index(&node, ctx.parent_args.len(), &ctx.remaining) {
                if let Some(child) = node.child(&ctx.remaining[index]) {
                    debug!(
                        request_id = %req.request_id,
                        node = %node.name(),
                        child = %child.name(),
                        identifiers = index,
                        "Descending into child"
                    );
                    ctx.descend_static(Arc::clone(child), index);
                    continue;
                }
            }

            ctx.enter(DispatchPhase::VerbResolving)?;
            let input = LocalInput {
                method: &ctx.method,
                parent_args: &ctx.parent_args,
                remaining: &ctx.remaining,
                identified: ctx.identified,
            };
            let mut allowed = match resolve_local(&node, input) {
                LocalMatch::Matched { handler, args } => {
                    return Ok(Self::resolved(ctx, &node, handler, args));
                }
                LocalMatch::NotAllowed {
                    allowed,
                    strict: true,
                } => {
                    let method = ctx.method.clone();
                    return Err(ctx.fail(DispatchError::MethodNotAllowed { method, allowed }));
                }
                LocalMatch::NotAllowed { allowed, .. } => allowed,
                LocalMatch::NoMatch => Vec::new(),
            };

            if let Some(hook) = node.lookup_hook() {
                if !ctx.remaining.is_empty() {
                    ctx.enter(DispatchPhase::Descending)?;
                    let outcome = hook.lookup(&LookupRequest {
                        segment: &ctx.remaining[0],
                        remainder: &ctx.remaining[1..],
                        parent_args: &ctx.parent_args,
                        method: &ctx.method,
                        request_id: req.request_id,
                    });
                    ctx.check_deadline()?;
                    match outcome {
                        Ok(Lookup::Found(found)) => {
                            debug!(
                                request_id = %req.request_id,
                                node = %node.name(),
                                segment = %ctx.remaining[0],
                                found = %found.node.name(),
                                "Dynamic lookup matched"
                            );
                            ctx.descend_lookup(found);
                            continue;
                        }
                        Ok(Lookup::NotFound) => {}
                        Err(err) => {
                            warn!(
                                request_id = %req.request_id,
                                node = %node.name(),
                                error = %err,
                                "Dynamic lookup failed"
                            );
                            return Err(ctx.fail(err));
                        }
                    }
                    ctx.enter(DispatchPhase::VerbResolving)?;
                }
            }

            let input = LocalInput {
                method: &ctx.method,
                parent_args: &ctx.parent_args,
                remaining: &ctx.remaining,
                identified: ctx.identified,
            };
            match resolve_default(&node, input) {
                LocalMatch::Matched { handler, args } => {
                    return Ok(Self::resolved(ctx, &node, handler, args));
                }
                LocalMatch::NotAllowed { allowed: more, .. } => {
                    for m in more {
                        if !allowed.contains(&m) {
                            allowed.push(m);
                        }
                    }
                }
                LocalMatch::NoMatch => {}
            }

            let err = if allowed.is_empty() {
                DispatchError::NotFound {
                    path: req.path.clone(),
                }
            } else {
                DispatchError::MethodNotAllowed {
                    method: ctx.method.clone(),
                    allowed,
                }
            };
            return Err(ctx.fail(err));
        }
    }

    fn resolved(
        ctx: &mut ResolutionContext,
        node: &Arc<ResourceNode>,
        handler: &HandlerDescriptor,
        args: BoundArgs,
    ) -> ResolvedHandler {
        ctx.phase = DispatchPhase::ArgBinding;
        ResolvedHandler {
            handler: handler.clone(),
            args,
            method: ctx.method.clone(),
            node: Arc::clone(node),
            trail: ctx.trail_string(),
        }
    }

    /// Call a resolved handler and render its result.
    ///
    /// Handler errors abort with their own status; panics and renderer failures
    /// become 500.
    #[must_use]
    pub fn invoke(&self, req: &DispatchRequest, resolved: &ResolvedHandler) -> HandlerResponse {
        let call = HandlerCall {
            request_id: req.request_id,
            method: resolved.method.clone(),
            path: req.path.clone(),
            args: resolved.args.clone(),
            query: req.query_params.clone(),
            body: req.body.clone(),
        };
        let handler_name = resolved.handler.name();

        info!(
            request_id = %req.request_id,
            phase = %DispatchPhase::Invoking,
            handler_name = %handler_name,
            trail = %resolved.trail,
            args = ?resolved.args.positional(),
            "Handler execution start"
        );
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| resolved.handler.call(&call)));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(value)) => match self.renderers.render(resolved.handler.renderer(), &value) {
                Ok(rendered) => {
                    info!(
                        request_id = %req.request_id,
                        handler_name = %handler_name,
                        execution_time_ms = elapsed_ms,
                        "Handler execution complete"
                    );
                    HandlerResponse::rendered(200, rendered)
                }
                Err(err) => {
                    error!(
                        request_id = %req.request_id,
                        handler_name = %handler_name,
                        renderer = %resolved.handler.renderer(),
                        error = %err,
                        "Rendering failed"
                    );
                    HandlerResponse::error(500, &err.to_string())
                }
            },
            Ok(Err(err)) => {
                let status = err.status();
                if status >= 500 {
                    error!(
                        request_id = %req.request_id,
                        handler_name = %handler_name,
                        status = status,
                        error = %err,
                        "Handler failed"
                    );
                } else {
                    info!(
                        request_id = %req.request_id,
                        handler_name = %handler_name,
                        status = status,
                        error = %err,
                        "Handler aborted"
                    );
                }
                HandlerResponse::error(status, &err.to_string())
            }
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    request_id = %req.request_id,
                    handler_name = %handler_name,
                    panic_message = %panic_message,
                    "Handler panicked - CRITICAL"
                );
                HandlerResponse::error(500, &format!("handler '{handler_name}' panicked"))
            }
        }
    }

    /// Resolve and invoke `req`, running the middleware chain around it.
    ///
    /// Never fails: routing misses and handler failures become error responses.
    #[must_use]
    pub fn dispatch(&self, req: &DispatchRequest) -> HandlerResponse {
        let mut early_resp: Option<HandlerResponse> = None;
        for (idx, mw) in self.middlewares.iter().enumerate() {
            if early_resp.is_none() {
                early_resp = mw.before(req);
                if early_resp.is_some() {
                    debug!(
                        request_id = %req.request_id,
                        middleware_idx = idx,
                        middleware_name = std::any::type_name_of_val(mw.as_ref()),
                        "Middleware returned early response"
                    );
                }
            } else {
                mw.before(req);
            }
        }

        let start = Instant::now();
        let mut resp = match early_resp {
            Some(resp) => resp,
            None => match self.resolve(req) {
                Ok(resolved) => self.invoke(req, &resolved),
                Err(err) => HandlerResponse::from_dispatch_error(&err),
            },
        };
        let latency: Duration = start.elapsed();

        for mw in &self.middlewares {
            mw.after(req, &mut resp, latency);
        }
        resp
    }
}
