use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use super::Signature;
use crate::dispatcher::{BoundArgs, ParamVec};
use crate::error::HandlerError;
use crate::ids::RequestId;

/// Renderer used when a handler does not name one.
pub const DEFAULT_RENDERER: &str = "json";

/// Type-erased handler function.
pub type HandlerFn = Arc<dyn Fn(&HandlerCall) -> Result<Value, HandlerError> + Send + Sync>;

/// Everything a handler receives when it is invoked.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    /// Request id for correlation
    pub request_id: RequestId,
    /// Effective verb (after any `_method` override)
    pub method: Method,
    /// Request path as received
    pub path: String,
    /// Positional arguments bound from the path
    pub args: BoundArgs,
    /// Query string parameters
    pub query: ParamVec,
    /// JSON request body, if any
    pub body: Option<Value>,
}

impl HandlerCall {
    /// Get a bound path argument by parameter name.
    #[inline]
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name)
    }

    /// Parse a bound path argument, failing with 400 when missing or malformed.
    pub fn parse_arg<T: FromStr>(&self, name: &str) -> Result<T, HandlerError> {
        let raw = self
            .arg(name)
            .ok_or_else(|| HandlerError::BadRequest(format!("missing argument '{name}'")))?;
        raw.parse()
            .map_err(|_| HandlerError::BadRequest(format!("malformed argument '{name}': {raw}")))
    }

    /// Get a query parameter by name (last occurrence wins).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up an input field, preferring the JSON body over the query string.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.body
            .as_ref()
            .and_then(|b| b.get(name))
            .cloned()
            .or_else(|| {
                self.get_query_param(name)
                    .map(|v| Value::String(v.to_string()))
            })
    }
}

/// A callable plus its declared signature and the renderer for its result.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: Arc<str>,
    signature: Signature,
    renderer: Arc<str>,
    func: HandlerFn,
}

/// Shorthand for [`HandlerDescriptor::new`].
pub fn handler<F>(signature: Signature, func: F) -> HandlerDescriptor
where
    F: Fn(&HandlerCall) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    HandlerDescriptor::new(signature, func)
}

impl HandlerDescriptor {
    /// Create a descriptor rendering through the default JSON renderer.
    ///
    /// The descriptor name is filled in when the handler is registered on a node.
    pub fn new<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(&HandlerCall) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(""),
            signature,
            renderer: Arc::from(DEFAULT_RENDERER),
            func: Arc::new(func),
        }
    }

    /// Render the result through the named renderer instead of JSON.
    #[must_use]
    pub fn render_as(mut self, renderer: &str) -> Self {
        self.renderer = Arc::from(renderer);
        self
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        self.name = Arc::from(name);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[must_use]
    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    /// Invoke the handler.
    pub fn call(&self, call: &HandlerCall) -> Result<Value, HandlerError> {
        (self.func)(call)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

/// One logical endpoint: an optional verb-independent handler plus per-verb overrides.
///
/// A plain exposed handler is an endpoint with only a default. Generic dispatch adds
/// `when(verb)` overrides which win over the default for their verb.
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: Arc<str>,
    default: Option<HandlerDescriptor>,
    by_verb: Vec<(Method, HandlerDescriptor)>,
}

impl Endpoint {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            default: None,
            by_verb: Vec::new(),
        }
    }

    pub(crate) fn set_default(&mut self, handler: HandlerDescriptor) -> bool {
        if self.default.is_some() {
            return false;
        }
        self.default = Some(handler.named(&self.name));
        true
    }

    pub(crate) fn set_verb(&mut self, method: Method, handler: HandlerDescriptor) -> bool {
        if self.by_verb.iter().any(|(m, _)| *m == method) {
            return false;
        }
        let name = format!("{}[{}]", self.name, method);
        self.by_verb.push((method, handler.named(&name)));
        true
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handler serving `method`: the verb override if present, else the default.
    #[must_use]
    pub fn handler_for(&self, method: &Method) -> Option<&HandlerDescriptor> {
        self.by_verb
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, h)| h)
            .or(self.default.as_ref())
    }

    /// Verbs with an explicit override, in registration order.
    #[must_use]
    pub fn verbs(&self) -> Vec<Method> {
        self.by_verb.iter().map(|(m, _)| m.clone()).collect()
    }

    /// All handlers of this endpoint, default first.
    pub fn handlers(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.default
            .iter()
            .chain(self.by_verb.iter().map(|(_, h)| h))
    }
}
