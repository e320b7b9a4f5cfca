//! # Render Module
//!
//! Renderers turn a handler's JSON value into response bytes. Handlers pick one by
//! name ([`HandlerDescriptor::render_as`](crate::resource::HandlerDescriptor::render_as));
//! the default is `json`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::HandlerError;

/// Encoded handler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Turns handler output into bytes.
pub trait Renderer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the value cannot be encoded; the dispatcher
    /// answers 500.
    fn render(&self, value: &Value) -> Result<Rendered, HandlerError>;
}

/// Compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, value: &Value) -> Result<Rendered, HandlerError> {
        Ok(Rendered {
            content_type: "application/json",
            body: serde_json::to_vec(value)?,
        })
    }
}

/// Plain text: strings verbatim, arrays one element per line, anything else as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    fn line(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Renderer for TextRenderer {
    fn render(&self, value: &Value) -> Result<Rendered, HandlerError> {
        let text = match value {
            Value::Null => String::new(),
            Value::Array(items) => {
                let mut out: String = items.iter().map(Self::line).collect::<Vec<_>>().join("\n");
                if !out.is_empty() {
                    out.push('\n');
                }
                out
            }
            other => Self::line(other),
        };
        Ok(Rendered {
            content_type: "text/plain; charset=utf-8",
            body: text.into_bytes(),
        })
    }
}

/// Named renderers available to handlers.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
}

impl Default for RendererRegistry {
    /// `json` and `text`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("json", Arc::new(JsonRenderer));
        registry.register("text", Arc::new(TextRenderer));
        registry
    }
}

impl RendererRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Register (or replace) renderer `name`.
    pub fn register(&mut self, name: &str, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(name.to_string(), renderer);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Render `value` with renderer `name`.
    ///
    /// # Errors
    ///
    /// Unknown renderer names and renderer failures are [`HandlerError::Internal`].
    pub fn render(&self, name: &str, value: &Value) -> Result<Rendered, HandlerError> {
        let renderer = self
            .renderers
            .get(name)
            .ok_or_else(|| HandlerError::Internal(format!("no renderer named '{name}'")))?;
        renderer.render(value)
    }
}
