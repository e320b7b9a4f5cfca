use std::collections::BTreeMap;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use super::node::REST_RESERVED;
use super::{DynamicResolver, Endpoint, HandlerDescriptor, NodeKind, ParentArity, ResourceNode};
use crate::error::ConfigError;

/// Fluent, validating builder for [`ResourceNode`].
///
/// Registration mistakes are collected while chaining and reported by [`build`](Self::build),
/// so a broken tree fails at startup instead of per request.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use resttree::resource::{handler, ResourceBuilder, Signature};
/// use serde_json::json;
///
/// let books = ResourceBuilder::rest("books")
///     .expose("get_one", handler(Signature::fixed(["author_id", "id"]), |call| {
///         Ok(json!({ "author": call.arg("author_id"), "book": call.arg("id") }))
///     }))
///     .build()
///     .unwrap();
///
/// let authors = ResourceBuilder::rest("authors")
///     .expose("get_one", handler(Signature::fixed(["id"]), |call| Ok(json!(call.arg("id")))))
///     .action("archive", &[Method::POST])
///     .expose("archive", handler(Signature::fixed(["id"]), |_| Ok(json!(true))))
///     .mount(books)
///     .build()
///     .unwrap();
/// assert!(authors.child("books").is_some());
/// ```
pub struct ResourceBuilder {
    name: String,
    kind: NodeKind,
    endpoints: BTreeMap<Arc<str>, Endpoint>,
    children: BTreeMap<Arc<str>, Arc<ResourceNode>>,
    lookup: Option<Arc<dyn DynamicResolver>>,
    default: Option<Endpoint>,
    custom_actions: BTreeMap<Arc<str>, Vec<Method>>,
    parent_arity: Option<ParentArity>,
    errors: Vec<ConfigError>,
}

fn valid_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains('/')
}

impl ResourceBuilder {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            endpoints: BTreeMap::new(),
            children: BTreeMap::new(),
            lookup: None,
            default: None,
            custom_actions: BTreeMap::new(),
            parent_arity: None,
            errors: Vec::new(),
        }
    }

    /// Start a REST resource mounted under `name`.
    #[must_use]
    pub fn rest(name: &str) -> Self {
        Self::new(name, NodeKind::Rest)
    }

    /// Start an object-style controller mounted under `name`.
    #[must_use]
    pub fn controller(name: &str) -> Self {
        Self::new(name, NodeKind::Controller)
    }

    fn node_name(&self) -> String {
        self.name.clone()
    }

    fn endpoint_mut(&mut self, name: &str) -> Option<&mut Endpoint> {
        if !valid_segment(name) {
            self.errors.push(ConfigError::InvalidName {
                node: self.node_name(),
                name: name.to_string(),
            });
            return None;
        }
        if self.children.contains_key(name) {
            self.errors.push(ConfigError::DuplicateName {
                node: self.node_name(),
                name: name.to_string(),
            });
            return None;
        }
        Some(
            self.endpoints
                .entry(Arc::from(name))
                .or_insert_with(|| Endpoint::new(name)),
        )
    }

    /// Expose `handler` as the verb-independent handler of endpoint `name`.
    ///
    /// On REST nodes the name selects the role (`get_one`, `post`, ...) or a custom action.
    /// On controllers it is the segment that addresses the endpoint (`index` for none).
    #[must_use]
    pub fn expose(mut self, name: &str, handler: HandlerDescriptor) -> Self {
        let node = self.node_name();
        if let Some(endpoint) = self.endpoint_mut(name) {
            if !endpoint.set_default(handler) {
                self.errors.push(ConfigError::DuplicateDefault {
                    node,
                    endpoint: name.to_string(),
                });
            }
        }
        self
    }

    /// Override endpoint `name` for one verb (generic dispatch).
    #[must_use]
    pub fn when(mut self, name: &str, method: Method, handler: HandlerDescriptor) -> Self {
        let node = self.node_name();
        if let Some(endpoint) = self.endpoint_mut(name) {
            if !endpoint.set_verb(method.clone(), handler) {
                self.errors.push(ConfigError::DuplicateVerb {
                    node,
                    endpoint: name.to_string(),
                    method,
                });
            }
        }
        self
    }

    /// Declare custom action `name` and the verbs it accepts.
    ///
    /// The action's handlers are registered with [`expose`](Self::expose) /
    /// [`when`](Self::when) under the same name.
    #[must_use]
    pub fn action(mut self, name: &str, methods: &[Method]) -> Self {
        let node = self.node_name();
        let error = if self.kind != NodeKind::Rest {
            Some(ConfigError::ActionOnController {
                node,
                action: name.to_string(),
            })
        } else if REST_RESERVED.contains(&name) {
            Some(ConfigError::ReservedActionName {
                node,
                action: name.to_string(),
            })
        } else if !valid_segment(name) {
            Some(ConfigError::InvalidName {
                node,
                name: name.to_string(),
            })
        } else if methods.is_empty() {
            Some(ConfigError::EmptyActionVerbs {
                node,
                action: name.to_string(),
            })
        } else if self.custom_actions.contains_key(name) {
            Some(ConfigError::DuplicateName {
                node,
                name: name.to_string(),
            })
        } else {
            None
        };
        match error {
            Some(err) => self.errors.push(err),
            None => {
                let mut verbs: Vec<Method> = Vec::with_capacity(methods.len());
                for m in methods {
                    if !verbs.contains(m) {
                        verbs.push(m.clone());
                    }
                }
                self.custom_actions.insert(Arc::from(name), verbs);
            }
        }
        self
    }

    /// Mount `child` under its own name.
    #[must_use]
    pub fn mount(mut self, child: Arc<ResourceNode>) -> Self {
        let name = Arc::clone(&child.name);
        if !valid_segment(&name) {
            self.errors.push(ConfigError::InvalidName {
                node: self.node_name(),
                name: name.to_string(),
            });
        } else if self.children.contains_key(&name) || self.endpoints.contains_key(&name) {
            self.errors.push(ConfigError::DuplicateName {
                node: self.node_name(),
                name: name.to_string(),
            });
        } else {
            self.children.insert(name, child);
        }
        self
    }

    /// Install the dynamic lookup hook.
    #[must_use]
    pub fn lookup<R>(mut self, resolver: R) -> Self
    where
        R: DynamicResolver + 'static,
    {
        self.lookup = Some(Arc::new(resolver));
        self
    }

    fn default_mut(&mut self) -> &mut Endpoint {
        self.default.get_or_insert_with(|| Endpoint::new("_default"))
    }

    /// Handler for requests nothing else at this node matched; receives every
    /// remaining segment.
    #[must_use]
    pub fn default_handler(mut self, handler: HandlerDescriptor) -> Self {
        let node = self.node_name();
        if !self.default_mut().set_default(handler) {
            self.errors.push(ConfigError::DuplicateDefault {
                node,
                endpoint: "_default".to_string(),
            });
        }
        self
    }

    /// Verb-specific override of the default hook.
    #[must_use]
    pub fn default_when(mut self, method: Method, handler: HandlerDescriptor) -> Self {
        let node = self.node_name();
        if !self.default_mut().set_verb(method.clone(), handler) {
            self.errors.push(ConfigError::DuplicateVerb {
                node,
                endpoint: "_default".to_string(),
                method,
            });
        }
        self
    }

    /// Declare how many leading segments identify this resource before a child mount.
    #[must_use]
    pub fn parent_arity(mut self, arity: ParentArity) -> Self {
        self.parent_arity = Some(arity);
        self
    }

    /// Validate the declaration and freeze it.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] recorded while chaining, or found by the
    /// cross-checks (custom action handlers, parent arity).
    pub fn build(mut self) -> Result<Arc<ResourceNode>, ConfigError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }

        for (action, verbs) in &self.custom_actions {
            let endpoint = self.endpoints.get(action);
            for method in verbs {
                if endpoint.and_then(|ep| ep.handler_for(method)).is_none() {
                    return Err(ConfigError::MissingActionHandler {
                        node: self.name.clone(),
                        action: action.to_string(),
                        method: method.clone(),
                    });
                }
            }
        }

        let mut node = ResourceNode {
            name: Arc::from(self.name.as_str()),
            kind: self.kind,
            endpoints: self.endpoints,
            children: self.children,
            lookup: self.lookup,
            default: self.default,
            custom_actions: self.custom_actions,
            parent_arity: ParentArity::Fixed(0),
        };

        node.parent_arity = match (self.parent_arity, node.kind) {
            (Some(explicit), _) => explicit,
            (None, NodeKind::Controller) => ParentArity::Fixed(0),
            (None, NodeKind::Rest) => {
                let variadic = node
                    .identifying_signature()
                    .is_some_and(|sig| sig.is_variadic());
                if variadic && node.has_children() {
                    return Err(ConfigError::AmbiguousParentArity {
                        node: self.name,
                    });
                }
                ParentArity::FromGetter
            }
        };

        debug!(
            node = %node.name,
            kind = ?node.kind,
            endpoints = node.endpoints.len(),
            children = node.children.len(),
            custom_actions = node.custom_actions.len(),
            lookup = node.lookup.is_some(),
            default = node.default.is_some(),
            parent_arity = ?node.parent_arity,
            "Resource node built"
        );

        Ok(Arc::new(node))
    }
}
