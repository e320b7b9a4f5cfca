use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::Method;

use super::{Endpoint, HandlerDescriptor, ParentArity, Signature};
use crate::error::DispatchError;
use crate::ids::RequestId;

/// Handler names with a fixed meaning on REST nodes.
pub const REST_RESERVED: &[&str] = &[
    "get_one",
    "get_all",
    "get",
    "post",
    "put",
    "delete",
    "get_delete",
    "new",
    "edit",
    "index",
];

/// Dispatch style of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Object-style controller: segments name endpoints, empty remainder hits `index`.
    Controller,
    /// REST resource: verbs map onto the fixed handler-name convention.
    Rest,
}

/// Input to a dynamic lookup hook.
#[derive(Debug)]
pub struct LookupRequest<'a> {
    /// Segment to resolve
    pub segment: &'a str,
    /// Segments after `segment`
    pub remainder: &'a [String],
    /// Parent identifiers collected so far
    pub parent_args: &'a [String],
    /// Effective verb
    pub method: &'a Method,
    /// Request id for correlation
    pub request_id: RequestId,
}

/// Successful dynamic lookup: continue the walk at `node` with `remainder`.
#[derive(Debug, Clone)]
pub struct LookupMatch {
    pub node: Arc<ResourceNode>,
    pub remainder: Vec<String>,
    /// Extra identifiers threaded to the node's handlers after the inherited ones
    pub parent_args: Vec<String>,
}

impl LookupMatch {
    /// Continue at `node` with the segments after the looked-up one.
    pub fn new(node: Arc<ResourceNode>, remainder: &[String]) -> Self {
        Self {
            node,
            remainder: remainder.to_vec(),
            parent_args: Vec::new(),
        }
    }

    /// Also pass `args` to the node's handlers as parent identifiers.
    #[must_use]
    pub fn with_parent_args(mut self, args: Vec<String>) -> Self {
        self.parent_args = args;
        self
    }
}

/// Result of a dynamic lookup hook.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(LookupMatch),
    NotFound,
}

/// Request-time resolution of a path segment to a child node.
///
/// Implementations may block (for example on a data store): dispatch runs on a `may`
/// coroutine, so only the current request is suspended. Returning an error aborts the
/// walk; [`DispatchError::LookupFailure`] without a status becomes 404.
pub trait DynamicResolver: Send + Sync {
    fn lookup(&self, request: &LookupRequest<'_>) -> Result<Lookup, DispatchError>;
}

impl<F> DynamicResolver for F
where
    F: Fn(&LookupRequest<'_>) -> Result<Lookup, DispatchError> + Send + Sync,
{
    fn lookup(&self, request: &LookupRequest<'_>) -> Result<Lookup, DispatchError> {
        self(request)
    }
}

/// A node of the resource tree.
///
/// Built once through [`ResourceBuilder`](super::ResourceBuilder) and immutable
/// afterwards. Nodes returned by dynamic lookups are built per request and dropped
/// with the request's resolution context.
pub struct ResourceNode {
    pub(crate) name: Arc<str>,
    pub(crate) kind: NodeKind,
    pub(crate) endpoints: BTreeMap<Arc<str>, Endpoint>,
    pub(crate) children: BTreeMap<Arc<str>, Arc<ResourceNode>>,
    pub(crate) lookup: Option<Arc<dyn DynamicResolver>>,
    pub(crate) default: Option<Endpoint>,
    pub(crate) custom_actions: BTreeMap<Arc<str>, Vec<Method>>,
    pub(crate) parent_arity: ParentArity,
}

impl ResourceNode {
    /// Mount name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Statically mounted child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Arc<ResourceNode>> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Arc<ResourceNode>> {
        self.children.values()
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    #[must_use]
    pub fn lookup_hook(&self) -> Option<&Arc<dyn DynamicResolver>> {
        self.lookup.as_ref()
    }

    #[must_use]
    pub fn default_endpoint(&self) -> Option<&Endpoint> {
        self.default.as_ref()
    }

    /// Allowed verbs of custom action `name`, if declared.
    #[must_use]
    pub fn custom_action(&self, name: &str) -> Option<&[Method]> {
        self.custom_actions.get(name).map(Vec::as_slice)
    }

    /// Declared custom actions and their verbs, ordered by name.
    pub fn custom_actions(&self) -> impl Iterator<Item = (&str, &[Method])> {
        self.custom_actions
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_slice()))
    }

    #[must_use]
    pub fn parent_arity(&self) -> ParentArity {
        self.parent_arity
    }

    /// Signature that decides how many segments identify this node before a child
    /// mount: `get_one` if declared, else `get`.
    #[must_use]
    pub fn identifying_signature(&self) -> Option<&Signature> {
        ["get_one", "get"]
            .iter()
            .filter_map(|name| self.endpoint(name))
            .find_map(|ep| ep.handlers().next())
            .map(HandlerDescriptor::signature)
    }

    /// Indented, human-readable listing of this subtree.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, "", 0);
        out
    }

    fn describe_into(&self, out: &mut String, prefix: &str, depth: usize) {
        let pad = "  ".repeat(depth);
        let path = if self.name.is_empty() {
            format!("{prefix}/")
        } else {
            format!("{prefix}/{}", self.name)
        };
        let kind = match self.kind {
            NodeKind::Controller => "controller",
            NodeKind::Rest => "rest",
        };
        let mut flags = Vec::new();
        if self.lookup.is_some() {
            flags.push("lookup");
        }
        if self.default.is_some() {
            flags.push("default");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        out.push_str(&format!("{pad}{path} ({kind}){flags}\n"));

        for endpoint in self.endpoints.values() {
            for handler in endpoint.handlers() {
                out.push_str(&format!(
                    "{pad}  {}{} -> {}\n",
                    handler.name(),
                    handler.signature(),
                    handler.renderer()
                ));
            }
        }
        for (action, verbs) in self.custom_actions() {
            let verbs: Vec<&str> = verbs.iter().map(Method::as_str).collect();
            out.push_str(&format!("{pad}  action {action}: {}\n", verbs.join(", ")));
        }

        let prefix = path.trim_end_matches('/');
        for child in self.children.values() {
            child.describe_into(out, prefix, depth + 1);
        }
    }
}

impl fmt::Debug for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoints", &self.endpoints.keys().collect::<Vec<_>>())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("lookup", &self.lookup.is_some())
            .field("default", &self.default.is_some())
            .field("custom_actions", &self.custom_actions)
            .field("parent_arity", &self.parent_arity)
            .finish()
    }
}
