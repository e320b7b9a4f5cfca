use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::Method;

use super::ParamVec;
use crate::error::DispatchError;
use crate::resource::{LookupMatch, ResourceNode};

/// Phase of a single request's walk through the tree.
///
/// `Descending -> VerbResolving -> ArgBinding -> Invoking`, with `Descending` re-entered
/// after every static child or dynamic lookup hop. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Descending,
    VerbResolving,
    ArgBinding,
    Invoking,
    Failed,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchPhase::Descending => "descending the resource tree",
            DispatchPhase::VerbResolving => "resolving the verb",
            DispatchPhase::ArgBinding => "binding arguments",
            DispatchPhase::Invoking => "invoking the handler",
            DispatchPhase::Failed => "failing",
        };
        f.write_str(s)
    }
}

/// Per-request walk state. Created by the dispatcher and dropped when resolution ends.
#[derive(Debug)]
pub struct ResolutionContext {
    /// Node the walk is currently at
    pub node: Arc<ResourceNode>,
    /// Unconsumed path segments
    pub remaining: Vec<String>,
    /// Identifiers collected from enclosing REST resources
    pub parent_args: Vec<String>,
    /// Effective verb
    pub method: Method,
    /// Whether a dynamic lookup produced the current node
    pub identified: bool,
    /// Number of hops taken from the root
    pub depth: usize,
    pub phase: DispatchPhase,
    /// Mount names of the nodes visited, root first
    pub trail: Vec<Arc<str>>,
    deadline: Option<Instant>,
}

impl ResolutionContext {
    #[must_use]
    pub fn new(
        root: Arc<ResourceNode>,
        segments: Vec<String>,
        method: Method,
        deadline: Option<Instant>,
    ) -> Self {
        let trail = vec![Arc::clone(&root.name)];
        Self {
            node: root,
            remaining: segments,
            parent_args: Vec::new(),
            method,
            identified: false,
            depth: 0,
            phase: DispatchPhase::Descending,
            trail,
            deadline,
        }
    }

    /// Move to `phase`, failing with [`DispatchError::Cancelled`] if the deadline passed.
    pub fn enter(&mut self, phase: DispatchPhase) -> Result<(), DispatchError> {
        self.check_deadline()?;
        self.phase = phase;
        Ok(())
    }

    /// Fail with [`DispatchError::Cancelled`] if the deadline passed.
    pub fn check_deadline(&mut self) -> Result<(), DispatchError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                let phase = self.phase;
                self.phase = DispatchPhase::Failed;
                Err(DispatchError::Cancelled { phase })
            }
            _ => Ok(()),
        }
    }

    /// Descend into a static child whose mount name sits at `index`.
    ///
    /// Segments before `index` become parent identifiers of the child.
    pub fn descend_static(&mut self, child: Arc<ResourceNode>, index: usize) {
        self.parent_args.extend(self.remaining.drain(..index));
        self.remaining.drain(..1);
        self.trail.push(Arc::clone(&child.name));
        self.node = child;
        self.identified = false;
        self.depth += 1;
    }

    /// Continue at the node a dynamic lookup returned.
    pub fn descend_lookup(&mut self, found: LookupMatch) {
        self.trail.push(Arc::clone(&found.node.name));
        self.node = found.node;
        self.remaining = found.remainder;
        self.parent_args.extend(found.parent_args);
        self.identified = true;
        self.depth += 1;
    }

    /// Mark the walk failed and hand back `err`.
    pub fn fail(&mut self, err: DispatchError) -> DispatchError {
        self.phase = DispatchPhase::Failed;
        err
    }

    /// Slash-joined mount names below the root, e.g. `authors/books`.
    #[must_use]
    pub fn trail_string(&self) -> String {
        let names: Vec<&str> = self
            .trail
            .iter()
            .map(AsRef::as_ref)
            .filter(|name: &&str| !name.is_empty())
            .collect();
        names.join("/")
    }
}

/// Verb used for resolution: the literal verb, or for POST the value of the
/// override parameter (`_method` by default) when it names a valid verb.
///
/// The override value is matched case-insensitively.
#[must_use]
pub fn effective_method(method: &Method, query: &ParamVec, override_param: &str) -> Method {
    if *method != Method::POST || override_param.is_empty() {
        return method.clone();
    }
    query
        .iter()
        .rfind(|(k, _)| k.as_ref() == override_param)
        .and_then(|(_, v)| override_verb(v))
        .unwrap_or_else(|| method.clone())
}

fn override_verb(value: &str) -> Option<Method> {
    const OVERRIDABLE: [Method; 7] = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::HEAD,
        Method::OPTIONS,
    ];
    let value = value.trim();
    OVERRIDABLE
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(value))
}

/// Parse a raw query string (without the leading `?`) into decoded pairs.
#[must_use]
pub fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// Split a request path into percent-decoded segments.
///
/// Any query string is ignored and empty segments (doubled or trailing slashes) are
/// dropped. A segment that does not decode to UTF-8 is kept verbatim.
#[must_use]
pub fn split_path(path: &str) -> Vec<String> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect()
}
