//! # Error Module
//!
//! Error taxonomy for resource-tree dispatch.
//!
//! - [`DispatchError`] - produced while walking the tree for one request. These are
//!   routing outcomes (404, 405) and never indicate a bug in the tree itself.
//! - [`ConfigError`] - produced by [`ResourceBuilder::build`](crate::resource::ResourceBuilder::build)
//!   when a tree declaration is inconsistent. Fatal at startup, never seen per request.
//! - [`HandlerError`] - returned by handler functions and renderers.

use std::fmt;

use http::Method;

use crate::dispatcher::DispatchPhase;

/// Failure of the route walk for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No static child, endpoint, dynamic lookup, default hook or verb handler matched.
    NotFound {
        /// Request path as received
        path: String,
    },
    /// The addressed resource or custom action exists, but not for this verb.
    MethodNotAllowed {
        /// Effective verb used for resolution
        method: Method,
        /// Verbs that would have matched the same address
        allowed: Vec<Method>,
    },
    /// A dynamic lookup hook failed (for example, a backing store error).
    ///
    /// Treated as 404 unless the hook supplies its own status.
    LookupFailure {
        /// Segment the hook was asked to resolve
        segment: String,
        /// Explicit status chosen by the hook
        status: Option<u16>,
        /// Human-readable failure description
        message: String,
    },
    /// The enclosing request deadline expired during the walk.
    Cancelled {
        /// Phase the walk was in when the deadline was observed
        phase: DispatchPhase,
    },
}

impl DispatchError {
    /// Build a lookup failure that maps to 404.
    pub fn lookup(segment: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::LookupFailure {
            segment: segment.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Build a lookup failure with an explicit HTTP status.
    pub fn lookup_with_status(
        segment: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        DispatchError::LookupFailure {
            segment: segment.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status the boundary aborts with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::NotFound { .. } => 404,
            DispatchError::MethodNotAllowed { .. } => 405,
            DispatchError::LookupFailure { status, .. } => status.unwrap_or(404),
            DispatchError::Cancelled { .. } => 503,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { path } => write!(f, "no resource matches '{path}'"),
            DispatchError::MethodNotAllowed { method, allowed } => {
                let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                write!(
                    f,
                    "method {method} not allowed here (allowed: {})",
                    allowed.join(", ")
                )
            }
            DispatchError::LookupFailure {
                segment, message, ..
            } => write!(f, "lookup of segment '{segment}' failed: {message}"),
            DispatchError::Cancelled { phase } => {
                write!(f, "request deadline expired while {phase}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Inconsistent resource tree declaration, detected at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two handlers registered for the same verb on one endpoint.
    DuplicateVerb {
        /// Node name
        node: String,
        /// Endpoint name
        endpoint: String,
        /// Verb registered twice
        method: Method,
    },
    /// Two default (verb-independent) handlers registered for one endpoint.
    DuplicateDefault {
        /// Node name
        node: String,
        /// Endpoint name
        endpoint: String,
    },
    /// A name is used by more than one child mount or endpoint.
    DuplicateName {
        /// Node name
        node: String,
        /// Name declared twice
        name: String,
    },
    /// Mount or endpoint name is empty or contains a path separator.
    InvalidName {
        /// Node name
        node: String,
        /// Offending name
        name: String,
    },
    /// A custom action reuses one of the reserved REST handler names.
    ReservedActionName {
        /// Node name
        node: String,
        /// Offending action name
        action: String,
    },
    /// A custom action was declared with an empty verb list.
    EmptyActionVerbs {
        /// Node name
        node: String,
        /// Action name
        action: String,
    },
    /// A custom action allows a verb for which no handler is registered.
    MissingActionHandler {
        /// Node name
        node: String,
        /// Action name
        action: String,
        /// Verb without a handler
        method: Method,
    },
    /// Custom actions are only meaningful on REST nodes.
    ActionOnController {
        /// Node name
        node: String,
        /// Action name
        action: String,
    },
    /// The node mounts children but its identifying getter is variadic and no
    /// explicit parent arity was declared.
    AmbiguousParentArity {
        /// Node name
        node: String,
    },
}

impl ConfigError {
    /// A tree that fails to build at request time is a server fault.
    #[must_use]
    pub fn status(&self) -> u16 {
        500
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateVerb {
                node,
                endpoint,
                method,
            } => write!(
                f,
                "resource '{node}': endpoint '{endpoint}' already has a handler for {method}"
            ),
            ConfigError::DuplicateDefault { node, endpoint } => write!(
                f,
                "resource '{node}': endpoint '{endpoint}' already has a default handler"
            ),
            ConfigError::DuplicateName { node, name } => {
                write!(f, "resource '{node}': name '{name}' is declared twice")
            }
            ConfigError::InvalidName { node, name } => {
                write!(f, "resource '{node}': '{name}' is not a valid path segment")
            }
            ConfigError::ReservedActionName { node, action } => write!(
                f,
                "resource '{node}': custom action '{action}' collides with a reserved REST handler name"
            ),
            ConfigError::EmptyActionVerbs { node, action } => write!(
                f,
                "resource '{node}': custom action '{action}' allows no verbs"
            ),
            ConfigError::MissingActionHandler {
                node,
                action,
                method,
            } => write!(
                f,
                "resource '{node}': custom action '{action}' allows {method} but has no handler for it"
            ),
            ConfigError::ActionOnController { node, action } => write!(
                f,
                "resource '{node}': custom action '{action}' declared on a non-REST controller"
            ),
            ConfigError::AmbiguousParentArity { node } => write!(
                f,
                "resource '{node}': variadic getter with child resources needs an explicit parent arity"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure returned by a handler function or a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The addressed record does not exist
    NotFound(String),
    /// The request carried unusable input
    BadRequest(String),
    /// Any other status the handler wants to abort with
    Status {
        /// HTTP status code
        status: u16,
        /// Human-readable message
        message: String,
    },
    /// Unexpected failure inside the handler or a collaborator
    Internal(String),
}

impl HandlerError {
    /// HTTP status the boundary aborts with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::NotFound(_) => 404,
            HandlerError::BadRequest(_) => 400,
            HandlerError::Status { status, .. } => *status,
            HandlerError::Internal(_) => 500,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::NotFound(msg) => write!(f, "not found: {msg}"),
            HandlerError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            HandlerError::Status { status, message } => write!(f, "{status}: {message}"),
            HandlerError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Internal(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Internal(err.to_string())
    }
}
