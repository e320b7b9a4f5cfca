//! # Resource Module
//!
//! Declaration surface of the routing table: a tree of [`ResourceNode`]s built once at
//! startup with [`ResourceBuilder`] and shared immutably by every request.
//!
//! ## Node anatomy
//!
//! - **Endpoints** - named handlers. On a [`NodeKind::Rest`] node the names follow the REST
//!   convention (`get_one`, `get_all`, `get`, `post`, `put`, `delete`, `get_delete`, `new`,
//!   `edit`) plus custom actions. On a [`NodeKind::Controller`] node the name is the path
//!   segment that addresses the endpoint, and `index` serves the empty remainder.
//! - **Generic dispatch** - an endpoint has an optional verb-independent handler and
//!   per-verb overrides registered with [`ResourceBuilder::when`]. Two handlers for one
//!   verb are rejected by [`ResourceBuilder::build`].
//! - **Children** - statically mounted nodes addressed by their name.
//! - **Dynamic lookup** - a [`DynamicResolver`] that turns an arbitrary segment into a
//!   child node at request time (for example a record fetched by id).
//! - **Default hook** - catches whatever nothing else matched.
//! - **Custom actions** - action name to allowed verbs.
//!
//! Handler arity is declared with a [`Signature`] rather than discovered, so the binder
//! knows exactly how many segments each handler and each parent identifier consumes.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use resttree::resource::{handler, ResourceBuilder, Signature};
//! use serde_json::json;
//!
//! let root = ResourceBuilder::controller("")
//!     .expose("index", handler(Signature::none(), |_| Ok(json!("home"))))
//!     .when("index", Method::POST, handler(Signature::none(), |_| Ok(json!("posted"))))
//!     .build()
//!     .unwrap();
//! assert_eq!(root.endpoint("index").unwrap().verbs(), vec![Method::POST]);
//! ```

mod builder;
mod handler;
mod node;
mod signature;
#[cfg(test)]
mod tests;

pub use builder::ResourceBuilder;
pub use handler::{handler, Endpoint, HandlerCall, HandlerDescriptor, HandlerFn, DEFAULT_RENDERER};
pub use node::{
    DynamicResolver, Lookup, LookupMatch, LookupRequest, NodeKind, ResourceNode, REST_RESERVED,
};
pub use signature::{ParentArity, Signature};
