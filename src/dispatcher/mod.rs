//! # Dispatcher Module
//!
//! Resolves one request against the resource tree and invokes the chosen handler.
//!
//! ## Request Flow
//!
//! 1. The effective verb is computed: POST with a `_method` query parameter naming a
//!    valid verb resolves as that verb ([`effective_method`]).
//! 2. The path is split into percent-decoded segments ([`split_path`]).
//! 3. Starting at the root, each step tries, in order:
//!    - a statically mounted child, after the node's own identifier segments
//!      (which become parent arguments of the child);
//!    - the node's own handlers (REST verb table, custom actions, display suffixes,
//!      or controller endpoints);
//!    - the dynamic lookup hook on the first remaining segment;
//!    - the default hook with every remaining segment.
//! 4. The handler is bound to `parent_args ++ local segments` and invoked; its result
//!    goes through the named renderer.
//!
//! ## Error Handling
//!
//! - Nothing matched: 404
//! - The address exists for other verbs only: 405 with an `Allow` header
//! - A failing lookup hook: 404 unless it carries its own status
//! - Request timeout during the walk: 503
//! - Handler panics and renderer failures: 500
//!
//! All per-request state lives in a [`ResolutionContext`]; the tree is never mutated
//! while serving.

mod binder;
mod context;
mod core;
#[cfg(test)]
mod tests;
mod verb;

pub use binder::{bind_args, bind_exact, child_mount_index, Binding, BoundArgs, ParamVec, MAX_INLINE_PARAMS};
pub use context::{effective_method, parse_query, split_path, DispatchPhase, ResolutionContext};
pub use core::{
    DispatchRequest, Dispatcher, HandlerResponse, HeaderVec, ResolvedHandler, MAX_INLINE_HEADERS,
};
pub use verb::{resolve_default, resolve_local, LocalInput, LocalMatch};
