//! # resttree
//!
//! **resttree** is a coroutine-powered HTTP dispatcher that routes requests by walking a
//! tree of resources instead of matching against a flat route table.
//!
//! ## Overview
//!
//! A URL path is split into segments and consumed left to right. At every node the
//! dispatcher decides whether the next segment names a statically mounted child, an
//! endpoint of the node itself, something a dynamic lookup hook can resolve, or
//! nothing at all (the default hook). REST nodes map verbs onto a fixed handler-name
//! convention (`get_all`, `get_one`, `post`, `put`, `delete`, the `new`/`edit`/
//! `delete` display endpoints and custom actions); controller nodes address endpoints
//! by name. Identifiers consumed on the way down are bound to the handler's declared
//! [`Signature`](resource::Signature) as parent arguments.
//!
//! ## Architecture
//!
//! - **[`resource`]** - tree declaration: nodes, endpoints, signatures, hooks
//! - **[`dispatcher`]** - the walker, verb resolver and argument binder
//! - **[`render`]** - named renderers turning handler results into bodies
//! - **[`middleware`]** - pluggable request/response hooks (metrics, tracing)
//! - **[`server`]** - HTTP front end built on `may_minihttp`
//! - **[`config`]** / **[`logging`]** / **[`runtime_config`]** - ambient configuration
//! - **[`controllers`]** - bundled sample trees used by the binary and the tests
//! - **[`cli`]** - the `resttree` command line
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::AppService
//!     participant Disp as dispatcher::Dispatcher
//!     participant Node as resource::ResourceNode
//!     participant Handler
//!     participant Render as render::RendererRegistry
//!
//!     Client->>Server: POST /authors/1/books/2/publish
//!     Server->>Disp: dispatch(DispatchRequest)
//!     Disp->>Node: root: static child "authors"
//!     Disp->>Node: authors: identifier "1", static child "books"
//!     Disp->>Node: books: custom action "publish" with ["2"]
//!     Node-->>Disp: publish(author_id = 1, id = 2)
//!     Disp->>Handler: call(HandlerCall)
//!     Handler-->>Disp: serde_json::Value
//!     Disp->>Render: render("json", value)
//!     Render-->>Server: HandlerResponse 200
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use resttree::dispatcher::{DispatchRequest, Dispatcher};
//! use resttree::resource::{handler, ResourceBuilder, Signature};
//! use serde_json::json;
//!
//! let movies = ResourceBuilder::rest("movies")
//!     .expose("get_all", handler(Signature::none(), |_| Ok(json!(["Alien"]))))
//!     .expose(
//!         "get_one",
//!         handler(Signature::fixed(["id"]), |call| Ok(json!({ "id": call.arg("id") }))),
//!     )
//!     .build()
//!     .unwrap();
//! let root = ResourceBuilder::controller("").mount(movies).build().unwrap();
//!
//! let dispatcher = Dispatcher::new(root);
//! let resp = dispatcher.dispatch(&DispatchRequest::new(Method::GET, "/movies/7"));
//! assert_eq!(resp.status, 200);
//! assert_eq!(resp.body_json(), Some(json!({ "id": "7" })));
//! ```
//!
//! ## Serving
//!
//! ```bash
//! resttree serve --sample catalog --addr 127.0.0.1:8080
//! curl http://127.0.0.1:8080/authors/1/books
//! curl -X POST 'http://127.0.0.1:8080/records/1?_method=DELETE'
//! ```

pub mod cli;
pub mod config;
pub mod controllers;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod render;
pub mod resource;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{DispatchRequest, Dispatcher, HandlerResponse};
pub use error::{ConfigError, DispatchError, HandlerError};
pub use resource::{handler, ResourceBuilder, ResourceNode, Signature};
