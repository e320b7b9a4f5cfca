//! # Server Module
//!
//! HTTP front end on `may_minihttp`: parses requests into
//! [`DispatchRequest`](crate::dispatcher::DispatchRequest)s, serves `/health` and
//! `/metrics`, and writes dispatcher responses back.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{decode_body, parse_request};
pub use response::{write_handler_response, write_json_error};
pub use service::{health_response, metrics_response, AppService};
