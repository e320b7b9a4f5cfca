//! # CLI Module
//!
//! Command-line entry point of the `resttree` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve a bundled resource tree:
//!
//! ```bash
//! resttree serve --sample catalog --addr 127.0.0.1:8080
//! resttree --config config/config.yaml serve
//! ```
//!
//! ### `routes`
//!
//! Print the tree with every handler, its signature, renderer and verbs:
//!
//! ```bash
//! resttree routes --sample records
//! ```
//!
//! ### `resolve`
//!
//! Show which handler a request would reach, without invoking it:
//!
//! ```bash
//! resttree resolve --method POST '/authors/1/books/2/publish'
//! resttree resolve --method POST '/records/1?_method=DELETE'
//! ```

mod commands;


pub use commands::{run, run_cli, Cli, Commands, Sample};
