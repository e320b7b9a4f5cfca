//! Sample resource trees served by the `resttree` binary and used by the
//! integration tests.

mod library;
mod records;

use std::sync::Arc;

pub use library::{catalog_tree, Author, Book, Library, Shelf};
pub use records::{records_resource, Record, RecordStore};

use crate::error::ConfigError;
use crate::resource::ResourceNode;

/// REST root serving two seeded records (`foo` and `bar`).
///
/// # Errors
///
/// Propagates the builder's [`ConfigError`].
pub fn records_tree() -> Result<Arc<ResourceNode>, ConfigError> {
    records_resource("", Arc::new(RecordStore::seeded(["foo", "bar"])))
}

/// Catalog tree over the sample library and a seeded record store.
///
/// # Errors
///
/// Propagates the builder's [`ConfigError`].
pub fn sample_catalog() -> Result<Arc<ResourceNode>, ConfigError> {
    catalog_tree(
        Arc::new(Library::sample()),
        Arc::new(RecordStore::seeded(["foo", "bar"])),
    )
}
