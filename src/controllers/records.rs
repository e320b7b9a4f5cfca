//! In-memory record collection exposed as a REST resource, including the display
//! endpoints (`new`, `edit`, `get_delete`) and a plain-text export action.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ConfigError, HandlerError};
use crate::resource::{handler, HandlerCall, ResourceBuilder, ResourceNode, Signature};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub name: String,
}

/// Thread-safe record storage with sequential ids.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<BTreeMap<u64, Record>>,
    next_id: AtomicU64,
}

impl RecordStore {
    /// Store holding `names` under ids `0..`.
    pub fn seeded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        for name in names {
            store.insert(name.into());
        }
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u64, Record>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u64, Record>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Record> {
        self.read().values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<Record> {
        self.read().get(&id).cloned()
    }

    pub fn insert(&self, name: String) -> Record {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Record { id, name };
        self.write().insert(id, record.clone());
        record
    }

    pub fn update(&self, id: u64, name: String) -> Option<Record> {
        let mut records = self.write();
        let record = records.get_mut(&id)?;
        record.name = name;
        Some(record.clone())
    }

    pub fn remove(&self, id: u64) -> Option<Record> {
        self.write().remove(&id)
    }
}

/// Parse the `id` argument; anything that is not a known id is a missing record.
fn record_id(call: &HandlerCall) -> Result<u64, HandlerError> {
    call.arg("id")
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| HandlerError::NotFound(format!("record {}", call.arg("id").unwrap_or(""))))
}

fn existing(store: &RecordStore, call: &HandlerCall) -> Result<Record, HandlerError> {
    let id = record_id(call)?;
    store
        .get(id)
        .ok_or_else(|| HandlerError::NotFound(format!("record {id}")))
}

fn name_field(call: &HandlerCall) -> Result<String, HandlerError> {
    call.field("name")
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| HandlerError::BadRequest("field 'name' is required".to_string()))
}

/// REST resource over `store` mounted under `name`.
///
/// | Request                 | Handler      |
/// |-------------------------|--------------|
/// | `GET /`                 | `get_all`    |
/// | `GET /{id}`             | `get_one`    |
/// | `POST /`                | `post`       |
/// | `PUT /{id}`             | `put`        |
/// | `DELETE /{id}`          | `delete`     |
/// | `GET /new`              | `new`        |
/// | `GET /{id}/edit`        | `edit`       |
/// | `GET /{id}/delete`      | `get_delete` |
/// | `GET /export`           | `export`     |
///
/// # Errors
///
/// Never fails for a valid `name`; returns the builder's [`ConfigError`] otherwise.
pub fn records_resource(
    name: &str,
    store: Arc<RecordStore>,
) -> Result<Arc<ResourceNode>, ConfigError> {
    let id = || Signature::fixed(["id"]);

    let s = Arc::clone(&store);
    let get_all = handler(Signature::none(), move |_| Ok(json!(s.list())));

    let s = Arc::clone(&store);
    let get_one = handler(id(), move |call| Ok(json!(existing(&s, call)?)));

    let s = Arc::clone(&store);
    let post = handler(Signature::none(), move |call| {
        let record = s.insert(name_field(call)?);
        Ok(json!(record))
    });

    let s = Arc::clone(&store);
    let put = handler(id(), move |call| {
        let id = record_id(call)?;
        let name = name_field(call)?;
        s.update(id, name)
            .map(|r| json!(r))
            .ok_or_else(|| HandlerError::NotFound(format!("record {id}")))
    });

    let s = Arc::clone(&store);
    let delete = handler(id(), move |call| {
        let id = record_id(call)?;
        s.remove(id)
            .map(|r| json!({ "deleted": r }))
            .ok_or_else(|| HandlerError::NotFound(format!("record {id}")))
    });

    let new = handler(Signature::none(), |_| {
        Ok(json!({ "form": "new", "fields": ["name"] }))
    });

    let s = Arc::clone(&store);
    let edit = handler(id(), move |call| {
        Ok(json!({ "form": "edit", "fields": ["name"], "record": existing(&s, call)? }))
    });

    let s = Arc::clone(&store);
    let get_delete = handler(id(), move |call| {
        Ok(json!({ "confirm": "delete", "record": existing(&s, call)? }))
    });

    let s = Arc::clone(&store);
    let export = handler(Signature::none(), move |_| {
        let lines: Vec<String> = s
            .list()
            .into_iter()
            .map(|r| format!("{}\t{}", r.id, r.name))
            .collect();
        Ok(json!(lines))
    })
    .render_as("text");

    ResourceBuilder::rest(name)
        .expose("get_all", get_all)
        .expose("get_one", get_one)
        .expose("post", post)
        .expose("put", put)
        .expose("delete", delete)
        .expose("new", new)
        .expose("edit", edit)
        .expose("get_delete", get_delete)
        .action("export", &[Method::GET])
        .expose("export", export)
        .build()
}
