//! Library catalog: authors with nested books, shelves resolved through a dynamic
//! lookup, and a legacy controller that answers everything through its default hook.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use http::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::records::{records_resource, RecordStore};
use crate::error::{ConfigError, DispatchError, HandlerError};
use crate::resource::{
    handler, HandlerCall, Lookup, LookupMatch, LookupRequest, ResourceBuilder, ResourceNode,
    Signature,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub author_id: u64,
    pub id: u64,
    pub title: String,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shelf {
    pub name: String,
    /// `(author_id, book_id)` pairs
    pub books: Vec<(u64, u64)>,
    /// Restricted shelves exist but refuse lookups with 403
    #[serde(skip)]
    pub restricted: bool,
}

/// Catalog data shared by every handler of the sample tree.
#[derive(Debug, Default)]
pub struct Library {
    authors: RwLock<BTreeMap<u64, Author>>,
    books: RwLock<BTreeMap<(u64, u64), Book>>,
    shelves: BTreeMap<String, Shelf>,
}

impl Library {
    /// Small fixed catalog used by the sample server.
    #[must_use]
    pub fn sample() -> Self {
        let authors = [(1, "Ursula K. Le Guin"), (2, "Octavia E. Butler")]
            .into_iter()
            .map(|(id, name)| {
                (
                    id,
                    Author {
                        id,
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        let books = [
            (1, 1, "A Wizard of Earthsea", true),
            (1, 2, "The Dispossessed", true),
            (2, 1, "Kindred", true),
            (2, 2, "Parable of the Trickster", false),
        ]
        .into_iter()
        .map(|(author_id, id, title, published)| {
            (
                (author_id, id),
                Book {
                    author_id,
                    id,
                    title: title.to_string(),
                    published,
                },
            )
        })
        .collect();
        let shelves = [
            ("fiction", vec![(1, 1), (2, 1)], false),
            ("classics", vec![(1, 2)], false),
            ("archive", vec![(2, 2)], true),
        ]
        .into_iter()
        .map(|(name, books, restricted)| {
            (
                name.to_string(),
                Shelf {
                    name: name.to_string(),
                    books,
                    restricted,
                },
            )
        })
        .collect();
        Self {
            authors: RwLock::new(authors),
            books: RwLock::new(books),
            shelves,
        }
    }

    #[must_use]
    pub fn authors(&self) -> Vec<Author> {
        let authors = self.authors.read().unwrap_or_else(PoisonError::into_inner);
        authors.values().cloned().collect()
    }

    #[must_use]
    pub fn author(&self, id: u64) -> Option<Author> {
        let authors = self.authors.read().unwrap_or_else(PoisonError::into_inner);
        authors.get(&id).cloned()
    }

    pub fn add_author(&self, name: String) -> Author {
        let mut authors = self.authors.write().unwrap_or_else(PoisonError::into_inner);
        let id = authors.keys().next_back().map_or(1, |last| last + 1);
        let author = Author { id, name };
        authors.insert(id, author.clone());
        author
    }

    #[must_use]
    pub fn books_by(&self, author_id: u64) -> Vec<Book> {
        let books = self.books.read().unwrap_or_else(PoisonError::into_inner);
        books
            .range((author_id, 0)..=(author_id, u64::MAX))
            .map(|(_, b)| b.clone())
            .collect()
    }

    #[must_use]
    pub fn book(&self, author_id: u64, id: u64) -> Option<Book> {
        let books = self.books.read().unwrap_or_else(PoisonError::into_inner);
        books.get(&(author_id, id)).cloned()
    }

    pub fn add_book(&self, author_id: u64, title: String) -> Book {
        let mut books = self.books.write().unwrap_or_else(PoisonError::into_inner);
        let id = books
            .range((author_id, 0)..=(author_id, u64::MAX))
            .next_back()
            .map_or(1, |((_, last), _)| last + 1);
        let book = Book {
            author_id,
            id,
            title,
            published: false,
        };
        books.insert((author_id, id), book.clone());
        book
    }

    /// Mark a book published; `None` when it does not exist.
    pub fn publish(&self, author_id: u64, id: u64) -> Option<Book> {
        let mut books = self.books.write().unwrap_or_else(PoisonError::into_inner);
        let book = books.get_mut(&(author_id, id))?;
        book.published = true;
        Some(book.clone())
    }

    #[must_use]
    pub fn shelf(&self, name: &str) -> Option<&Shelf> {
        self.shelves.get(name)
    }

    pub fn shelves(&self) -> impl Iterator<Item = &Shelf> {
        self.shelves.values()
    }
}

fn author_of(library: &Library, call: &HandlerCall) -> Result<Author, HandlerError> {
    let id: u64 = call.parse_arg("author_id")?;
    library
        .author(id)
        .ok_or_else(|| HandlerError::NotFound(format!("author {id}")))
}

fn required_text(call: &HandlerCall, field: &str) -> Result<String, HandlerError> {
    call.field(field)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| HandlerError::BadRequest(format!("field '{field}' is required")))
}

/// `/authors/{author_id}/books`: identified by the parent author plus the book id.
fn books_resource(library: &Arc<Library>) -> Result<Arc<ResourceNode>, ConfigError> {
    let lib = Arc::clone(library);
    let get_all = handler(Signature::fixed(["author_id"]), move |call| {
        let author = author_of(&lib, call)?;
        Ok(json!(lib.books_by(author.id)))
    });

    let lib = Arc::clone(library);
    let get_one = handler(Signature::fixed(["author_id", "id"]), move |call| {
        let author = author_of(&lib, call)?;
        let id: u64 = call.parse_arg("id")?;
        lib.book(author.id, id)
            .map(|b| json!(b))
            .ok_or_else(|| HandlerError::NotFound(format!("book {}/{id}", author.id)))
    });

    let lib = Arc::clone(library);
    let post = handler(Signature::fixed(["author_id"]), move |call| {
        let author = author_of(&lib, call)?;
        let title = required_text(call, "title")?;
        Ok(json!(lib.add_book(author.id, title)))
    });

    let lib = Arc::clone(library);
    let publish = handler(Signature::fixed(["author_id", "id"]), move |call| {
        let author = author_of(&lib, call)?;
        let id: u64 = call.parse_arg("id")?;
        lib.publish(author.id, id)
            .map(|b| json!(b))
            .ok_or_else(|| HandlerError::NotFound(format!("book {}/{id}", author.id)))
    });

    ResourceBuilder::rest("books")
        .expose("get_all", get_all)
        .expose("get_one", get_one)
        .expose("post", post)
        .action("publish", &[Method::POST])
        .expose("publish", publish)
        .build()
}

fn authors_resource(library: &Arc<Library>) -> Result<Arc<ResourceNode>, ConfigError> {
    let lib = Arc::clone(library);
    let get_all = handler(Signature::none(), move |_| Ok(json!(lib.authors())));

    let lib = Arc::clone(library);
    let get_one = handler(Signature::fixed(["id"]), move |call| {
        let id: u64 = call.parse_arg("id")?;
        lib.author(id)
            .map(|a| json!(a))
            .ok_or_else(|| HandlerError::NotFound(format!("author {id}")))
    });

    let lib = Arc::clone(library);
    let post = handler(Signature::none(), move |call| {
        let name = required_text(call, "name")?;
        Ok(json!(lib.add_author(name)))
    });

    ResourceBuilder::rest("authors")
        .expose("get_all", get_all)
        .expose("get_one", get_one)
        .expose("post", post)
        .mount(books_resource(library)?)
        .build()
}

/// Per-request node for a single shelf, reached only through the shelves lookup.
fn shelf_node(library: &Arc<Library>, shelf: &Shelf) -> Result<Arc<ResourceNode>, ConfigError> {
    let summary = json!(shelf);
    let get_one = handler(Signature::none(), move |_| Ok(summary.clone()));

    let lib = Arc::clone(library);
    let pairs = shelf.books.clone();
    let books = handler(Signature::none(), move |_| {
        let titles: Vec<String> = pairs
            .iter()
            .filter_map(|(author_id, id)| lib.book(*author_id, *id))
            .map(|b| b.title)
            .collect();
        Ok(json!(titles))
    })
    .render_as("text");

    ResourceBuilder::rest(&shelf.name)
        .expose("get_one", get_one)
        .action("books", &[Method::GET])
        .expose("books", books)
        .build()
}

fn shelves_resource(library: &Arc<Library>) -> Result<Arc<ResourceNode>, ConfigError> {
    let lib = Arc::clone(library);
    let index = handler(Signature::none(), move |_| {
        let names: Vec<&str> = lib.shelves().map(|s| s.name.as_str()).collect();
        Ok(json!({ "shelves": names }))
    });

    let lib = Arc::clone(library);
    let lookup = move |req: &LookupRequest<'_>| -> Result<Lookup, DispatchError> {
        let Some(shelf) = lib.shelf(req.segment) else {
            return Ok(Lookup::NotFound);
        };
        if shelf.restricted {
            return Err(DispatchError::lookup_with_status(
                req.segment,
                403,
                "shelf is restricted",
            ));
        }
        debug!(request_id = %req.request_id, shelf = %shelf.name, "Shelf resolved");
        let node = shelf_node(&lib, shelf).map_err(|err| {
            DispatchError::lookup_with_status(req.segment, err.status(), err.to_string())
        })?;
        Ok(Lookup::Found(LookupMatch::new(node, req.remainder)))
    };

    ResourceBuilder::controller("shelves")
        .expose("index", index)
        .lookup(lookup)
        .build()
}

/// Controller for retired URLs: everything falls through to the default hook.
fn legacy_resource() -> Result<Arc<ResourceNode>, ConfigError> {
    let moved = handler(Signature::variadic(Vec::<&str>::new(), "path"), |call| {
        let rest = call.args.rest.join("/");
        Ok(json!({ "moved": format!("/{rest}"), "method": call.method.as_str() }))
    });
    let gone = handler(Signature::variadic(Vec::<&str>::new(), "path"), |_| {
        Err(HandlerError::Status {
            status: 410,
            message: "legacy resources cannot be deleted".to_string(),
        })
    });
    ResourceBuilder::controller("legacy")
        .default_handler(moved)
        .default_when(Method::DELETE, gone)
        .build()
}

/// Root controller of the catalog sample.
///
/// ```text
/// /                                  index (GET, POST echoes the body)
/// /echo/{words..}                    echo
/// /authors[/{id}]                    REST
/// /authors/{author_id}/books[/{id}]  REST, POST .../{id}/publish
/// /records/...                       REST with display endpoints
/// /shelves, /shelves/{name}[/books]  lookup
/// /legacy/...                        default hook
/// ```
///
/// # Errors
///
/// Propagates the [`ConfigError`] of any inconsistent sub-tree.
pub fn catalog_tree(
    library: Arc<Library>,
    records: Arc<RecordStore>,
) -> Result<Arc<ResourceNode>, ConfigError> {
    let index = handler(Signature::none(), |_| {
        Ok(json!({
            "service": "resttree",
            "resources": ["authors", "legacy", "records", "shelves"],
        }))
    });
    let received = handler(Signature::none(), |call| {
        Ok(json!({ "received": call.body.clone().unwrap_or(Value::Null) }))
    });
    let echo = handler(Signature::variadic(Vec::<&str>::new(), "words"), |call| {
        Ok(json!({ "words": call.args.rest }))
    });

    ResourceBuilder::controller("")
        .expose("index", index)
        .when("index", Method::POST, received)
        .expose("echo", echo)
        .mount(authors_resource(&library)?)
        .mount(records_resource("records", records)?)
        .mount(shelves_resource(&library)?)
        .mount(legacy_resource()?)
        .build()
}
