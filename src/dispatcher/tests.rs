//! Walker tests: full resolution and invocation over small hand-built trees.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use http::Method;
use serde_json::json;

use super::{DispatchPhase, DispatchRequest, Dispatcher};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, HandlerError};
use crate::middleware::MetricsMiddleware;
use crate::resource::{
    handler, HandlerDescriptor, Lookup, LookupMatch, LookupRequest, ResourceBuilder,
    ResourceNode, Signature,
};

/// Handler answering with its own name and positional arguments.
fn named(name: &'static str, sig: Signature) -> HandlerDescriptor {
    handler(sig, move |call| {
        Ok(json!({ "handler": name, "args": call.args.positional() }))
    })
}

fn movies() -> Arc<ResourceNode> {
    let ratings = ResourceBuilder::rest("ratings")
        .expose("get_all", named("ratings.get_all", Signature::fixed(["movie_id"])))
        .expose(
            "get_one",
            named("ratings.get_one", Signature::fixed(["movie_id", "id"])),
        )
        .build()
        .unwrap();
    ResourceBuilder::rest("movies")
        .expose("get_all", named("get_all", Signature::none()))
        .expose("get_one", named("get_one", Signature::fixed(["id"])))
        .expose("post", named("post", Signature::none()))
        .expose("put", named("put", Signature::fixed(["id"])))
        .expose("delete", named("delete", Signature::fixed(["id"])))
        .action("rate", &[Method::POST])
        .expose("rate", named("rate", Signature::fixed(["id"])))
        .mount(ratings)
        .build()
        .unwrap()
}

fn root_with(children: Vec<Arc<ResourceNode>>) -> Arc<ResourceNode> {
    children
        .into_iter()
        .fold(
            ResourceBuilder::controller("").expose("index", named("index", Signature::none())),
            ResourceBuilder::mount,
        )
        .build()
        .unwrap()
}

fn dispatch(dispatcher: &Dispatcher, method: Method, target: &str) -> serde_json::Value {
    let resp = dispatcher.dispatch(&DispatchRequest::new(method.clone(), target));
    assert_eq!(resp.status, 200, "{method} {target}: {}", resp.body_text());
    resp.body_json().unwrap()
}

#[test]
fn test_rest_verbs_through_static_mount() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    assert_eq!(dispatch(&d, Method::GET, "/")["handler"], "index");
    assert_eq!(dispatch(&d, Method::GET, "/movies")["handler"], "get_all");
    assert_eq!(
        dispatch(&d, Method::GET, "/movies/7"),
        json!({ "handler": "get_one", "args": ["7"] })
    );
    assert_eq!(dispatch(&d, Method::POST, "/movies")["handler"], "post");
    assert_eq!(dispatch(&d, Method::PUT, "/movies/7")["handler"], "put");
    assert_eq!(dispatch(&d, Method::DELETE, "/movies/7")["handler"], "delete");
}

#[test]
fn test_parent_args_flow_into_nested_rest() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    assert_eq!(
        dispatch(&d, Method::GET, "/movies/7/ratings"),
        json!({ "handler": "ratings.get_all", "args": ["7"] })
    );
    assert_eq!(
        dispatch(&d, Method::GET, "/movies/7/ratings/3"),
        json!({ "handler": "ratings.get_one", "args": ["7", "3"] })
    );

    let resolved = d
        .resolve(&DispatchRequest::new(Method::GET, "/movies/7/ratings/3"))
        .unwrap();
    assert_eq!(resolved.args.get("movie_id"), Some("7"));
    assert_eq!(resolved.args.get("id"), Some("3"));
    assert_eq!(resolved.trail, "movies/ratings");
}

#[test]
fn test_custom_action_before_or_after_id() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    for target in ["/movies/7/rate", "/movies/rate/7"] {
        assert_eq!(
            dispatch(&d, Method::POST, target),
            json!({ "handler": "rate", "args": ["7"] })
        );
    }
}

#[test]
fn test_custom_action_wrong_verb_is_405() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/movies/7/rate"));
    assert_eq!(resp.status, 405);
    assert_eq!(resp.get_header("allow"), Some("POST"));
}

#[test]
fn test_missing_verb_is_405_with_allow() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    let resp = d.dispatch(&DispatchRequest::new(Method::DELETE, "/movies"));
    assert_eq!(resp.status, 405);
    assert_eq!(resp.get_header("allow"), Some("GET, POST"));

    match d.resolve(&DispatchRequest::new(Method::DELETE, "/movies")) {
        Err(DispatchError::MethodNotAllowed { method, allowed }) => {
            assert_eq!(method, Method::DELETE);
            assert_eq!(allowed, vec![Method::GET, Method::POST]);
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_unknown_path_is_404() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/series/1"));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body_json().unwrap()["status"], 404);

    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/movies/7/8/9"));
    assert_eq!(resp.status, 404);
}

fn shelves() -> Arc<ResourceNode> {
    let lookup = |req: &LookupRequest<'_>| -> Result<Lookup, DispatchError> {
        match req.segment {
            "fiction" => {
                let node = ResourceBuilder::rest("fiction")
                    .expose("get_one", named("shelf", Signature::fixed(["shelf"])))
                    .expose("get_all", named("shelf.all", Signature::none()))
                    .build()
                    .map_err(|e| DispatchError::lookup(req.segment, e.to_string()))?;
                Ok(Lookup::Found(
                    LookupMatch::new(node, req.remainder).with_parent_args(vec!["fiction".into()]),
                ))
            }
            "vault" => Err(DispatchError::lookup_with_status(req.segment, 403, "restricted")),
            "broken" => Err(DispatchError::lookup(req.segment, "store unavailable")),
            _ => Ok(Lookup::NotFound),
        }
    };
    ResourceBuilder::controller("shelves")
        .lookup(lookup)
        .default_handler(named("fallback", Signature::variadic(Vec::<&str>::new(), "path")))
        .build()
        .unwrap()
}

#[test]
fn test_dynamic_lookup_identifies_node() {
    let d = Dispatcher::new(root_with(vec![shelves()]));
    assert_eq!(
        dispatch(&d, Method::GET, "/shelves/fiction"),
        json!({ "handler": "shelf", "args": ["fiction"] })
    );
}

#[test]
fn test_lookup_miss_falls_back_to_default_hook() {
    let d = Dispatcher::new(root_with(vec![shelves()]));
    assert_eq!(
        dispatch(&d, Method::GET, "/shelves/poetry/old"),
        json!({ "handler": "fallback", "args": ["poetry", "old"] })
    );
    assert_eq!(
        dispatch(&d, Method::GET, "/shelves"),
        json!({ "handler": "fallback", "args": [] })
    );
}

#[test]
fn test_lookup_failure_status() {
    let d = Dispatcher::new(root_with(vec![shelves()]));
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/shelves/vault"));
    assert_eq!(resp.status, 403);
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/shelves/broken"));
    assert_eq!(resp.status, 404);
    assert!(resp.body_text().contains("store unavailable"));
}

#[test]
fn test_method_override_on_post() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    assert_eq!(
        dispatch(&d, Method::POST, "/movies/7?_method=delete")["handler"],
        "delete"
    );
    assert_eq!(dispatch(&d, Method::POST, "/movies/7?_method=PUT")["handler"], "put");
    // unknown verbs keep the literal method
    let resp = d.dispatch(&DispatchRequest::new(Method::POST, "/movies?_method=BREW"));
    assert_eq!(resp.body_json().unwrap()["handler"], "post");
    // GET is never overridden
    assert_eq!(
        dispatch(&d, Method::GET, "/movies/7?_method=DELETE")["handler"],
        "get_one"
    );
}

#[test]
fn test_custom_override_param() {
    let config = DispatchConfig {
        method_override_param: "verb".to_string(),
        ..DispatchConfig::default()
    };
    let d = Dispatcher::new(root_with(vec![movies()])).with_config(config);
    assert_eq!(dispatch(&d, Method::POST, "/movies/7?verb=PUT")["handler"], "put");
    assert_eq!(dispatch(&d, Method::POST, "/movies?_method=PUT")["handler"], "post");
}

#[test]
fn test_handler_panic_becomes_500() {
    let boom = ResourceBuilder::controller("boom")
        .expose("index", handler(Signature::none(), |_| panic!("kaboom")))
        .build()
        .unwrap();
    let d = Dispatcher::new(root_with(vec![boom]));
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/boom"));
    assert_eq!(resp.status, 500);
    assert!(resp.body_text().contains("panicked"));
}

#[test]
fn test_handler_error_status_and_renderer_failure() {
    let node = ResourceBuilder::controller("odd")
        .expose(
            "conflict",
            handler(Signature::none(), |_| {
                Err(HandlerError::Status {
                    status: 409,
                    message: "already exists".to_string(),
                })
            }),
        )
        .expose(
            "xml",
            handler(Signature::none(), |_| Ok(json!("<x/>"))).render_as("xml"),
        )
        .expose(
            "plain",
            handler(Signature::none(), |_| Ok(json!(["a", "b"]))).render_as("text"),
        )
        .build()
        .unwrap();
    let d = Dispatcher::new(root_with(vec![node]));

    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/odd/conflict"));
    assert_eq!(resp.status, 409);

    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/odd/xml"));
    assert_eq!(resp.status, 500);

    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/odd/plain"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.get_header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(resp.body_text(), "a\nb\n");
}

#[test]
fn test_max_depth_limits_descent() {
    let c = ResourceBuilder::controller("c")
        .expose("index", named("c", Signature::none()))
        .build()
        .unwrap();
    let b = ResourceBuilder::controller("b")
        .expose("index", named("b", Signature::none()))
        .mount(c)
        .build()
        .unwrap();
    let a = ResourceBuilder::controller("a").mount(b).build().unwrap();
    let config = DispatchConfig {
        max_depth: 2,
        ..DispatchConfig::default()
    };
    let d = Dispatcher::new(root_with(vec![a])).with_config(config);

    assert_eq!(dispatch(&d, Method::GET, "/a/b")["handler"], "b");
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/a/b/c"));
    assert_eq!(resp.status, 404);
}

#[test]
fn test_slow_lookup_is_cancelled() {
    let slow = ResourceBuilder::controller("slow")
        .lookup(|_: &LookupRequest<'_>| -> Result<Lookup, DispatchError> {
            thread::sleep(Duration::from_millis(30));
            Ok(Lookup::NotFound)
        })
        .build()
        .unwrap();
    let config = DispatchConfig {
        request_timeout_ms: Some(5),
        ..DispatchConfig::default()
    };
    let d = Dispatcher::new(root_with(vec![slow])).with_config(config);

    match d.resolve(&DispatchRequest::new(Method::GET, "/slow/1")) {
        Err(DispatchError::Cancelled { phase }) => assert_eq!(phase, DispatchPhase::Descending),
        other => panic!("expected cancellation, got {other:?}"),
    }
    let resp = d.dispatch(&DispatchRequest::new(Method::GET, "/slow/1"));
    assert_eq!(resp.status, 503);
}

#[test]
fn test_generic_dispatch_with_verb_override() {
    let node = ResourceBuilder::controller("form")
        .expose("index", named("show", Signature::none()))
        .when("index", Method::POST, named("submit", Signature::none()))
        .build()
        .unwrap();
    let d = Dispatcher::new(root_with(vec![node]));
    assert_eq!(dispatch(&d, Method::GET, "/form")["handler"], "show");
    assert_eq!(dispatch(&d, Method::POST, "/form")["handler"], "submit");
    assert_eq!(dispatch(&d, Method::PUT, "/form")["handler"], "show");
}

#[test]
fn test_percent_decoded_segments_reach_handlers() {
    let d = Dispatcher::new(root_with(vec![movies()]));
    assert_eq!(
        dispatch(&d, Method::GET, "/movies/Blade%20Runner"),
        json!({ "handler": "get_one", "args": ["Blade Runner"] })
    );
}

#[test]
fn test_metrics_middleware_counts_outcomes() {
    let metrics = Arc::new(MetricsMiddleware::new());
    let mut d = Dispatcher::new(root_with(vec![movies()]));
    d.add_middleware(metrics.clone());

    let _ = d.dispatch(&DispatchRequest::new(Method::GET, "/movies"));
    let _ = d.dispatch(&DispatchRequest::new(Method::GET, "/nope"));
    let _ = d.dispatch(&DispatchRequest::new(Method::DELETE, "/movies"));

    assert_eq!(metrics.request_count(), 3);
    assert_eq!(metrics.not_found_count(), 1);
    assert_eq!(metrics.method_not_allowed_count(), 1);
}
