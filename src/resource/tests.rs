use http::Method;
use serde_json::json;

use super::*;
use crate::error::ConfigError;

fn ok() -> HandlerDescriptor {
    handler(Signature::none(), |_| Ok(json!(null)))
}

fn with_id() -> HandlerDescriptor {
    handler(Signature::fixed(["id"]), |_| Ok(json!(null)))
}

#[test]
fn test_duplicate_verb_fails_at_build() {
    let err = ResourceBuilder::controller("root")
        .expose("index", ok())
        .when("index", Method::POST, ok())
        .when("index", Method::POST, ok())
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicateVerb {
            node: "root".into(),
            endpoint: "index".into(),
            method: Method::POST,
        }
    );
}

#[test]
fn test_duplicate_default_fails_at_build() {
    let err = ResourceBuilder::rest("movies")
        .expose("get_all", ok())
        .expose("get_all", ok())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateDefault { .. }));
}

#[test]
fn test_generic_endpoint_prefers_verb_override() {
    let node = ResourceBuilder::controller("root")
        .expose("index", ok())
        .when("index", Method::POST, ok())
        .build()
        .unwrap();
    let endpoint = node.endpoint("index").unwrap();
    assert_eq!(endpoint.handler_for(&Method::POST).unwrap().name(), "index[POST]");
    assert_eq!(endpoint.handler_for(&Method::GET).unwrap().name(), "index");
}

#[test]
fn test_custom_action_reserved_name_rejected() {
    for reserved in ["get_one", "post", "edit", "new", "get_delete"] {
        let err = ResourceBuilder::rest("movies")
            .action(reserved, &[Method::POST])
            .build()
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::ReservedActionName { ref action, .. } if action == reserved),
            "{reserved}: {err}"
        );
    }
}

#[test]
fn test_custom_action_requires_handler_per_verb() {
    let err = ResourceBuilder::rest("movies")
        .action("rate", &[Method::GET, Method::POST])
        .when("rate", Method::POST, ok())
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingActionHandler {
            node: "movies".into(),
            action: "rate".into(),
            method: Method::GET,
        }
    );
}

#[test]
fn test_custom_action_on_controller_rejected() {
    let err = ResourceBuilder::controller("root")
        .action("rate", &[Method::POST])
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ActionOnController { .. }));
}

#[test]
fn test_empty_action_verbs_rejected() {
    let err = ResourceBuilder::rest("movies")
        .action("rate", &[])
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyActionVerbs { .. }));
}

#[test]
fn test_mount_name_collision_rejected() {
    let child = ResourceBuilder::rest("books").build().unwrap();
    let err = ResourceBuilder::controller("root")
        .expose("books", ok())
        .mount(child)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicateName {
            node: "root".into(),
            name: "books".into(),
        }
    );
}

#[test]
fn test_invalid_endpoint_name_rejected() {
    let err = ResourceBuilder::controller("root")
        .expose("a/b", ok())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidName { .. }));
}

#[test]
fn test_variadic_getter_with_children_is_ambiguous() {
    let child = ResourceBuilder::rest("books").build().unwrap();
    let err = ResourceBuilder::rest("authors")
        .expose("get", handler(Signature::variadic(Vec::<&str>::new(), "args"), |_| Ok(json!(null))))
        .mount(child)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::AmbiguousParentArity {
            node: "authors".into()
        }
    );
}

#[test]
fn test_explicit_parent_arity_resolves_ambiguity() {
    let child = ResourceBuilder::rest("books").build().unwrap();
    let node = ResourceBuilder::rest("authors")
        .expose("get", handler(Signature::variadic(Vec::<&str>::new(), "args"), |_| Ok(json!(null))))
        .parent_arity(ParentArity::UpToChild { min: 1 })
        .mount(child)
        .build()
        .unwrap();
    assert_eq!(node.parent_arity(), ParentArity::UpToChild { min: 1 });
}

#[test]
fn test_identifying_signature_prefers_get_one() {
    let node = ResourceBuilder::rest("authors")
        .expose("get", handler(Signature::fixed(["a", "b"]), |_| Ok(json!(null))))
        .expose("get_one", with_id())
        .build()
        .unwrap();
    assert_eq!(node.identifying_signature().unwrap().arity(), 1);
    assert_eq!(node.parent_arity(), ParentArity::FromGetter);
}

#[test]
fn test_controller_parent_arity_is_zero() {
    let node = ResourceBuilder::controller("root").build().unwrap();
    assert_eq!(node.parent_arity(), ParentArity::Fixed(0));
    assert_eq!(node.kind(), NodeKind::Controller);
}

#[test]
fn test_action_verbs_deduplicated() {
    let node = ResourceBuilder::rest("movies")
        .action("rate", &[Method::POST, Method::POST])
        .expose("rate", ok())
        .build()
        .unwrap();
    assert_eq!(node.custom_action("rate"), Some(&[Method::POST][..]));
}

#[test]
fn test_describe_lists_handlers_and_actions() {
    let movies = ResourceBuilder::rest("movies")
        .expose("get_one", with_id())
        .action("rate", &[Method::POST, Method::PUT])
        .expose("rate", with_id())
        .build()
        .unwrap();
    let root = ResourceBuilder::controller("").mount(movies).build().unwrap();
    let text = root.describe();
    assert!(text.contains("/movies (rest)"), "{text}");
    assert!(text.contains("get_one(id) -> json"), "{text}");
    assert!(text.contains("action rate: POST, PUT"), "{text}");
}
