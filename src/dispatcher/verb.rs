//! Verb resolver: picks the handler at the current node for the effective verb and
//! the remaining segments.

use http::Method;

use super::binder::{bind_exact, BoundArgs};
use crate::resource::{Endpoint, HandlerDescriptor, NodeKind, ResourceNode};

/// Verbs probed when computing the `Allow` list of a 405.
const PROBED_VERBS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Outcome of resolving at one node.
#[derive(Debug)]
pub enum LocalMatch<'n> {
    /// A handler accepts the verb and binds every remaining segment.
    Matched {
        handler: &'n HandlerDescriptor,
        args: BoundArgs,
    },
    /// The address exists here for other verbs only.
    ///
    /// `strict` outcomes (custom action verb mismatch) end the walk immediately;
    /// others are reported only if the lookup and default hooks also miss.
    NotAllowed { allowed: Vec<Method>, strict: bool },
    NoMatch,
}

/// Walk state needed to resolve at a node.
#[derive(Debug, Clone, Copy)]
pub struct LocalInput<'a> {
    pub method: &'a Method,
    pub parent_args: &'a [String],
    pub remaining: &'a [String],
    /// Whether a dynamic lookup produced the node
    pub identified: bool,
}

/// Resolve the node's own handlers (not children, lookup or default hook).
#[must_use]
pub fn resolve_local<'n>(node: &'n ResourceNode, input: LocalInput<'_>) -> LocalMatch<'n> {
    match node.kind() {
        NodeKind::Controller => resolve_controller(node, input),
        NodeKind::Rest => resolve_rest(node, input),
    }
}

/// Resolve the node's default hook, which receives every remaining segment.
#[must_use]
pub fn resolve_default<'n>(node: &'n ResourceNode, input: LocalInput<'_>) -> LocalMatch<'n> {
    let Some(endpoint) = node.default_endpoint() else {
        return LocalMatch::NoMatch;
    };
    match_endpoint(endpoint, input.method, input.parent_args, input.remaining)
}

/// Try `endpoint` for `method` with `local` as the handler's own segments.
fn try_endpoint<'n>(
    endpoint: &'n Endpoint,
    method: &Method,
    parent_args: &[String],
    local: &[String],
) -> Option<LocalMatch<'n>> {
    let handler = endpoint.handler_for(method)?;
    let args = bind_exact(handler.signature(), parent_args, local)?;
    Some(LocalMatch::Matched { handler, args })
}

/// Like [`try_endpoint`] but reporting a verb mismatch as non-strict `NotAllowed`.
fn match_endpoint<'n>(
    endpoint: &'n Endpoint,
    method: &Method,
    parent_args: &[String],
    local: &[String],
) -> LocalMatch<'n> {
    if endpoint.handler_for(method).is_none() {
        let allowed: Vec<Method> = endpoint
            .verbs()
            .into_iter()
            .filter(|m| {
                endpoint
                    .handler_for(m)
                    .is_some_and(|h| bind_exact(h.signature(), parent_args, local).is_some())
            })
            .collect();
        return if allowed.is_empty() {
            LocalMatch::NoMatch
        } else {
            LocalMatch::NotAllowed {
                allowed,
                strict: false,
            }
        };
    }
    try_endpoint(endpoint, method, parent_args, local).unwrap_or(LocalMatch::NoMatch)
}

fn resolve_controller<'n>(node: &'n ResourceNode, input: LocalInput<'_>) -> LocalMatch<'n> {
    let (endpoint, local) = match input.remaining.split_first() {
        None => (node.endpoint("index"), input.remaining),
        Some((first, rest)) => (node.endpoint(first), rest),
    };
    match endpoint {
        Some(endpoint) => match_endpoint(endpoint, input.method, input.parent_args, local),
        None => LocalMatch::NoMatch,
    }
}

/// Name of the custom action addressed by `remaining` and the segments around it.
///
/// The first remaining segment is tried before the last one, so `/movies/rate/7`
/// and `/movies/7/rate` both reach action `rate` with local segments `["7"]`.
fn custom_action_target<'r>(
    node: &ResourceNode,
    remaining: &'r [String],
) -> Option<(&'r str, &'r [String])> {
    if let Some((first, rest)) = remaining.split_first() {
        if node.custom_action(first).is_some() {
            return Some((first.as_str(), rest));
        }
    }
    if let Some((last, init)) = remaining.split_last() {
        if !init.is_empty() && node.custom_action(last).is_some() {
            return Some((last.as_str(), init));
        }
    }
    None
}

fn resolve_rest<'n>(node: &'n ResourceNode, input: LocalInput<'_>) -> LocalMatch<'n> {
    if let Some((action, local)) = custom_action_target(node, input.remaining) {
        let allowed = node.custom_action(action).unwrap_or_default();
        if !allowed.contains(input.method) {
            return LocalMatch::NotAllowed {
                allowed: allowed.to_vec(),
                strict: true,
            };
        }
        return node
            .endpoint(action)
            .and_then(|ep| try_endpoint(ep, input.method, input.parent_args, local))
            .unwrap_or(LocalMatch::NoMatch);
    }

    if let Some(found) = rest_table(node, input) {
        return found;
    }

    let allowed: Vec<Method> = PROBED_VERBS
        .iter()
        .filter(|m| *m != input.method)
        .filter(|m| rest_table(node, LocalInput { method: *m, ..input }).is_some())
        .cloned()
        .collect();
    if allowed.is_empty() {
        LocalMatch::NoMatch
    } else {
        LocalMatch::NotAllowed {
            allowed,
            strict: false,
        }
    }
}

/// Display suffix endpoint addressed by a trailing segment on GET.
fn display_suffix(segment: &str) -> Option<&'static str> {
    match segment {
        "new" => Some("new"),
        "edit" => Some("edit"),
        "delete" => Some("get_delete"),
        _ => None,
    }
}

/// REST handler names tried, in order, for `method`.
fn rest_candidates(method: &Method, remainder_empty: bool, identified: bool) -> &'static [&'static str] {
    if *method == Method::GET {
        match (remainder_empty, identified) {
            (true, true) => &["get_one", "get", "get_all"],
            (true, false) => &["get_all", "get", "index"],
            (false, _) => &["get_one", "get"],
        }
    } else if *method == Method::POST {
        &["post"]
    } else if *method == Method::PUT {
        &["put"]
    } else if *method == Method::DELETE {
        &["delete"]
    } else {
        &[]
    }
}

/// The REST verb table plus display suffixes.
fn rest_table<'n>(node: &'n ResourceNode, input: LocalInput<'_>) -> Option<LocalMatch<'n>> {
    let remaining = input.remaining;
    if *input.method == Method::GET {
        if let Some((last, init)) = remaining.split_last() {
            if let Some(name) = display_suffix(last) {
                let hit = node
                    .endpoint(name)
                    .and_then(|ep| try_endpoint(ep, input.method, input.parent_args, init));
                if hit.is_some() {
                    return hit;
                }
            }
        }
    }

    rest_candidates(input.method, remaining.is_empty(), input.identified)
        .iter()
        .filter_map(|name| node.endpoint(name))
        .find_map(|ep| try_endpoint(ep, input.method, input.parent_args, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{handler, ResourceBuilder, Signature};
    use serde_json::json;
    use std::sync::Arc;

    fn h(sig: Signature) -> HandlerDescriptor {
        handler(sig, |_| Ok(json!(null)))
    }

    fn movies() -> Arc<ResourceNode> {
        ResourceBuilder::rest("movies")
            .expose("get_all", h(Signature::none()))
            .expose("get_one", h(Signature::fixed(["id"])))
            .expose("post", h(Signature::none()))
            .expose("edit", h(Signature::fixed(["id"])))
            .expose("get_delete", h(Signature::fixed(["id"])))
            .action("rate", &[Method::POST])
            .expose("rate", h(Signature::fixed(["id"])))
            .build()
            .unwrap()
    }

    fn segs(s: &[&str]) -> Vec<String> {
        s.iter().map(|x| x.to_string()).collect()
    }

    fn resolve<'n>(node: &'n ResourceNode, method: &Method, remaining: &[String]) -> LocalMatch<'n> {
        resolve_local(
            node,
            LocalInput {
                method,
                parent_args: &[],
                remaining,
                identified: false,
            },
        )
    }

    fn matched_name(m: &LocalMatch<'_>) -> Option<String> {
        match m {
            LocalMatch::Matched { handler, .. } => Some(handler.name().to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_rest_verb_table() {
        let node = movies();
        assert_eq!(matched_name(&resolve(&node, &Method::GET, &[])).as_deref(), Some("get_all"));
        assert_eq!(
            matched_name(&resolve(&node, &Method::GET, &segs(&["7"]))).as_deref(),
            Some("get_one")
        );
        assert_eq!(matched_name(&resolve(&node, &Method::POST, &[])).as_deref(), Some("post"));
    }

    #[test]
    fn test_display_suffixes() {
        let node = movies();
        assert_eq!(
            matched_name(&resolve(&node, &Method::GET, &segs(&["7", "edit"]))).as_deref(),
            Some("edit")
        );
        assert_eq!(
            matched_name(&resolve(&node, &Method::GET, &segs(&["7", "delete"]))).as_deref(),
            Some("get_delete")
        );
    }

    #[test]
    fn test_custom_action_first_or_last_segment() {
        let node = movies();
        for path in [["rate", "7"], ["7", "rate"]] {
            match resolve(&node, &Method::POST, &segs(&path)) {
                LocalMatch::Matched { handler, args } => {
                    assert_eq!(handler.name(), "rate");
                    assert_eq!(args.get("id"), Some("7"));
                }
                other => panic!("expected match for {path:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_custom_action_wrong_verb_is_strict() {
        let node = movies();
        match resolve(&node, &Method::GET, &segs(&["7", "rate"])) {
            LocalMatch::NotAllowed { allowed, strict } => {
                assert_eq!(allowed, vec![Method::POST]);
                assert!(strict);
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_rest_missing_verb_lists_allowed() {
        let node = movies();
        match resolve(&node, &Method::DELETE, &[]) {
            LocalMatch::NotAllowed { allowed, strict } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
                assert!(!strict);
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_identified_node_prefers_get_one() {
        let node = ResourceBuilder::rest("movie")
            .expose("get_all", h(Signature::none()))
            .expose("get_one", h(Signature::none()))
            .build()
            .unwrap();
        let m = resolve_local(
            &node,
            LocalInput {
                method: &Method::GET,
                parent_args: &[],
                remaining: &[],
                identified: true,
            },
        );
        assert_eq!(matched_name(&m).as_deref(), Some("get_one"));
    }

    #[test]
    fn test_controller_endpoints() {
        let node = ResourceBuilder::controller("")
            .expose("index", h(Signature::none()))
            .when("about", Method::GET, h(Signature::none()))
            .expose("echo", h(Signature::variadic(Vec::<&str>::new(), "words")))
            .build()
            .unwrap();
        assert_eq!(matched_name(&resolve(&node, &Method::GET, &[])).as_deref(), Some("index"));
        assert_eq!(
            matched_name(&resolve(&node, &Method::PUT, &segs(&["echo", "a", "b"]))).as_deref(),
            Some("echo")
        );
        match resolve(&node, &Method::POST, &segs(&["about"])) {
            LocalMatch::NotAllowed { allowed, strict } => {
                assert_eq!(allowed, vec![Method::GET]);
                assert!(!strict);
            }
            other => panic!("expected 405, got {other:?}"),
        }
        assert!(matches!(
            resolve(&node, &Method::GET, &segs(&["missing"])),
            LocalMatch::NoMatch
        ));
    }

    #[test]
    fn test_surplus_segments_do_not_match() {
        let node = movies();
        assert!(matches!(
            resolve(&node, &Method::GET, &segs(&["7", "8"])),
            LocalMatch::NoMatch
        ));
    }
}
