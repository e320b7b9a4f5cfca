//! Parameter binder: maps path segments onto declared handler signatures and decides
//! which leading segments at a REST node are parent identifiers.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::resource::{ParentArity, ResourceNode, Signature};

/// Maximum number of named parameters before heap allocation.
/// Nested REST paths rarely carry more than four identifiers.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Names come from the static tree (`Arc<str>`, O(1) clone); values are per request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Positional arguments bound to a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    /// Named parameters in declaration order
    pub named: ParamVec,
    /// Trailing segments collected by a variadic signature
    pub rest: Vec<String>,
}

impl BoundArgs {
    /// Get a named argument.
    ///
    /// "Last write wins" if a signature repeats a name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// All arguments in call order.
    #[must_use]
    pub fn positional(&self) -> Vec<&str> {
        self.named
            .iter()
            .map(|(_, v)| v.as_str())
            .chain(self.rest.iter().map(String::as_str))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.named.len() + self.rest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of binding: the arguments plus whatever the signature did not consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<'a> {
    pub args: BoundArgs,
    pub remaining: &'a [String],
}

/// Bind `parent_args` followed by leading `available` segments to `signature`.
///
/// A fixed signature consumes exactly as many local segments as it has parameters
/// left after the parent identifiers; a variadic one consumes everything. Returns
/// `None` when there are too few segments, or more parent identifiers than a fixed
/// signature declares.
#[must_use]
pub fn bind_args<'a>(
    signature: &Signature,
    parent_args: &[String],
    available: &'a [String],
) -> Option<Binding<'a>> {
    let consumed = if signature.is_variadic() {
        available.len()
    } else {
        signature.arity().checked_sub(parent_args.len())?
    };
    if consumed > available.len() || !signature.accepts(parent_args.len() + consumed) {
        return None;
    }

    let mut values = parent_args.iter().chain(available[..consumed].iter());
    let mut named = ParamVec::new();
    for name in signature.params() {
        named.push((Arc::clone(name), values.next()?.clone()));
    }
    let rest = values.cloned().collect();

    Some(Binding {
        args: BoundArgs { named, rest },
        remaining: &available[consumed..],
    })
}

/// Bind and require every segment to be consumed.
#[must_use]
pub fn bind_exact(
    signature: &Signature,
    parent_args: &[String],
    local: &[String],
) -> Option<BoundArgs> {
    bind_args(signature, parent_args, local)
        .filter(|b| b.remaining.is_empty())
        .map(|b| b.args)
}

/// Index in `remaining` of the child mount name the walk should descend into, if any.
///
/// Segments before that index are the node's own identifiers and become parent
/// arguments of the child. `inherited` is the number of parent identifiers the node
/// itself already received, which a [`ParentArity::FromGetter`] signature includes.
#[must_use]
pub fn child_mount_index(node: &ResourceNode, inherited: usize, remaining: &[String]) -> Option<usize> {
    if !node.has_children() {
        return None;
    }
    let is_child = |i: usize| remaining.get(i).is_some_and(|s| node.child(s).is_some());
    match node.parent_arity() {
        ParentArity::Fixed(n) => is_child(n).then_some(n),
        ParentArity::FromGetter => {
            let n = node
                .identifying_signature()
                .map_or(0, |sig| sig.arity().saturating_sub(inherited));
            is_child(n).then_some(n)
        }
        ParentArity::UpToChild { min } => (min..remaining.len()).find(|&i| is_child(i)),
    }
}
