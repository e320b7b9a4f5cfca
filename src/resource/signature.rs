use std::fmt;
use std::sync::Arc;

/// Declared positional parameters of a handler.
///
/// Replaces signature introspection: every handler states up front how many path
/// segments it takes and what they are called. Parent identifiers threaded down from
/// enclosing REST resources count towards the arity, so a nested
/// `get_one(author_id, id)` is declared as `Signature::fixed(["author_id", "id"])`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    params: Vec<Arc<str>>,
    rest: Option<Arc<str>>,
}

impl Signature {
    /// A handler taking no positional arguments.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A handler taking exactly the named arguments.
    pub fn fixed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            params: names.into_iter().map(|n| Arc::from(n.as_ref())).collect(),
            rest: None,
        }
    }

    /// A handler taking the named leading arguments plus any number of trailing ones,
    /// collected under `rest`.
    pub fn variadic<I, S>(names: I, rest: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            params: names.into_iter().map(|n| Arc::from(n.as_ref())).collect(),
            rest: Some(Arc::from(rest)),
        }
    }

    /// Number of named (fixed) parameters.
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.rest.is_some()
    }

    /// Whether `count` positional arguments satisfy this signature.
    #[inline]
    #[must_use]
    pub fn accepts(&self, count: usize) -> bool {
        if self.is_variadic() {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }

    #[must_use]
    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        if let Some(rest) = &self.rest {
            parts.push(format!("*{rest}"));
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// How many leading segments at a REST node identify the parent resource before a
/// child mount name may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentArity {
    /// Taken from the `get_one` (else `get`) signature, minus the identifiers the
    /// node itself inherited from its own parents.
    FromGetter,
    /// Exactly this many local identifier segments.
    Fixed(usize),
    /// Everything up to the first child mount name at or after index `min`.
    UpToChild {
        /// Minimum number of identifier segments
        min: usize,
    },
}
