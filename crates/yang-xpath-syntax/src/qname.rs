//! Qualified names, per spec §3.

use std::fmt;

/// The local name used to express the global wildcard (`*`).
pub const WILDCARD: &str = "*";

/// A (namespace, local name) pair, as produced by the lexer for name
/// tests and by schema/data node lookups.
///
/// An empty namespace indicates the name is unqualified (no `prefix:`
/// was present, or the prefix could not be resolved because no resolver
/// was configured). The wildcard `*` has an empty namespace and local
/// name `*`; `prefix:*` has the resolved namespace and local name `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// The resolved namespace URI, or empty if unqualified.
    namespace: String,
    /// The local name, or `*` for a wildcard.
    local: String,
}

impl QName {
    /// Creates a qualified name from an explicit namespace and local part.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Creates an unqualified name.
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self::new(String::new(), local)
    }

    /// Creates the global wildcard `*`.
    pub fn wildcard() -> Self {
        Self::new(String::new(), WILDCARD)
    }

    /// Creates a `prefix:*` wildcard already resolved to `namespace`.
    pub fn namespaced_wildcard(namespace: impl Into<String>) -> Self {
        Self::new(namespace, WILDCARD)
    }

    /// Gets the namespace, empty if unqualified.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Gets the local name.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Determines if this is the global wildcard (empty namespace, `*` local).
    pub fn is_global_wildcard(&self) -> bool {
        self.namespace.is_empty() && self.local == WILDCARD
    }

    /// Determines if the local part is a wildcard (`*`, with any namespace).
    pub fn is_local_wildcard(&self) -> bool {
        self.local == WILDCARD
    }

    /// Determines if this name is namespace-qualified.
    pub fn is_qualified(&self) -> bool {
        !self.namespace.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}
