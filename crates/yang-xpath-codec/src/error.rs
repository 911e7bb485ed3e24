//! Codec error taxonomy (spec §4.10, §7).

use thiserror::Error;

/// Errors raised while decoding or encoding a data tree.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input was not well-formed JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The input was not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An XML start tag carried a malformed attribute list.
    #[error("malformed XML attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// The input contained a name with no corresponding schema child.
    #[error("{path}: no schema node named `{name}`")]
    UnknownElement {
        /// The path of the containing node.
        path: String,
        /// The unrecognized name.
        name: String,
    },

    /// A list entry was missing one of its key leaves.
    #[error("{path}: list entry is missing key `{key}`")]
    MissingKey {
        /// The path of the list entry.
        path: String,
        /// The missing key's local name.
        key: String,
    },

    /// A leaf carried more than one value, or a container carried a value.
    #[error("{path}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// The path of the offending node.
        path: String,
        /// What the schema expected (e.g. "a single leaf value").
        expected: String,
        /// What was actually found (e.g. "an object").
        found: String,
    },

    /// An `identityref` value's prefix did not resolve to a bound
    /// `xmlns:prefix` declaration, or the resolved identity did not match
    /// the leaf's declared type.
    #[error("{path}: identityref `{value}` does not resolve to a known identity")]
    UnresolvedIdentity {
        /// The path of the leaf.
        path: String,
        /// The raw value as it appeared in the input.
        value: String,
    },

    /// Schema-driven validation rejected a decoded value (only raised
    /// when `ValidateMode` requests it; this crate performs no type
    /// validation itself beyond what decoding structurally requires).
    #[error("{path}: {reason}")]
    Validation {
        /// The path of the offending node.
        path: String,
        /// The validator's rejection reason.
        reason: String,
    },
}
