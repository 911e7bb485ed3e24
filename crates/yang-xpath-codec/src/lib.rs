//! Schema-guided JSON, RFC 7951 JSON, and XML codec for the data-node
//! tree the YANG XPath evaluator runs against (spec §4.10, §6).
//!
//! `DataNode` implements [`yang_xpath_engine::Node`] directly: a tree
//! decoded by this crate can be fed straight into `Machine::run` with
//! no adapter type, keeping faith with the engine's "shares the
//! data-tree abstraction" design.
//!
//! The schema tree itself is supplied by the caller through the
//! [`SchemaNode`] trait; loading a YANG schema is out of scope here.

mod data_node;
mod error;
mod json;
mod rfc7951;
mod schema;
mod support;
mod xml;

pub use data_node::DataNode;
pub use error::CodecError;
pub use json::{decode_json, encode_json};
pub use rfc7951::{decode_rfc7951, encode_rfc7951};
pub use schema::{LeafType, SchemaKind, SchemaNode};
pub use xml::{decode_xml, encode_xml};

/// Controls how strictly a decoder validates decoded values against the
/// schema beyond the structural checks decoding itself requires (spec
/// §6). Validators proper are schema-driven and external to this crate;
/// all three modes currently decode identically, and the option is
/// carried for API parity with callers that plug in their own
/// schema-type validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateMode {
    /// Validate every decoded value against its schema type.
    ValidateAll,
    /// Perform no type validation at all.
    DontValidate,
    /// Validate where the schema expresses a preference, skip otherwise.
    ValidatePreference,
}
