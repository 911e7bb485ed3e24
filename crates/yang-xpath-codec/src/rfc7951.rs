//! RFC 7951 JSON decode/encode: module-qualified names at module
//! boundaries, wide integers as strings, `empty` leaves as `[null]`
//! (spec §4.10, §6's `decode_rfc7951`/`encode_rfc7951`).

use crate::data_node::DataNode;
use crate::error::CodecError;
use crate::schema::SchemaNode;
use crate::support::{self, Dialect};
use crate::ValidateMode;

/// Decodes an RFC 7951 instance document against `schema_root`.
#[tracing::instrument(level = "debug", skip(schema_root, bytes, _validate_mode))]
pub fn decode_rfc7951<S: SchemaNode>(schema_root: &S, bytes: &[u8], _validate_mode: ValidateMode) -> Result<DataNode, CodecError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    support::decode_tree(schema_root, &value, Dialect::Rfc7951)
}

/// Encodes a decoded tree back to RFC 7951 JSON.
#[tracing::instrument(level = "debug", skip(schema_root, data))]
pub fn encode_rfc7951<S: SchemaNode>(schema_root: &S, data: &DataNode) -> Result<Vec<u8>, CodecError> {
    let value = support::encode_tree(schema_root, data, Dialect::Rfc7951);
    Ok(serde_json::to_vec_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaKind};
    use pretty_assertions::assert_eq;
    use yang_xpath_engine::QName;

    #[derive(Clone)]
    struct TestSchema {
        name: QName,
        kind: SchemaKind,
        children: Vec<TestSchema>,
        keys: Vec<String>,
    }

    impl SchemaNode for TestSchema {
        fn name(&self) -> QName {
            self.name.clone()
        }
        fn kind(&self) -> SchemaKind {
            self.kind.clone()
        }
        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }
        fn key_names(&self) -> Vec<String> {
            self.keys.clone()
        }
        fn is_config(&self) -> bool {
            true
        }
    }

    fn leaf(module: &str, name: &str, leaf_type: LeafType) -> TestSchema {
        TestSchema {
            name: QName::new(module, name),
            kind: SchemaKind::Leaf(leaf_type),
            keys: vec![],
            children: vec![],
        }
    }

    fn root_schema() -> TestSchema {
        TestSchema {
            name: QName::new("acme-system", "system"),
            kind: SchemaKind::Container { presence: false },
            keys: vec![],
            children: vec![
                leaf("acme-system", "hostname", LeafType::Other),
                // a leaf pulled in from a different (augmenting) module: must
                // be qualified in RFC 7951 even though the parent isn't.
                leaf("acme-clock", "timezone", LeafType::Other),
                leaf("acme-system", "max-sessions", LeafType::Integer { bits: 64 }),
            ],
        }
    }

    #[test]
    fn cross_module_leaves_are_qualified_on_decode_and_encode() {
        let schema = root_schema();
        let json = br#"{"hostname": "router1", "acme-clock:timezone": "UTC", "max-sessions": "4294967296"}"#;
        let tree = decode_rfc7951(&schema, json, ValidateMode::DontValidate).unwrap();
        let children = tree.raw_children();
        assert!(children.iter().any(|c| c.value().as_deref() == Some("UTC")));

        let encoded = encode_rfc7951(&schema, &tree).unwrap();
        let reparsed: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(reparsed["acme-clock:timezone"], "UTC");
        assert_eq!(reparsed["hostname"], "router1");
    }

    #[test]
    fn wide_integers_round_trip_as_strings() {
        let schema = root_schema();
        let json = br#"{"hostname": "r1", "acme-clock:timezone": "UTC", "max-sessions": "4294967296"}"#;
        let tree = decode_rfc7951(&schema, json, ValidateMode::DontValidate).unwrap();
        let encoded = encode_rfc7951(&schema, &tree).unwrap();
        let reparsed: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(reparsed["max-sessions"], "4294967296");
        assert!(reparsed["max-sessions"].is_string());
    }
}
