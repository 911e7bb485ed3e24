//! Bare JSON decode/encode: local names only, no RFC 7951-specific
//! scalar conventions (spec §4.10, §6's `decode_json`/`encode_json`).

use crate::data_node::DataNode;
use crate::error::CodecError;
use crate::schema::SchemaNode;
use crate::support::{self, Dialect};
use crate::ValidateMode;

/// Decodes a bare JSON instance document against `schema_root`.
///
/// `validate_mode` is accepted for API parity with spec §6; this crate
/// performs no schema-type validation itself (validators are
/// schema-driven and external to this spec), so every mode currently
/// behaves the same.
#[tracing::instrument(level = "debug", skip(schema_root, bytes, _validate_mode))]
pub fn decode_json<S: SchemaNode>(schema_root: &S, bytes: &[u8], _validate_mode: ValidateMode) -> Result<DataNode, CodecError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    support::decode_tree(schema_root, &value, Dialect::Bare)
}

/// Encodes a decoded tree back to bare JSON.
#[tracing::instrument(level = "debug", skip(schema_root, data))]
pub fn encode_json<S: SchemaNode>(schema_root: &S, data: &DataNode) -> Result<Vec<u8>, CodecError> {
    let value = support::encode_tree(schema_root, data, Dialect::Bare);
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

    fn interfaces_schema() -> TestSchema {
        TestSchema {
            name: QName::new("ietf-interfaces", "interfaces"),
            kind: SchemaKind::Container { presence: false },
            keys: vec![],
            children: vec![TestSchema {
                name: QName::new("ietf-interfaces", "interface"),
                kind: SchemaKind::List,
                keys: vec!["name".to_string()],
                children: vec![
                    TestSchema {
                        name: QName::new("ietf-interfaces", "name"),
                        kind: SchemaKind::Leaf(LeafType::Other),
                        keys: vec![],
                        children: vec![],
                    },
                    TestSchema {
                        name: QName::new("ietf-interfaces", "enabled"),
                        kind: SchemaKind::Leaf(LeafType::Other),
                        keys: vec![],
                        children: vec![],
                    },
                ],
            }],
        }
    }

    #[test]
    fn decodes_a_list_into_keyed_entries() {
        let schema = interfaces_schema();
        let json = br#"{"interface": [{"name": "eth0", "enabled": "true"}]}"#;
        let tree = decode_json(&schema, json, ValidateMode::DontValidate).unwrap();
        let entry = tree.raw_children().remove(0);
        assert_eq!(entry.list_keys(), vec![(QName::new("ietf-interfaces", "name"), "eth0".to_string())]);
    }

    #[test]
    fn round_trips_through_encode() {
        let schema = interfaces_schema();
        let json = br#"{"interface": [{"name": "eth0", "enabled": "true"}]}"#;
        let tree = decode_json(&schema, json, ValidateMode::DontValidate).unwrap();
        let encoded = encode_json(&schema, &tree).unwrap();
        let reparsed: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(reparsed["interface"][0]["name"], "eth0");
    }
}
