//! Helpers shared by the JSON and RFC 7951 decoders/encoders (spec
//! §4.10's shared structural rules; the two dialects differ only in
//! name qualification and a couple of scalar encodings).

use indexmap::IndexMap;
use serde_json::{Map, Value};
use yang_xpath_engine::QName;

use crate::data_node::DataNode;
use crate::error::CodecError;
use crate::schema::{LeafType, SchemaKind, SchemaNode};

/// Which JSON dialect is being decoded or encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// Bare JSON: local names only, no RFC 7951 scalar conventions.
    Bare,
    /// RFC 7951 JSON: module-qualified names at module boundaries, wide
    /// integers as strings, `empty` leaves as `[null]`.
    Rfc7951,
}

/// Strips a leading `module:` qualifier from a JSON member name, if
/// present. Both dialects accept a qualified name when matching schema
/// children; only RFC 7951 ever emits one.
pub(crate) fn strip_module_prefix(key: &str) -> &str {
    key.split_once(':').map(|(_, rest)| rest).unwrap_or(key)
}

/// Spec §4.10: "if a leaf's value has the form `prefix:ident` and the
/// leaf's type admits an identityref that matches `ident` in the
/// context module, the prefix is stripped". Without a schema-supplied
/// identity registry (out of scope, spec §1), this crate cannot verify
/// the match against `module`; it strips any prefix unconditionally,
/// which is correct whenever the input was produced by a conformant
/// encoder and the identity belongs to the leaf's own module.
pub(crate) fn decode_identity_value(raw: &str, _module: &str) -> String {
    raw.split_once(':').map(|(_, ident)| ident.to_string()).unwrap_or_else(|| raw.to_string())
}

/// The inverse of [`decode_identity_value`]: qualifies `value` with
/// `module` only when encoding RFC 7951 and the identity's module
/// differs from the leaf's enclosing module. Since this crate does not
/// track which module an identity was originally declared in, it
/// assumes same-module (the common case) and never re-adds a prefix;
/// cross-module identityref round-tripping needs a real identity
/// registry and is a known gap, recorded in `DESIGN.md`.
pub(crate) fn encode_identity_value(value: &str, _module: &str) -> String {
    value.to_string()
}

/// A human-readable name for a JSON value's shape, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn shape_err(path: &str, expected: &str, found: &Value) -> CodecError {
    CodecError::ShapeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: json_kind(found).to_string(),
    }
}

/// Decodes one scalar JSON value per its leaf type (spec §4.10).
pub(crate) fn scalar_to_string(value: &Value, leaf_type: &LeafType, path: &str) -> Result<String, CodecError> {
    match leaf_type {
        LeafType::Empty => match value {
            Value::Null => Ok(String::new()),
            Value::String(s) if s.is_empty() => Ok(String::new()),
            Value::Array(a) if a.len() == 1 && a[0].is_null() => Ok(String::new()),
            _ => Err(shape_err(path, "an empty value", value)),
        },
        LeafType::Identityref { module } => {
            let raw = value.as_str().ok_or_else(|| shape_err(path, "a string", value))?;
            Ok(decode_identity_value(raw, module))
        }
        LeafType::Integer { .. } => match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(shape_err(path, "a number or string", value)),
        },
        LeafType::Other => match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(shape_err(path, "a scalar", value)),
        },
    }
}

/// Encodes one scalar value per its leaf type and the active dialect
/// (spec §4.10's RFC 7951-specific wide-integer and `empty` rules).
pub(crate) fn scalar_to_value(value: &str, leaf_type: &LeafType, dialect: Dialect, module: &str) -> Value {
    match leaf_type {
        LeafType::Empty => Value::Array(vec![Value::Null]),
        LeafType::Identityref { module: declared } => Value::String(encode_identity_value(value, declared)),
        LeafType::Integer { bits } if *bits > 32 && dialect == Dialect::Rfc7951 => Value::String(value.to_string()),
        LeafType::Integer { .. } => match value.parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::String(value.to_string()),
        },
        LeafType::Other => {
            let _ = module;
            Value::String(value.to_string())
        }
    }
}

/// Decodes the root object of a JSON/RFC 7951 instance document (spec
/// §6's `decode_json`/`decode_rfc7951`).
pub(crate) fn decode_tree<S: SchemaNode>(schema_root: &S, value: &Value, dialect: Dialect) -> Result<DataNode, CodecError> {
    let object = value.as_object().ok_or_else(|| shape_err("/", "an object", value))?;
    let root = DataNode::container(schema_root.name(), true, schema_root.is_config());
    decode_children_into(schema_root, object, &root, "", dialect)?;
    Ok(root)
}

fn decode_children_into<S: SchemaNode>(
    schema: &S,
    object: &Map<String, Value>,
    parent: &DataNode,
    parent_path: &str,
    dialect: Dialect,
) -> Result<(), CodecError> {
    for (raw_key, value) in object {
        let local = strip_module_prefix(raw_key);
        let child_schema = schema
            .child(local)
            .ok_or_else(|| CodecError::UnknownElement { path: parent_path.to_string(), name: raw_key.clone() })?;
        for node in decode_member(&child_schema, value, parent_path, dialect)? {
            parent.push_child(node);
        }
    }
    Ok(())
}

fn decode_member<S: SchemaNode>(
    schema: &S,
    value: &Value,
    parent_path: &str,
    dialect: Dialect,
) -> Result<Vec<DataNode>, CodecError> {
    let path = format!("{parent_path}/{}", schema.name().local());
    match schema.kind() {
        SchemaKind::Container { presence } => {
            let object = value.as_object().ok_or_else(|| shape_err(&path, "an object", value))?;
            let node = DataNode::container(schema.name(), presence, schema.is_config());
            decode_children_into(schema, object, &node, &path, dialect)?;
            Ok(vec![node])
        }
        SchemaKind::List => {
            let array = value.as_array().ok_or_else(|| shape_err(&path, "an array", value))?;
            let mut entries = Vec::with_capacity(array.len());
            for entry_value in array {
                let object = entry_value.as_object().ok_or_else(|| shape_err(&path, "an object", entry_value))?;
                let keys = decode_keys(schema, object, &path)?;
                let entry = DataNode::list_entry(schema.name(), keys, schema.is_config());
                decode_children_into(schema, object, &entry, &path, dialect)?;
                entries.push(entry);
            }
            Ok(entries)
        }
        SchemaKind::Leaf(leaf_type) => {
            let text = scalar_to_string(value, &leaf_type, &path)?;
            Ok(vec![DataNode::leaf(schema.name(), text, schema.is_config())])
        }
        SchemaKind::LeafList(leaf_type) => {
            let array = value.as_array().ok_or_else(|| shape_err(&path, "an array", value))?;
            array
                .iter()
                .map(|v| Ok(DataNode::leaf_list_entry(schema.name(), scalar_to_string(v, &leaf_type, &path)?, schema.is_config())))
                .collect()
        }
    }
}

fn decode_keys<S: SchemaNode>(schema: &S, object: &Map<String, Value>, path: &str) -> Result<Vec<(QName, String)>, CodecError> {
    let mut keys = Vec::new();
    for key_name in schema.key_names() {
        let raw = object
            .iter()
            .find(|(k, _)| strip_module_prefix(k) == key_name)
            .map(|(_, v)| v)
            .ok_or_else(|| CodecError::MissingKey { path: path.to_string(), key: key_name.clone() })?;
        let key_schema = schema
            .child(&key_name)
            .unwrap_or_else(|| panic!("key `{key_name}` named by key_names() has no matching schema child"));
        let leaf_type = match key_schema.kind() {
            SchemaKind::Leaf(t) => t,
            _ => LeafType::Other,
        };
        keys.push((key_schema.name(), scalar_to_string(raw, &leaf_type, path)?));
    }
    Ok(keys)
}

/// Encodes a decoded tree back to JSON/RFC 7951 (spec's "Encoders are
/// the inverse and must reproduce the same element order the Data Node
/// exposes").
pub(crate) fn encode_tree<S: SchemaNode>(schema_root: &S, root: &DataNode, dialect: Dialect) -> Value {
    Value::Object(encode_children(schema_root, root, dialect, schema_root.name().namespace()))
}

fn encode_children<S: SchemaNode>(schema: &S, node: &DataNode, dialect: Dialect, current_module: &str) -> Map<String, Value> {
    let mut groups: IndexMap<String, (S, Vec<DataNode>)> = IndexMap::new();
    for child in node.raw_children() {
        let local = child.name().local().to_string();
        let child_schema = match schema.child(&local) {
            Some(s) => s,
            None => continue,
        };
        groups.entry(local).or_insert_with(|| (child_schema, Vec::new())).1.push(child);
    }

    let mut object = Map::new();
    for (local, (child_schema, members)) in groups {
        let qualified = match dialect {
            Dialect::Rfc7951 if child_schema.name().namespace() != current_module => {
                format!("{}:{}", child_schema.name().namespace(), local)
            }
            _ => local,
        };
        let value = encode_group(&child_schema, &members, dialect);
        object.insert(qualified, value);
    }
    object
}

fn encode_group<S: SchemaNode>(schema: &S, members: &[DataNode], dialect: Dialect) -> Value {
    let module = schema.name().namespace().to_string();
    match schema.kind() {
        SchemaKind::Container { .. } => members
            .first()
            .map(|node| Value::Object(encode_children(schema, node, dialect, &module)))
            .unwrap_or(Value::Object(Map::new())),
        SchemaKind::List => Value::Array(
            members
                .iter()
                .map(|node| Value::Object(encode_children(schema, node, dialect, &module)))
                .collect(),
        ),
        SchemaKind::Leaf(leaf_type) => members
            .first()
            .and_then(|node| node.value())
            .map(|v| scalar_to_value(&v, &leaf_type, dialect, &module))
            .unwrap_or(Value::Null),
        SchemaKind::LeafList(leaf_type) => Value::Array(
            members
                .iter()
                .filter_map(|node| node.value())
                .map(|v| scalar_to_value(&v, &leaf_type, dialect, &module))
                .collect(),
        ),
    }
}
