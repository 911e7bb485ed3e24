//! XML decode/encode. Unlike the JSON dialects, XML carries no
//! intrinsic multiplicity marker, so the decoder leans on the schema to
//! tell a container from a list or a leaf from a leaf-list; each
//! occurrence of a repeated element simply becomes another sibling,
//! which is already how the engine's `Node` trait represents list
//! entries and leaf-list values (spec §4.10).

use std::collections::HashMap;
use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::data_node::DataNode;
use crate::error::CodecError;
use crate::schema::{LeafType, SchemaKind, SchemaNode};
use crate::ValidateMode;

/// A namespace scope: `xmlns:prefix="uri"` bindings visible at a given
/// depth, inherited from ancestors and extended by the current element.
type NsScope = HashMap<String, String>;

struct Frame<S> {
    schema: S,
    node: DataNode,
    keys_expected: Vec<String>,
    keys_found: Vec<(yang_xpath_engine::QName, String)>,
    text: String,
}

/// Decodes an XML instance document against `schema_root` (spec §6's
/// `decode_xml`).
#[tracing::instrument(level = "debug", skip(schema_root, bytes, _validate_mode))]
pub fn decode_xml<S: SchemaNode>(schema_root: &S, bytes: &[u8], _validate_mode: ValidateMode) -> Result<DataNode, CodecError> {
    let mut reader = Reader::from_reader(Cursor::new(bytes));
    let mut buf = Vec::new();
    let mut ns_stack: Vec<NsScope> = vec![NsScope::new()];
    let mut stack: Vec<Frame<S>> = Vec::new();
    let mut root: Option<DataNode> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(start) => {
                let scope = extend_scope(&start, ns_stack.last().unwrap())?;
                push_frame(schema_root, &start, &mut stack)?;
                ns_stack.push(scope);
            }
            Event::Empty(start) => {
                let scope = extend_scope(&start, ns_stack.last().unwrap())?;
                push_frame(schema_root, &start, &mut stack)?;
                let frame = stack.pop().expect("just pushed");
                attach(finish_frame(frame, &scope)?, &mut stack, &mut root);
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape()?);
                }
            }
            Event::End(_) => {
                let scope = ns_stack.pop().unwrap_or_default();
                let frame = stack.pop().expect("unmatched closing tag");
                attach(finish_frame(frame, &scope)?, &mut stack, &mut root);
            }
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| CodecError::ShapeMismatch {
        path: "/".to_string(),
        expected: "a root element".to_string(),
        found: "an empty document".to_string(),
    })
}

fn push_frame<S: SchemaNode>(schema_root: &S, start: &BytesStart, stack: &mut Vec<Frame<S>>) -> Result<(), CodecError> {
    let local = local_name(start);
    let child_schema = match stack.last() {
        None => schema_root.clone(),
        Some(parent) => parent
            .schema
            .child(&local)
            .ok_or_else(|| CodecError::UnknownElement { path: parent.node.path(), name: local.clone() })?,
    };
    let keys_expected = child_schema.key_names();
    let node = match child_schema.kind() {
        SchemaKind::Container { presence } => DataNode::container(child_schema.name(), presence, child_schema.is_config()),
        SchemaKind::List => DataNode::list_entry(child_schema.name(), Vec::new(), child_schema.is_config()),
        SchemaKind::Leaf(_) => DataNode::leaf(child_schema.name(), String::new(), child_schema.is_config()),
        SchemaKind::LeafList(_) => DataNode::leaf_list_entry(child_schema.name(), String::new(), child_schema.is_config()),
    };
    stack.push(Frame {
        schema: child_schema,
        node,
        keys_expected,
        keys_found: Vec::new(),
        text: String::new(),
    });
    Ok(())
}

fn finish_frame<S: SchemaNode>(frame: Frame<S>, scope: &NsScope) -> Result<DataNode, CodecError> {
    match frame.schema.kind() {
        SchemaKind::Leaf(leaf_type) => {
            let value = decode_xml_scalar(frame.text.trim(), &leaf_type, scope);
            Ok(DataNode::leaf(frame.schema.name(), value, frame.schema.is_config()))
        }
        SchemaKind::LeafList(leaf_type) => {
            let value = decode_xml_scalar(frame.text.trim(), &leaf_type, scope);
            Ok(DataNode::leaf_list_entry(frame.schema.name(), value, frame.schema.is_config()))
        }
        SchemaKind::List => {
            frame.node.set_keys(frame.keys_found);
            Ok(frame.node)
        }
        SchemaKind::Container { .. } => Ok(frame.node),
    }
}

fn attach<S>(finished: DataNode, stack: &mut [Frame<S>], root: &mut Option<DataNode>) {
    match stack.last_mut() {
        Some(parent) => {
            if parent.keys_expected.iter().any(|k| k.as_str() == finished.name().local()) {
                parent.keys_found.push((finished.name(), finished.value().unwrap_or_default()));
            }
            parent.node.push_child(finished);
        }
        None => *root = Some(finished),
    }
}

fn local_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().local_name().as_ref()).into_owned()
}

fn extend_scope(start: &BytesStart, parent: &NsScope) -> Result<NsScope, CodecError> {
    let mut scope = parent.clone();
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        let prefix = if key == b"xmlns" {
            Some(String::new())
        } else if let Some(rest) = key.strip_prefix(b"xmlns:") {
            Some(String::from_utf8_lossy(rest).into_owned())
        } else {
            None
        };
        if let Some(prefix) = prefix {
            scope.insert(prefix, attr.unescape_value()?.into_owned());
        }
    }
    Ok(scope)
}

/// Spec §4.10: "identityref values carrying a prefix bound to an
/// `xmlns:prefix` attribute are canonicalized to their schema-form
/// value if the declared identity matches". As with the JSON decoders,
/// there is no identity registry to check the match against, so any
/// XML-namespace-bound prefix is accepted and stripped.
fn decode_xml_scalar(text: &str, leaf_type: &LeafType, scope: &NsScope) -> String {
    match leaf_type {
        LeafType::Empty => String::new(),
        LeafType::Identityref { .. } => match text.split_once(':') {
            Some((prefix, ident)) if scope.contains_key(prefix) => ident.to_string(),
            _ => text.to_string(),
        },
        LeafType::Integer { .. } | LeafType::Other => text.to_string(),
    }
}

/// Encodes a decoded tree back to XML.
#[tracing::instrument(level = "debug", skip(schema_root, data))]
pub fn encode_xml<S: SchemaNode>(schema_root: &S, data: &DataNode) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_node(&mut writer, schema_root, data)?;
    Ok(writer.into_inner())
}

fn write_node<S: SchemaNode, W: std::io::Write>(writer: &mut Writer<W>, schema: &S, node: &DataNode) -> Result<(), CodecError> {
    let local = schema.name().local().to_string();
    match schema.kind() {
        SchemaKind::Leaf(leaf_type) | SchemaKind::LeafList(leaf_type) => {
            let value = node.value().unwrap_or_default();
            if matches!(leaf_type, LeafType::Empty) && value.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new(local)))?;
            } else {
                writer.write_event(Event::Start(BytesStart::new(local.clone())))?;
                writer.write_event(Event::Text(BytesText::new(&value)))?;
                writer.write_event(Event::End(BytesEnd::new(local)))?;
            }
        }
        SchemaKind::Container { .. } | SchemaKind::List => {
            writer.write_event(Event::Start(BytesStart::new(local.clone())))?;
            for child in node.raw_children() {
                if let Some(child_schema) = schema.child(child.name().local()) {
                    write_node(writer, &child_schema, &child)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(local)))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use yang_xpath_engine::{Node, QName};

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
            name: QName::unqualified("interfaces"),
            kind: SchemaKind::Container { presence: false },
            keys: vec![],
            children: vec![TestSchema {
                name: QName::unqualified("interface"),
                kind: SchemaKind::List,
                keys: vec!["name".to_string()],
                children: vec![
                    TestSchema {
                        name: QName::unqualified("name"),
                        kind: SchemaKind::Leaf(LeafType::Other),
                        keys: vec![],
                        children: vec![],
                    },
                    TestSchema {
                        name: QName::unqualified("enabled"),
                        kind: SchemaKind::Leaf(LeafType::Other),
                        keys: vec![],
                        children: vec![],
                    },
                ],
            }],
        }
    }

    #[test]
    fn repeated_elements_coalesce_into_a_keyed_entry() {
        let schema = interfaces_schema();
        let xml = br#"<interfaces><interface><name>eth0</name><enabled>true</enabled></interface></interfaces>"#;
        let tree = decode_xml(&schema, xml, ValidateMode::DontValidate).unwrap();
        let entry = tree.raw_children().remove(0);
        assert_eq!(entry.list_keys(), vec![(QName::unqualified("name"), "eth0".to_string())]);
    }

    #[test]
    fn encode_reproduces_element_order() {
        let schema = interfaces_schema();
        let xml = br#"<interfaces><interface><name>eth0</name><enabled>true</enabled></interface></interfaces>"#;
        let tree = decode_xml(&schema, xml, ValidateMode::DontValidate).unwrap();
        let encoded = encode_xml(&schema, &tree).unwrap();
        let text = String::from_utf8(encoded).unwrap();
        assert!(text.find("<name>").unwrap() < text.find("<enabled>").unwrap());
    }
}
