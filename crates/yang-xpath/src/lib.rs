//! A YANG-aware XPath 1.0 engine, re-exported as one crate behind
//! feature flags so a caller who only needs the compiler, or only the
//! codec, doesn't pull in the rest.
//!
//! - `syntax` (always pulled in by the others): the lexer, the three
//!   grammars, and the bytecode `Program` they compile to.
//! - `engine` (default): the `Datum` value model, the symbol table, and
//!   the stack machine that runs a compiled `Program`.
//! - `codec` (default): JSON, RFC 7951 JSON, and XML decode/encode into
//!   the `Node`-implementing `DataNode` tree the engine evaluates
//!   against.
//!
//! All three are enabled by default; disable default features and pick
//! the ones you need for a smaller dependency footprint.

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "syntax")]
#[cfg_attr(docsrs, doc(cfg(feature = "syntax")))]
pub use yang_xpath_syntax as syntax;

#[cfg(feature = "engine")]
#[cfg_attr(docsrs, doc(cfg(feature = "engine")))]
pub use yang_xpath_engine as engine;

#[cfg(feature = "codec")]
#[cfg_attr(docsrs, doc(cfg(feature = "codec")))]
pub use yang_xpath_codec as codec;

#[cfg(feature = "engine")]
pub use yang_xpath_engine::{
    new_expression_machine, new_leafref_machine, new_must_when_machine, new_path_machine, Machine,
    RunOptions,
};

#[cfg(feature = "codec")]
pub use yang_xpath_codec::{decode_json, decode_rfc7951, decode_xml, encode_json, encode_rfc7951, encode_xml, ValidateMode};

#[cfg(all(test, feature = "codec"))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use yang_xpath_codec::{LeafType, SchemaKind, SchemaNode};
    use yang_xpath_engine::{Node, QName, SymbolTable};

    #[derive(Clone)]
    struct TestSchema {
        name: QName,
        kind: SchemaKind,
        children: Vec<TestSchema>,
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
            Vec::new()
        }
        fn is_config(&self) -> bool {
            true
        }
    }

    #[test]
    fn decode_then_evaluate_against_the_decoded_tree() {
        let schema = TestSchema {
            name: QName::unqualified("system"),
            kind: SchemaKind::Container { presence: false },
            children: vec![TestSchema {
                name: QName::unqualified("hostname"),
                kind: SchemaKind::Leaf(LeafType::Other),
                children: vec![],
            }],
        };
        let json = br#"{"hostname": "router1"}"#;
        let tree = decode_json(&schema, json, ValidateMode::DontValidate).unwrap();
        let hostname = tree.raw_children().remove(0);
        assert_eq!(hostname.value(), Some("router1".to_string()));

        let symbols = SymbolTable::<yang_xpath_codec::DataNode>::with_builtins();
        let machine = new_expression_machine(".", None, None, "test:1").unwrap();
        let result = machine.run(hostname, RunOptions::default(), &symbols);
        assert_eq!(result.literal().unwrap(), "router1");
    }
}
