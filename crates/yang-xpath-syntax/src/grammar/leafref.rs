//! The leafref path grammar: a location path whose steps may carry
//! key predicates of the form `name = current() (/ '..' | / step)*`,
//! matching a YANG `path` substatement's `path-arg` production.

use super::{empty_guard, new_restricted_lexer, Parser};
use crate::error::{CompileError, ParseError};
use crate::instruction::{Axis, NodeTest, Program};
use crate::lexer::PrefixResolver;
use crate::token::TokenKind;

/// Compiles a leafref path, including any `current()`-relative key
/// predicates attached to its steps.
pub fn compile_leafref(
    source: &str,
    prefixes: Option<&dyn PrefixResolver>,
) -> Result<Program, CompileError> {
    empty_guard(source)?;
    let lexer = new_restricted_lexer(source, prefixes);
    let parser = Parser::new(lexer);
    parser.finish(source, |p| p.parse_leafref_path())
}

impl<'a> Parser<'a> {
    fn parse_leafref_path(&mut self) -> Result<(), ParseError> {
        self.builder.begin_path();

        let mut absolute = false;
        let mut pending_descendant_or_self = false;
        if self.at(TokenKind::Punct(b'/')) {
            absolute = true;
            self.bump();
        } else if self.at(TokenKind::DblSlash) {
            absolute = true;
            pending_descendant_or_self = true;
            self.bump();
        }

        if pending_descendant_or_self {
            self.builder
                .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
        }

        self.parse_leafref_step()?;

        loop {
            if self.at(TokenKind::DblSlash) {
                self.bump();
                self.builder
                    .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
                self.parse_leafref_step()?;
            } else if self.at(TokenKind::Punct(b'/')) {
                self.bump();
                self.parse_leafref_step()?;
            } else {
                break;
            }
        }

        self.builder.end_path(absolute)?;
        Ok(())
    }

    fn parse_leafref_step(&mut self) -> Result<(), ParseError> {
        if self.at(TokenKind::DotDot) {
            self.bump();
            self.builder.add_step(Axis::Parent, NodeTest::AnyNode, Vec::new());
            return Ok(());
        }

        let axis = self.parse_axis()?;
        let test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.at(TokenKind::Punct(b'[')) {
            predicates.push(self.parse_key_predicate()?);
        }

        self.builder.add_step(axis, test, predicates);
        Ok(())
    }

    /// `"[" node-identifier *wsp "=" *wsp path-key-expr *wsp "]"`
    ///
    /// Compiles directly to `KeyPredicate` rather than a generic
    /// nodeset-equality comparison: per spec §4.5 the right-hand side
    /// must reduce to exactly one leaf, which `KeyPredicate` enforces at
    /// runtime (raising `EvalError::PathResolution` otherwise), matching
    /// the candidate against that single leaf's value via
    /// `Node::list_key_matches` (spec §4.9) instead of fetching the
    /// candidate's own key child as a second nodeset.
    fn parse_key_predicate(&mut self) -> Result<Program, ParseError> {
        self.expect(TokenKind::Punct(b'['))?;
        self.builder.begin_predicate();

        let test = self.parse_node_test()?;
        let key = match test {
            NodeTest::Name(key) => key,
            _ => return Err(self.unexpected()),
        };

        self.expect(TokenKind::Eq)?;

        self.parse_path_key_expr()?;
        self.builder.key_predicate(key);

        self.expect(TokenKind::Punct(b']'))?;
        self.builder.end_predicate()
    }

    /// `current-function-invocation *wsp "/" rel-path-keyexpr` or a
    /// bare string literal, as a pragmatic extension beyond the strict
    /// YANG grammar.
    fn parse_path_key_expr(&mut self) -> Result<(), ParseError> {
        if self.at(TokenKind::Literal) {
            let text = self
                .current
                .literal()
                .map(str::to_string)
                .expect("Literal token always carries text");
            self.bump();
            self.builder.push_literal(text);
            return Ok(());
        }

        if self.at(TokenKind::Func) {
            let name = self
                .current
                .symbol()
                .map(str::to_string)
                .expect("Func token always carries a symbol payload");
            if name != "current" {
                return Err(self.unexpected());
            }
            self.bump();
            self.expect(TokenKind::Punct(b'('))?;
            self.expect(TokenKind::Punct(b')'))?;
            self.builder.call("current", 0);

            let mut trailing = false;
            while self.at(TokenKind::Punct(b'/')) {
                self.bump();
                if !trailing {
                    self.builder.begin_path();
                    trailing = true;
                }
                if self.at(TokenKind::DotDot) {
                    self.bump();
                    self.builder.add_step(Axis::Parent, NodeTest::AnyNode, Vec::new());
                } else {
                    let test = self.parse_node_test()?;
                    self.builder.add_step(Axis::Child, test, Vec::new());
                }
            }
            if trailing {
                self.builder.end_path(false)?;
                self.builder.filter_expr_end();
            }
            return Ok(());
        }

        Err(self.unexpected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leafref_without_predicate_compiles() {
        let program = compile_leafref("/if:interfaces/if:interface/if:name", None).unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn leafref_with_current_predicate_compiles() {
        let program = compile_leafref(
            "/if:interfaces/if:interface[if:name = current()/../if:name]/if:name",
            None,
        )
        .unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn leafref_with_literal_predicate_compiles() {
        let program =
            compile_leafref("/if:interfaces/if:interface[if:type = 'ethernetCsmacd']/if:name", None)
                .unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn numbers_are_rejected_in_leafref_grammar() {
        let err = compile_leafref("/a[b = 1]", None).unwrap_err();
        assert!(err.lex_error.is_some());
    }
}
