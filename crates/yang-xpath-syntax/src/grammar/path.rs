//! The bare location-path grammar: an absolute or relative path of steps,
//! with no predicates and no general expressions. Used for plain `path`
//! schema references that carry no `current()`-relative key predicates.

use super::{empty_guard, new_restricted_lexer, Parser};
use crate::error::{CompileError, ParseError};
use crate::instruction::{Axis, NodeTest, Program};
use crate::lexer::PrefixResolver;
use crate::token::TokenKind;

/// Compiles a bare location path (no predicates) such as a YANG `path`
/// substatement with no key expressions.
pub fn compile_path(
    source: &str,
    prefixes: Option<&dyn PrefixResolver>,
) -> Result<Program, CompileError> {
    empty_guard(source)?;
    let lexer = new_restricted_lexer(source, prefixes);
    let parser = Parser::new(lexer);
    parser.finish(source, |p| p.parse_location_path())
}

impl<'a> Parser<'a> {
    pub(super) fn parse_location_path(&mut self) -> Result<(), ParseError> {
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

        if absolute && self.at(TokenKind::Eof) {
            // A bare "/" selects the document root with no further steps.
            self.builder.end_path(true)?;
            return Ok(());
        }

        if pending_descendant_or_self {
            self.builder
                .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
        }

        self.parse_bare_step()?;

        loop {
            if self.at(TokenKind::DblSlash) {
                self.bump();
                self.builder
                    .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
                self.parse_bare_step()?;
            } else if self.at(TokenKind::Punct(b'/')) {
                self.bump();
                self.parse_bare_step()?;
            } else {
                break;
            }
        }

        self.builder.end_path(absolute)?;
        Ok(())
    }

    fn parse_bare_step(&mut self) -> Result<(), ParseError> {
        if self.at(TokenKind::DotDot) {
            self.bump();
            self.builder.add_step(Axis::Parent, NodeTest::AnyNode, Vec::new());
            return Ok(());
        }
        if self.at(TokenKind::Punct(b'.')) {
            self.bump();
            self.builder.add_step(Axis::SelfAxis, NodeTest::AnyNode, Vec::new());
            return Ok(());
        }

        let axis = self.parse_axis()?;
        let test = self.parse_node_test()?;
        self.builder.add_step(axis, test, Vec::new());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_compiles() {
        let program = compile_path("/if:interfaces/if:interface", None).unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn double_slash_inserts_descendant_or_self() {
        let program = compile_path("//name", None).unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn parent_step_is_accepted() {
        let program = compile_path("../name", None).unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn predicate_is_rejected_in_bare_path_grammar() {
        let err = compile_path("/a[b]", None).unwrap_err();
        assert!(err.parse_error.is_some());
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = compile_path("", None).unwrap_err();
        assert_eq!(err, CompileError::empty_input());
    }
}
