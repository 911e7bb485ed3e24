//! The full XPath 1.0 expression grammar (spec §4.1's "full expression"
//! variant), used for `must`/`when` statements.

use super::{empty_guard, new_lexer, Parser};
use crate::error::{CompileError, ParseError};
use crate::instruction::{Axis, BinaryOp, NodeTest, Program};
use crate::lexer::{FunctionLookup, PrefixResolver};
use crate::token::TokenKind;

/// Compiles a full XPath 1.0 expression.
pub fn compile_expression(
    source: &str,
    functions: Option<&dyn FunctionLookup>,
    prefixes: Option<&dyn PrefixResolver>,
) -> Result<Program, CompileError> {
    empty_guard(source)?;
    let lexer = new_lexer(source, functions, prefixes);
    let parser = Parser::with_functions(lexer, functions);
    parser.finish(source, |p| p.parse_or_expr())
}

/// Tokens that may begin a [`LocationPath`], as opposed to a
/// [`FilterExpr`]'s [`PrimaryExpr`].
fn starts_location_path(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Punct(b'/')
            | TokenKind::DblSlash
            | TokenKind::DotDot
            | TokenKind::Punct(b'.')
            | TokenKind::Punct(b'@')
            | TokenKind::AxisName
            | TokenKind::NameTest
            | TokenKind::NodeType
    )
}

impl<'a> Parser<'a> {
    fn parse_or_expr(&mut self) -> Result<(), ParseError> {
        self.parse_and_expr()?;
        while self.at(TokenKind::Or) {
            self.bump();
            self.parse_and_expr()?;
            self.builder.binary(BinaryOp::Or);
        }
        Ok(())
    }

    fn parse_and_expr(&mut self) -> Result<(), ParseError> {
        self.parse_equality_expr()?;
        while self.at(TokenKind::And) {
            self.bump();
            self.parse_equality_expr()?;
            self.builder.binary(BinaryOp::And);
        }
        Ok(())
    }

    fn parse_equality_expr(&mut self) -> Result<(), ParseError> {
        self.parse_relational_expr()?;
        loop {
            let op = match self.kind() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            self.parse_relational_expr()?;
            self.builder.binary(op);
        }
        Ok(())
    }

    fn parse_relational_expr(&mut self) -> Result<(), ParseError> {
        self.parse_additive_expr()?;
        loop {
            let op = match self.kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            self.parse_additive_expr()?;
            self.builder.binary(op);
        }
        Ok(())
    }

    fn parse_additive_expr(&mut self) -> Result<(), ParseError> {
        self.parse_multiplicative_expr()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(b'+') => BinaryOp::Add,
                TokenKind::Punct(b'-') => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            self.parse_multiplicative_expr()?;
            self.builder.binary(op);
        }
        Ok(())
    }

    fn parse_multiplicative_expr(&mut self) -> Result<(), ParseError> {
        self.parse_unary_expr()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(b'*') => BinaryOp::Mul,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            self.parse_unary_expr()?;
            self.builder.binary(op);
        }
        Ok(())
    }

    fn parse_unary_expr(&mut self) -> Result<(), ParseError> {
        if self.at(TokenKind::Punct(b'-')) {
            self.bump();
            self.parse_unary_expr()?;
            self.builder.negate();
            Ok(())
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<(), ParseError> {
        self.parse_path_expr()?;
        while self.at(TokenKind::Punct(b'|')) {
            self.bump();
            self.parse_path_expr()?;
            self.builder.binary(BinaryOp::Union);
        }
        Ok(())
    }

    fn parse_path_expr(&mut self) -> Result<(), ParseError> {
        if starts_location_path(self.kind()) {
            return self.parse_location_path();
        }
        self.parse_filter_expr()
    }

    fn parse_filter_expr(&mut self) -> Result<(), ParseError> {
        self.parse_primary_expr()?;
        while self.at(TokenKind::Punct(b'[')) {
            self.parse_predicate_onto_stack()?;
        }

        if self.at(TokenKind::Punct(b'/')) || self.at(TokenKind::DblSlash) {
            let descendant_leading = self.at(TokenKind::DblSlash);
            self.bump();
            self.builder.begin_path();
            if descendant_leading {
                self.builder
                    .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
            }
            self.parse_relative_steps()?;
            self.builder.end_path(false)?;
            self.builder.filter_expr_end();
        }
        Ok(())
    }

    /// A predicate evaluated against a primary expression's result rather
    /// than a location step: `expr[pred]`. Compiled as a nested program
    /// run through `EvalSubMachine`, combined immediately via a binary
    /// `And`-style filter (modeled here as an `EvalSubMachine` call that
    /// the engine interprets as "filter the value currently on the
    /// stack").
    fn parse_predicate_onto_stack(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Punct(b'['))?;
        self.builder.begin_predicate();
        self.parse_or_expr()?;
        self.expect(TokenKind::Punct(b']'))?;
        let program = self.builder.end_predicate()?;
        self.builder.eval_sub_machine(program);
        Ok(())
    }

    fn parse_primary_expr(&mut self) -> Result<(), ParseError> {
        match self.kind() {
            TokenKind::Punct(b'(') => {
                self.bump();
                self.parse_or_expr()?;
                self.expect(TokenKind::Punct(b')'))?;
                Ok(())
            }
            TokenKind::Literal => {
                let text = self
                    .current
                    .literal()
                    .map(str::to_string)
                    .expect("Literal token always carries text");
                self.bump();
                self.builder.push_literal(text);
                Ok(())
            }
            TokenKind::Num => {
                let value = self
                    .current
                    .number()
                    .expect("Num token always carries a number");
                self.bump();
                self.builder.push_number(value);
                Ok(())
            }
            TokenKind::Func => self.parse_function_call(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_function_call(&mut self) -> Result<(), ParseError> {
        let name = self
            .current
            .symbol()
            .map(str::to_string)
            .expect("Func token always carries a symbol payload");
        self.bump();
        self.expect(TokenKind::Punct(b'('))?;

        let mut argc = 0;
        if !self.at(TokenKind::Punct(b')')) {
            self.parse_or_expr()?;
            argc += 1;
            while self.at(TokenKind::Punct(b',')) {
                self.bump();
                self.parse_or_expr()?;
                argc += 1;
            }
        }
        self.expect(TokenKind::Punct(b')'))?;

        if let Some(arity) = self.functions.and_then(|f| f.lookup(&name)) {
            if argc < arity.min || argc > arity.max {
                let expected = if arity.min == arity.max {
                    arity.min.to_string()
                } else {
                    format!("{}..{}", arity.min, arity.max)
                };
                return Err(ParseError::ArityMismatch {
                    name,
                    expected,
                    found: argc,
                });
            }
        }

        self.builder.call(name, argc);
        Ok(())
    }

    fn parse_location_path(&mut self) -> Result<(), ParseError> {
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

        if absolute
            && !starts_location_path_step(self.kind())
        {
            self.builder.end_path(true)?;
            return Ok(());
        }

        if pending_descendant_or_self {
            self.builder
                .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
        }

        self.parse_relative_steps()?;
        self.builder.end_path(absolute)?;
        Ok(())
    }

    /// Parses `Step (('/' | '//') Step)*`, assuming the first step has
    /// not yet been consumed and the builder already has an open path
    /// scope.
    fn parse_relative_steps(&mut self) -> Result<(), ParseError> {
        self.parse_step_with_predicates()?;
        loop {
            if self.at(TokenKind::DblSlash) {
                self.bump();
                self.builder
                    .add_step(Axis::DescendantOrSelf, NodeTest::AnyNode, Vec::new());
                self.parse_step_with_predicates()?;
            } else if self.at(TokenKind::Punct(b'/')) {
                self.bump();
                self.parse_step_with_predicates()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_step_with_predicates(&mut self) -> Result<(), ParseError> {
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

        let mut predicates = Vec::new();
        while self.at(TokenKind::Punct(b'[')) {
            self.expect(TokenKind::Punct(b'['))?;
            self.builder.begin_predicate();
            self.parse_or_expr()?;
            self.expect(TokenKind::Punct(b']'))?;
            predicates.push(self.builder.end_predicate()?);
        }

        self.builder.add_step(axis, test, predicates);
        Ok(())
    }
}

fn starts_location_path_step(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::DotDot
            | TokenKind::Punct(b'.')
            | TokenKind::Punct(b'@')
            | TokenKind::AxisName
            | TokenKind::NameTest
            | TokenKind::NodeType
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::FunctionArity;

    struct StubFunctions;
    impl FunctionLookup for StubFunctions {
        fn lookup(&self, name: &str) -> Option<FunctionArity> {
            match name {
                "true" | "false" | "last" | "position" | "current" => Some(FunctionArity::exact(0)),
                "not" | "string" | "boolean" | "number" | "count" | "string-length" => {
                    Some(FunctionArity::exact(1))
                }
                "concat" => Some(FunctionArity { min: 2, max: 2 }),
                "substring" => Some(FunctionArity { min: 2, max: 3 }),
                _ => None,
            }
        }
    }

    fn compile(source: &str) -> Program {
        let funcs = StubFunctions;
        compile_expression(source, Some(&funcs), None).unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        let program = compile("1 + 2 * 3");
        assert_eq!(program.len(), 5);
    }

    #[test]
    fn comparison_and_logic() {
        compile("1 < 2 and 3 >= 4");
    }

    #[test]
    fn absolute_path_with_predicate() {
        compile("/if:interfaces/if:interface[if:name = 'eth0']");
    }

    #[test]
    fn function_call_with_arity_check() {
        compile("string-length(concat('a', 'b'))");
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let funcs = StubFunctions;
        let err = compile_expression("concat('a')", Some(&funcs), None).unwrap_err();
        assert!(err.parse_error.is_some());
    }

    #[test]
    fn filter_expr_with_trailing_path() {
        compile("current()/../name");
    }

    #[test]
    fn union_of_two_paths() {
        compile("/a/b | /a/c");
    }
}
