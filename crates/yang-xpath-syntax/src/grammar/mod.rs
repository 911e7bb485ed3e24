//! The three grammar entry points compiled from the shared token
//! vocabulary (spec §4.1, §4.2): a full XPath 1.0 expression grammar, a
//! bare location-path grammar, and a leafref path grammar that allows
//! `current()`-relative equality predicates.

mod expr;
mod leafref;
mod path;

pub use expr::compile_expression;
pub use leafref::compile_leafref;
pub use path::compile_path;

use crate::builder::ProgramBuilder;
use crate::error::{CompileError, ParseError};
use crate::instruction::{Axis, NodeTest, Program};
use crate::lexer::{FunctionLookup, Lexer, PrefixResolver};
use crate::token::{Token, TokenKind};

/// Shared recursive-descent parsing state threaded through all three
/// grammar entry points. Each grammar module defines its own entry
/// production(s) as methods on [`Parser`] via its own `impl` block.
pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    pub(crate) builder: ProgramBuilder,
    current: Token,
    functions: Option<&'a dyn FunctionLookup>,
}

impl<'a> Parser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Self::with_functions(lexer, None)
    }

    fn with_functions(mut lexer: Lexer<'a>, functions: Option<&'a dyn FunctionLookup>) -> Self {
        let current = lexer.next_token();
        Self {
            lexer,
            builder: ProgramBuilder::new(),
            current,
            functions,
        }
    }

    fn kind(&self) -> TokenKind {
        self.current.kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Advances past the current token, returning it.
    fn bump(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    /// Consumes the current token if it matches `kind`, else errors.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.current.kind == kind {
            Ok(self.bump())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        ParseError::Unexpected {
            found: self.current.kind,
            span: self.current.span,
        }
    }

    fn reached(&self) -> usize {
        self.lexer.offset()
    }

    /// Runs `parse` to completion, translating any lexical error recorded
    /// on the lexer or parse-phase error into the user-visible
    /// [`CompileError`], and rejecting trailing input.
    fn finish<F>(mut self, source: &str, parse: F) -> Result<Program, CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), ParseError>,
    {
        let result = parse(&mut self);

        if let Some(lex_error) = self.lexer.take_error() {
            return Err(CompileError::lex(source, lex_error, self.reached()));
        }

        match result {
            Ok(()) => {}
            Err(parse_error) => return Err(CompileError::parse(source, parse_error, self.reached())),
        }

        if !self.at(TokenKind::Eof) {
            let err = self.unexpected();
            return Err(CompileError::parse(source, err, self.reached()));
        }

        self.builder
            .finish()
            .map_err(|e| CompileError::parse(source, e, self.reached()))
    }

    /// Parses an axis specifier at the current position: `@`,
    /// `axis-name::`, or (the default when neither is present) the
    /// implicit child axis.
    fn parse_axis(&mut self) -> Result<Axis, ParseError> {
        if self.at(TokenKind::Punct(b'@')) {
            self.bump();
            return Ok(Axis::Attribute);
        }
        if self.at(TokenKind::AxisName) {
            let name = self
                .current_symbol()
                .expect("AxisName token always carries a symbol payload");
            let axis = Axis::from_name(&name).ok_or_else(|| self.unexpected())?;
            self.bump();
            self.expect(TokenKind::DblColon)?;
            return Ok(axis);
        }
        Ok(Axis::Child)
    }

    /// Parses a node test: a name test (including wildcards), or a node
    /// type keyword applied to `()`.
    fn parse_node_test(&mut self) -> Result<NodeTest, ParseError> {
        match self.kind() {
            TokenKind::NameTest => {
                let q = self
                    .current
                    .qname()
                    .cloned()
                    .expect("NameTest token always carries a QName payload");
                self.bump();
                Ok(NodeTest::Name(q))
            }
            TokenKind::NodeType => {
                let name = self
                    .current_symbol()
                    .expect("NodeType token always carries a symbol payload");
                self.bump();
                self.expect(TokenKind::Punct(b'('))?;
                let test = match name.as_str() {
                    "node" => NodeTest::AnyNode,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "processing-instruction" => {
                        if self.at(TokenKind::Literal) {
                            let lit = self
                                .current
                                .literal()
                                .map(str::to_string)
                                .expect("Literal token always carries text");
                            self.bump();
                            NodeTest::ProcessingInstruction(Some(lit))
                        } else {
                            NodeTest::ProcessingInstruction(None)
                        }
                    }
                    _ => return Err(self.unexpected()),
                };
                self.expect(TokenKind::Punct(b')'))?;
                Ok(test)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn current_symbol(&self) -> Option<String> {
        self.current.symbol().map(str::to_string)
    }
}

fn empty_guard(source: &str) -> Result<(), CompileError> {
    if source.trim().is_empty() {
        Err(CompileError::empty_input())
    } else {
        Ok(())
    }
}

pub(crate) fn new_lexer<'a>(
    source: &'a str,
    functions: Option<&'a dyn FunctionLookup>,
    prefixes: Option<&'a dyn PrefixResolver>,
) -> Lexer<'a> {
    Lexer::new(source, functions, prefixes)
}

pub(crate) fn new_restricted_lexer<'a>(
    source: &'a str,
    prefixes: Option<&'a dyn PrefixResolver>,
) -> Lexer<'a> {
    Lexer::new_restricted(source, prefixes)
}
