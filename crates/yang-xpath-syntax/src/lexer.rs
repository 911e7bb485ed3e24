//! The context-sensitive lexer shared by all three grammars (spec §4.1).
//!
//! This is a hand-written, character-at-a-time scanner rather than a
//! table-driven one: XPath's `*`/keyword-vs-name disambiguation depends
//! on the *previous* token's kind (`preceding_token`, threaded through
//! every emit site per spec §9), which does not fit a regular,
//! context-free tokenizer.

use crate::error::LexError;
use crate::qname::QName;
use crate::span::Span;
use crate::token::{Payload, Token, TokenKind};

/// The inclusive/exclusive argument count a built-in or custom function
/// accepts, used by the lexer to decide whether `name(` is a [`TokenKind::Func`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionArity {
    /// The minimum number of arguments.
    pub min: usize,
    /// The maximum number of arguments.
    pub max: usize,
}

impl FunctionArity {
    /// An arity that accepts exactly `n` arguments.
    pub const fn exact(n: usize) -> Self {
        Self { min: n, max: n }
    }
}

/// A capability, implemented by `yang-xpath-engine`'s symbol table, that
/// lets the lexer/grammar ask whether a name is a known function without
/// this crate depending on the engine crate (which owns `Datum`-typed
/// function bodies).
pub trait FunctionLookup {
    /// Looks up a function by name, returning its arity if known.
    fn lookup(&self, name: &str) -> Option<FunctionArity>;
}

/// A capability that resolves an XPath prefix to a namespace URI.
pub trait PrefixResolver {
    /// Resolves `prefix` to a namespace URI, or `None` if unresolvable.
    fn resolve(&self, prefix: &str) -> Option<String>;
}

impl<F> PrefixResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, prefix: &str) -> Option<String> {
        self(prefix)
    }
}

/// Node-type keywords recognized before `(`.
const NODE_TYPES: &[&str] = &["comment", "text", "processing-instruction", "node"];

/// Axis names recognized before `::`.
const AXIS_NAMES: &[&str] = &[
    "ancestor",
    "ancestor-or-self",
    "attribute",
    "child",
    "descendant",
    "descendant-or-self",
    "following",
    "following-sibling",
    "namespace",
    "parent",
    "preceding",
    "preceding-sibling",
    "self",
];

/// Token kinds after which an operand (rather than an operator) is
/// expected. This single predicate drives both the `*`-vs-MULT rule and
/// the and/or/mod/div-vs-name rule (spec §4.1).
fn expects_operand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eof
            | TokenKind::Punct(b'@')
            | TokenKind::DblColon
            | TokenKind::Punct(b'(')
            | TokenKind::Punct(b'[')
            | TokenKind::Punct(b',')
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::Mod
            | TokenKind::Div
            | TokenKind::Punct(b'*')
            | TokenKind::Punct(b'/')
            | TokenKind::DblSlash
            | TokenKind::Punct(b'|')
            | TokenKind::Punct(b'+')
            | TokenKind::Punct(b'-')
            | TokenKind::Eq
            | TokenKind::Ne
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge
    )
}

/// Is `c` a legal XML NameStartChar (ASCII-approximated: letters and `_`,
/// plus any non-ASCII alphabetic code point)?
fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

/// Is `c` a legal XML NameChar continuation (adds `-`, `.`, digits)?
fn is_name_continue(c: char) -> bool {
    c == '_' || c == '-' || c == '.' || c.is_alphanumeric()
}

/// A context-sensitive tokenizer over a single XPath source string.
pub struct Lexer<'a> {
    source: &'a str,
    rest: &'a str,
    preceding: TokenKind,
    restricted: bool,
    functions: Option<&'a dyn FunctionLookup>,
    prefixes: Option<&'a dyn PrefixResolver>,
    error: Option<LexError>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for the full expression and must/when grammars.
    pub fn new(
        source: &'a str,
        functions: Option<&'a dyn FunctionLookup>,
        prefixes: Option<&'a dyn PrefixResolver>,
    ) -> Self {
        Self {
            source,
            rest: source,
            preceding: TokenKind::Eof,
            restricted: false,
            functions,
            prefixes,
            error: None,
        }
    }

    /// Creates a lexer restricted to the leafref/path grammar: only
    /// `current` may be a function, numbers and bare `.` are rejected,
    /// and names beginning (case-insensitively) with `xml` are rejected.
    pub fn new_restricted(source: &'a str, prefixes: Option<&'a dyn PrefixResolver>) -> Self {
        Self {
            source,
            rest: source,
            preceding: TokenKind::Eof,
            restricted: true,
            functions: None,
            prefixes,
            error: None,
        }
    }

    /// The byte offset of the lexer's current position in `source`.
    pub fn offset(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    /// Takes the last lexical error recorded, if any.
    pub fn take_error(&mut self) -> Option<LexError> {
        self.error.take()
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_char_at(&self, skip_ws: bool) -> Option<char> {
        if skip_ws {
            self.rest.trim_start().chars().next()
        } else {
            self.peek_char()
        }
    }

    fn bump(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn err(&mut self, start: usize, error: LexError) -> Token {
        self.error = Some(error);
        let span = Span::new(start, self.offset() - start);
        self.set_preceding(TokenKind::Err);
        Token::bare(TokenKind::Err, span)
    }

    fn set_preceding(&mut self, kind: TokenKind) {
        self.preceding = kind;
    }

    /// Produces the next token in the stream.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.offset();

        let Some(c) = self.peek_char() else {
            self.set_preceding(TokenKind::Eof);
            return Token::bare(TokenKind::Eof, Span::empty(start));
        };

        let token = match c {
            '.' => self.lex_dot(start),
            '/' => self.lex_slash(start),
            ':' => self.lex_colon(start),
            '*' => self.lex_star(start),
            '0'..='9' => self.lex_number(start),
            '"' | '\'' => self.lex_string(start),
            '=' => {
                self.bump();
                Token::bare(TokenKind::Eq, self.span_from(start))
            }
            '!' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    Token::bare(TokenKind::Ne, self.span_from(start))
                } else {
                    self.err(start, LexError::IllegalCharacter { found: '!' })
                }
            }
            '<' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    Token::bare(TokenKind::Le, self.span_from(start))
                } else {
                    Token::bare(TokenKind::Lt, self.span_from(start))
                }
            }
            '>' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    Token::bare(TokenKind::Ge, self.span_from(start))
                } else {
                    Token::bare(TokenKind::Gt, self.span_from(start))
                }
            }
            '@' | '(' | ')' | '[' | ']' | ',' | '|' | '+' | '-' => {
                self.bump();
                Token::bare(TokenKind::Punct(c as u8), self.span_from(start))
            }
            c if is_name_start(c) => self.lex_name(start),
            other => self.err(start, LexError::IllegalCharacter { found: other }),
        };

        self.set_preceding(token.kind);
        token
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.offset() - start)
    }

    fn lex_dot(&mut self, start: usize) -> Token {
        self.bump();
        match self.peek_char() {
            Some('.') => {
                self.bump();
                Token::bare(TokenKind::DotDot, self.span_from(start))
            }
            Some(c) if c.is_ascii_digit() => {
                self.rest = &self.source[start..];
                self.lex_number(start)
            }
            _ => {
                if self.restricted {
                    return self.err(
                        start,
                        LexError::ReservedInRestrictedGrammar {
                            what: ".".to_string(),
                        },
                    );
                }
                Token::bare(TokenKind::Punct(b'.'), self.span_from(start))
            }
        }
    }

    fn lex_slash(&mut self, start: usize) -> Token {
        self.bump();
        if self.peek_char() == Some('/') {
            self.bump();
            Token::bare(TokenKind::DblSlash, self.span_from(start))
        } else {
            Token::bare(TokenKind::Punct(b'/'), self.span_from(start))
        }
    }

    fn lex_colon(&mut self, start: usize) -> Token {
        self.bump();
        if self.peek_char() == Some(':') {
            self.bump();
            Token::bare(TokenKind::DblColon, self.span_from(start))
        } else {
            self.err(start, LexError::BareColon)
        }
    }

    fn lex_star(&mut self, start: usize) -> Token {
        self.bump();
        if expects_operand(&self.preceding) {
            Token::with_payload(
                TokenKind::NameTest,
                Payload::QName(QName::wildcard()),
                self.span_from(start),
            )
        } else {
            Token::bare(TokenKind::Punct(b'*'), self.span_from(start))
        }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        if self.restricted {
            return self.err(
                start,
                LexError::ReservedInRestrictedGrammar {
                    what: "number".to_string(),
                },
            );
        }
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E')
        {
            self.bump();
        }
        let text = &self.source[start..self.offset()];
        match text.parse::<f64>() {
            Ok(value) => Token::with_payload(
                TokenKind::Num,
                Payload::Number(value),
                self.span_from(start),
            ),
            Err(_) => {
                let text = text.to_string();
                self.err(start, LexError::BadNumber { text })
            }
        }
    }

    fn lex_string(&mut self, start: usize) -> Token {
        let quote = self.bump().expect("a quote character");
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    return Token::with_payload(
                        TokenKind::Literal,
                        Payload::Literal(text),
                        self.span_from(start),
                    );
                }
                Some(c) => text.push(c),
                None => return self.err(start, LexError::UnterminatedLiteral),
            }
        }
    }

    fn lex_name(&mut self, start: usize) -> Token {
        while matches!(self.peek_char(), Some(c) if is_name_continue(c)) {
            self.bump();
        }
        let name = &self.source[start..self.offset()];

        if self.restricted && name.len() >= 3 && name[..3].eq_ignore_ascii_case("xml") {
            let name = name.to_string();
            return self.err(start, LexError::ReservedInRestrictedGrammar { what: name });
        }

        if !expects_operand(&self.preceding) {
            let keyword = match name {
                "and" => Some(TokenKind::And),
                "or" => Some(TokenKind::Or),
                "mod" => Some(TokenKind::Mod),
                "div" => Some(TokenKind::Div),
                _ => None,
            };
            if let Some(kind) = keyword {
                return Token::bare(kind, self.span_from(start));
            }
        }

        if self.peek_char_at(true) == Some('(') {
            return self.lex_name_before_paren(start, name);
        }

        if self.rest.trim_start().starts_with("::") {
            return self.lex_axis_name(start, name);
        }

        if self.peek_char() == Some(':') {
            return self.lex_qualified_name(start, name);
        }

        Token::with_payload(
            TokenKind::NameTest,
            Payload::QName(QName::unqualified(name.to_string())),
            self.span_from(start),
        )
    }

    fn lex_name_before_paren(&mut self, start: usize, name: &str) -> Token {
        if NODE_TYPES.contains(&name) {
            return Token::with_payload(
                TokenKind::NodeType,
                Payload::Symbol(name.to_string()),
                self.span_from(start),
            );
        }
        if self.restricted {
            if name == "current" {
                return Token::with_payload(
                    TokenKind::Func,
                    Payload::Symbol(name.to_string()),
                    self.span_from(start),
                );
            }
            let name = name.to_string();
            return self.err(start, LexError::UnknownFunction { name });
        }
        match self.functions.and_then(|f| f.lookup(name)) {
            Some(_) => Token::with_payload(
                TokenKind::Func,
                Payload::Symbol(name.to_string()),
                self.span_from(start),
            ),
            None => {
                let name = name.to_string();
                self.err(start, LexError::UnknownFunction { name })
            }
        }
    }

    fn lex_axis_name(&mut self, start: usize, name: &str) -> Token {
        if AXIS_NAMES.contains(&name) {
            Token::with_payload(
                TokenKind::AxisName,
                Payload::Symbol(name.to_string()),
                self.span_from(start),
            )
        } else {
            let name = name.to_string();
            self.err(start, LexError::UnknownAxisOrNodeType { name })
        }
    }

    fn lex_qualified_name(&mut self, start: usize, prefix: &str) -> Token {
        self.bump(); // consume ':'
        if self.peek_char() == Some('*') {
            self.bump();
            let namespace = match self.resolve_prefix(start, prefix) {
                Ok(ns) => ns,
                Err(token) => return token,
            };
            return Token::with_payload(
                TokenKind::NameTest,
                Payload::QName(QName::namespaced_wildcard(namespace)),
                self.span_from(start),
            );
        }

        let local_start = self.offset();
        while matches!(self.peek_char(), Some(c) if is_name_continue(c)) {
            self.bump();
        }
        let local = &self.source[local_start..self.offset()];
        if local.is_empty() {
            return self.err(start, LexError::BareColon);
        }
        let local = local.to_string();
        let namespace = match self.resolve_prefix(start, prefix) {
            Ok(ns) => ns,
            Err(token) => return token,
        };
        Token::with_payload(
            TokenKind::NameTest,
            Payload::QName(QName::new(namespace, local)),
            self.span_from(start),
        )
    }

    fn resolve_prefix(&mut self, start: usize, prefix: &str) -> Result<String, Token> {
        match self.prefixes {
            Some(resolver) => match resolver.resolve(prefix) {
                Some(ns) => Ok(ns),
                None => {
                    let prefix = prefix.to_string();
                    Err(self.err(start, LexError::UnresolvablePrefix { prefix }))
                }
            },
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFunctions;
    impl FunctionLookup for NoFunctions {
        fn lookup(&self, name: &str) -> Option<FunctionArity> {
            matches!(name, "true" | "false" | "count").then(|| FunctionArity::exact(0))
        }
    }

    fn tokens(source: &str) -> Vec<TokenKind> {
        let funcs = NoFunctions;
        let mut lexer = Lexer::new(source, Some(&funcs), None);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let eof = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn leading_star_is_wildcard_name_test() {
        let kinds = tokens("/*");
        assert_eq!(kinds, vec![TokenKind::Punct(b'/'), TokenKind::NameTest, TokenKind::Eof]);
    }

    #[test]
    fn star_after_operand_is_multiply() {
        let kinds = tokens("1 * 2");
        assert_eq!(
            kinds,
            vec![TokenKind::Num, TokenKind::Punct(b'*'), TokenKind::Num, TokenKind::Eof]
        );
    }

    #[test]
    fn dotdot_and_dot() {
        assert_eq!(tokens(".."), vec![TokenKind::DotDot, TokenKind::Eof]);
        assert_eq!(tokens("."), vec![TokenKind::Punct(b'.'), TokenKind::Eof]);
    }

    #[test]
    fn and_or_only_in_operator_position() {
        // After a NameTest (operand), "and" is the keyword.
        let kinds = tokens("foo and bar");
        assert_eq!(
            kinds,
            vec![TokenKind::NameTest, TokenKind::And, TokenKind::NameTest, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_literal_is_error() {
        let kinds = tokens("'abc");
        assert_eq!(kinds, vec![TokenKind::Err, TokenKind::Eof]);
    }

    #[test]
    fn qualified_name_without_resolver_is_unqualified_empty_namespace() {
        let funcs = NoFunctions;
        let mut lexer = Lexer::new("pfx:leaf", Some(&funcs), None);
        let tok = lexer.next_token();
        assert_eq!(tok.qname().unwrap().namespace(), "");
        assert_eq!(tok.qname().unwrap().local(), "leaf");
    }

    #[test]
    fn restricted_lexer_rejects_numbers_and_xml_names() {
        let mut lexer = Lexer::new_restricted("42", None);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Err);

        let mut lexer = Lexer::new_restricted("xml-thing", None);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Err);
    }

    #[test]
    fn restricted_lexer_allows_current_function_only() {
        let mut lexer = Lexer::new_restricted("current()", None);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Func);

        let mut lexer = Lexer::new_restricted("other()", None);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Err);
    }
}
