//! The shared token vocabulary used by every grammar (spec §3, §4.1).

use std::fmt;

use crate::qname::QName;
use crate::span::Span;

/// A kind of token produced by the [`Lexer`](crate::Lexer).
///
/// This enumeration is shared by all three grammars; a given grammar
/// simply never produces some of these kinds (e.g. the leafref grammar
/// never produces [`TokenKind::Or`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// A lexical error occurred; the message is recorded on the lexer.
    Err,
    /// A numeric literal.
    Num,
    /// A function name immediately followed by `(`.
    Func,
    /// `..`
    DotDot,
    /// `//`
    DblSlash,
    /// `::`
    DblColon,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `comment`, `text`, `processing-instruction`, or `node` before `(`.
    NodeType,
    /// An axis name before `::`.
    AxisName,
    /// An (optionally qualified) name test, including `*` and `prefix:*`.
    NameTest,
    /// A quoted string literal.
    Literal,
    /// `or`
    Or,
    /// `and`
    And,
    /// `mod`
    Mod,
    /// `div`
    Div,
    /// `text()` recognized as a special function form.
    TextFunc,
    /// A single ASCII punctuation character treated as its own token kind
    /// (e.g. `.`, `/`, `*`, `@`, `(`, `)`, `[`, `]`, `,`, `|`, `+`, `-`).
    Punct(u8),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "end of input"),
            Self::Err => write!(f, "error"),
            Self::Num => write!(f, "number"),
            Self::Func => write!(f, "function"),
            Self::DotDot => write!(f, ".."),
            Self::DblSlash => write!(f, "//"),
            Self::DblColon => write!(f, "::"),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::NodeType => write!(f, "node type"),
            Self::AxisName => write!(f, "axis name"),
            Self::NameTest => write!(f, "name test"),
            Self::Literal => write!(f, "literal"),
            Self::Or => write!(f, "or"),
            Self::And => write!(f, "and"),
            Self::Mod => write!(f, "mod"),
            Self::Div => write!(f, "div"),
            Self::TextFunc => write!(f, "text()"),
            Self::Punct(c) => write!(f, "{}", *c as char),
        }
    }
}

/// The payload carried by some token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A parsed double, for [`TokenKind::Num`].
    Number(f64),
    /// The unescaped text of a quoted literal, for [`TokenKind::Literal`].
    Literal(String),
    /// The resolved qualified name, for [`TokenKind::NameTest`].
    QName(QName),
    /// The function or axis name as written, for [`TokenKind::Func`],
    /// [`TokenKind::AxisName`], and [`TokenKind::NodeType`].
    Symbol(String),
}

/// A single lexical token: its kind, optional payload, and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of the token.
    pub kind: TokenKind,
    /// The payload, if this kind carries one.
    pub payload: Option<Payload>,
    /// The span of source text this token came from.
    pub span: Span,
}

impl Token {
    /// Creates a token with no payload.
    pub fn bare(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            payload: None,
            span,
        }
    }

    /// Creates a token carrying a payload.
    pub fn with_payload(kind: TokenKind, payload: Payload, span: Span) -> Self {
        Self {
            kind,
            payload: Some(payload),
            span,
        }
    }

    /// Gets the number payload, if any.
    pub fn number(&self) -> Option<f64> {
        match &self.payload {
            Some(Payload::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Gets the literal text payload, if any.
    pub fn literal(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Literal(s)) => Some(s),
            _ => None,
        }
    }

    /// Gets the qualified name payload, if any.
    pub fn qname(&self) -> Option<&QName> {
        match &self.payload {
            Some(Payload::QName(q)) => Some(q),
            _ => None,
        }
    }

    /// Gets the symbol name payload, if any.
    pub fn symbol(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Symbol(s)) => Some(s),
            _ => None,
        }
    }
}
