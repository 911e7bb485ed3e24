//! The tagged-union value model and its coercion contract (spec §3).

use crate::node::Node;

/// A runtime XPath value: one of five cases, with a strict coercion
/// contract between them (spec §3).
///
/// [`Datum::Invalid`] is a sentinel: coercing it to anything else is a
/// fatal error. No other variant may be coerced *to* [`Datum::Nodeset`];
/// only a nodeset yields one.
#[derive(Debug, Clone)]
pub enum Datum<N> {
    /// A boolean value.
    Boolean(bool),
    /// An IEEE-754 double. NaN and infinities are reachable.
    Number(f64),
    /// A Unicode string.
    Literal(String),
    /// An ordered set of node references.
    Nodeset(Vec<N>),
    /// The invalid sentinel.
    Invalid,
}

impl<N: Node> Datum<N> {
    /// Creates a nodeset datum from an iterator of nodes.
    pub fn nodeset(nodes: impl IntoIterator<Item = N>) -> Self {
        Self::Nodeset(nodes.into_iter().collect())
    }

    /// A human-readable type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::Literal(_) => "literal",
            Self::Nodeset(_) => "nodeset",
            Self::Invalid => "invalid",
        }
    }

    /// Coerces to a boolean per spec §3.
    pub fn to_boolean(&self) -> Result<bool, DatumError> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
            Self::Literal(s) => Ok(!s.is_empty()),
            Self::Nodeset(ns) => Ok(!ns.is_empty()),
            Self::Invalid => Err(DatumError::InvalidCoercion { to: "boolean" }),
        }
    }

    /// Coerces to a number per spec §3 (literal parse failures yield NaN,
    /// not an error).
    pub fn to_number(&self) -> Result<f64, DatumError> {
        match self {
            Self::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Ok(*n),
            Self::Literal(s) => Ok(s.trim().parse::<f64>().unwrap_or(f64::NAN)),
            Self::Nodeset(ns) => Ok(string_value_of_first(ns).trim().parse::<f64>().unwrap_or(f64::NAN)),
            Self::Invalid => Err(DatumError::InvalidCoercion { to: "number" }),
        }
    }

    /// Coerces to a string per spec §3's rendering rules.
    pub fn to_literal(&self) -> Result<String, DatumError> {
        match self {
            Self::Boolean(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            Self::Number(n) => Ok(render_number(*n)),
            Self::Literal(s) => Ok(s.clone()),
            Self::Nodeset(ns) => Ok(string_value_of_first(ns)),
            Self::Invalid => Err(DatumError::InvalidCoercion { to: "literal" }),
        }
    }

    /// Borrows the nodeset, if this is one; no other variant coerces to
    /// a nodeset.
    pub fn as_nodeset(&self) -> Result<&[N], DatumError> {
        match self {
            Self::Nodeset(ns) => Ok(ns),
            other => Err(DatumError::NotANodeset {
                found: other.type_name(),
            }),
        }
    }
}

fn string_value_of_first<N: Node>(nodes: &[N]) -> String {
    nodes.first().map(Node::string_value).unwrap_or_default()
}

/// Renders a number per spec §3: `"0"` for either zero, `"Infinity"` /
/// `"-Infinity"` for infinities, `"NaN"` for NaN, otherwise the shortest
/// round-tripping decimal.
pub fn render_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let mut s = format!("{n}");
    if s.contains('e') || s.contains('E') {
        s = format!("{n:.17}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// A failed coercion.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DatumError {
    /// The invalid sentinel cannot be coerced to any other type.
    #[error("cannot coerce the invalid sentinel to {to}")]
    InvalidCoercion {
        /// The target type name.
        to: &'static str,
    },
    /// Only a nodeset coerces to a nodeset.
    #[error("expected a nodeset, found {found}")]
    NotANodeset {
        /// The actual type name found.
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;

    #[test]
    fn number_rendering() {
        assert_eq!(render_number(0.0), "0");
        assert_eq!(render_number(-0.0), "0");
        assert_eq!(render_number(f64::INFINITY), "Infinity");
        assert_eq!(render_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(render_number(f64::NAN), "NaN");
        assert_eq!(render_number(42.0), "42");
    }

    #[test]
    fn boolean_coercions() {
        assert!(Datum::<TestNode>::Number(1.0).to_boolean().unwrap());
        assert!(!Datum::<TestNode>::Number(0.0).to_boolean().unwrap());
        assert!(!Datum::<TestNode>::Number(f64::NAN).to_boolean().unwrap());
    }

    #[test]
    fn literal_to_number_parse_failure_yields_nan() {
        let d = Datum::<TestNode>::Literal("not a number".to_string());
        assert!(d.to_number().unwrap().is_nan());
    }

    #[test]
    fn only_nodeset_coerces_to_nodeset() {
        let d = Datum::<TestNode>::Number(1.0);
        assert!(d.as_nodeset().is_err());
    }
}
