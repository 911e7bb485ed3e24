//! The outcome of a `Machine::run` (spec §3's Result/Warning records).
//!
//! Named `EvalResult` rather than `Result` to avoid shadowing
//! [`std::result::Result`], which the rest of this crate uses throughout.

use crate::datum::Datum;
use crate::error::EvalError;
use crate::node::Node;

/// The kind of a path-validation diagnostic (spec §3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The path resolved successfully against the schema tree. Not a
    /// warning in the ordinary sense — see [`WarningKind::is_warning`].
    ValidPath,
    /// The path did not resolve, even with namespace prefixes stripped.
    DoesntExist,
    /// The path resolved only after stripping namespace prefixes.
    MissingOrWrongPrefix,
    /// A `must` statement is declared directly on a non-presence container.
    MustOnNPContainer,
    /// A `must` statement is declared on a node whose non-presence
    /// container child is implicated by the statement's own target.
    MustOnNPContWithNPChild,
    /// A resolved path's final step is a non-presence container.
    RefNPContainer,
    /// The expression failed to compile.
    CompilerError,
}

impl WarningKind {
    /// Whether this kind represents an actual problem, as opposed to
    /// [`WarningKind::ValidPath`]'s successful-resolution record.
    pub fn is_warning(self) -> bool {
        !matches!(self, WarningKind::ValidPath)
    }
}

/// A single path-validation diagnostic, attached to a compiled `must`,
/// `when`, or leafref `path` statement (spec §3, §4.8).
#[derive(Debug, Clone)]
pub struct Warning {
    /// What kind of diagnostic this is.
    pub kind: WarningKind,
    /// The absolute path of the node the statement is declared on.
    pub originating_path: String,
    /// The source text of the XPath statement.
    pub statement: String,
    /// A human-readable definition location (`module:line`).
    pub location: String,
    /// The source text of the specific path expression tested.
    pub tested_path: String,
    /// The debug trace collected while resolving this path, if any.
    pub debug_trace: String,
}

/// The outcome of running a compiled `Machine` (spec §3's Result record).
pub struct EvalResult<N> {
    value: Option<Datum<N>>,
    error: Option<EvalError>,
    warnings: Vec<Warning>,
    debug: Vec<String>,
}

impl<N: Node> EvalResult<N> {
    /// Builds a successful result.
    pub fn ok(value: Datum<N>, warnings: Vec<Warning>, debug: Vec<String>) -> Self {
        Self {
            value: Some(value),
            error: None,
            warnings,
            debug,
        }
    }

    /// Builds a failed result: `error` is propagated by every coercion
    /// accessor below.
    pub fn err(error: EvalError, warnings: Vec<Warning>, debug: Vec<String>) -> Self {
        Self {
            value: None,
            error: Some(error),
            warnings,
            debug,
        }
    }

    /// The run's fatal error, if it failed.
    pub fn error(&self) -> Option<&EvalError> {
        self.error.as_ref()
    }

    /// The debug trace, as a single newline-joined string.
    pub fn debug_text(&self) -> String {
        self.debug.join("\n")
    }

    fn value(&self) -> Result<&Datum<N>, EvalError> {
        match (&self.value, &self.error) {
            (Some(v), _) => Ok(v),
            (None, Some(e)) => Err(e.clone()),
            (None, None) => unreachable!("an EvalResult always carries a value or an error"),
        }
    }

    /// Coerces the result to a number.
    pub fn number(&self) -> Result<f64, EvalError> {
        Ok(self.value()?.to_number()?)
    }

    /// Coerces the result to a boolean.
    pub fn boolean(&self) -> Result<bool, EvalError> {
        Ok(self.value()?.to_boolean()?)
    }

    /// Coerces the result to a string.
    pub fn literal(&self) -> Result<String, EvalError> {
        Ok(self.value()?.to_literal()?)
    }

    /// Borrows the result's nodeset; fails if the value is not one.
    pub fn nodeset(&self) -> Result<&[N], EvalError> {
        Ok(self.value()?.as_nodeset()?)
    }

    /// The diagnostics whose kind represents an actual problem.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(|w| w.kind.is_warning())
    }

    /// The diagnostics recording a successful resolution
    /// ([`WarningKind::ValidPath`]).
    pub fn non_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(|w| !w.kind.is_warning())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;

    fn warning(kind: WarningKind) -> Warning {
        Warning {
            kind,
            originating_path: "/a".to_string(),
            statement: "../b".to_string(),
            location: "test:1".to_string(),
            tested_path: "../b".to_string(),
            debug_trace: String::new(),
        }
    }

    #[test]
    fn failed_result_propagates_error_from_every_accessor() {
        let result = EvalResult::<TestNode>::err(EvalError::StackUnderflow, Vec::new(), Vec::new());
        assert!(result.number().is_err());
        assert!(result.boolean().is_err());
        assert!(result.literal().is_err());
        assert!(result.nodeset().is_err());
    }

    #[test]
    fn warnings_and_non_warnings_partition_by_kind() {
        let result = EvalResult::<TestNode>::ok(
            Datum::Boolean(true),
            vec![warning(WarningKind::ValidPath), warning(WarningKind::DoesntExist)],
            Vec::new(),
        );
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.non_warnings().count(), 1);
    }
}
