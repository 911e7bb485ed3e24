//! Runtime error taxonomy (spec §7). Compile-time errors are
//! `yang_xpath_syntax::CompileError`, re-exported at the crate root.

use thiserror::Error;

/// A fatal runtime condition. All of these are captured at `Machine::run`'s
/// boundary and delivered as `Result.error`; none ever unwinds out of
/// public API (spec §9, "panic/recover as a language boundary").
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// An operand could not be coerced to the type an instruction needed.
    #[error("type error: {0}")]
    Type(#[from] crate::datum::DatumError),
    /// The evaluation stack did not hold as many values as an
    /// instruction required. Indicates a malformed program.
    #[error("stack underflow")]
    StackUnderflow,
    /// A function call's argument count did not match its declared
    /// arity (should not occur for programs that passed compilation).
    #[error("`{name}` expects {expected} argument(s), found {found}")]
    ArityMismatch {
        /// The function name.
        name: String,
        /// The declared arity.
        expected: String,
        /// The number of arguments actually supplied.
        found: usize,
    },
    /// A leafref predicate's right-hand side did not resolve to exactly
    /// one leaf node.
    #[error("leafref predicate target did not resolve to a single leaf: {reason}")]
    PathResolution {
        /// A human-readable explanation.
        reason: String,
    },
    /// A built-in function's own argument failed to parse into whatever
    /// it represents (e.g. `re-match`'s pattern failed to compile as a
    /// regular expression).
    #[error("`{name}`: {reason}")]
    InvalidPattern {
        /// The function name.
        name: String,
        /// A human-readable explanation.
        reason: String,
    },
    /// A built-in function panicked during evaluation.
    #[error("built-in function `{name}` panicked: {message}")]
    FunctionPanic {
        /// The function name.
        name: String,
        /// The panic payload, rendered as text.
        message: String,
    },
    /// An operator is not supported at runtime (e.g. `//` outside of
    /// compile-time path recognition).
    #[error("unsupported operator at runtime: {operator}")]
    UnsupportedOperator {
        /// A description of the operator.
        operator: String,
    },
    /// A referenced function is not registered in the symbol table.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// The program was left in an invalid state (e.g. `Store` observed
    /// with more than one value on the stack). Indicates a malformed
    /// program, not a user input error.
    #[error("malformed program: {0}")]
    MalformedProgram(String),
}
