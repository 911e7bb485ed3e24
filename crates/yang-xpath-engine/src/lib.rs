//! The YANG-aware XPath 1.0 evaluator: a value model, a symbol table of
//! built-in and plugin functions, and a stack machine that runs the
//! bytecode `yang-xpath-syntax` compiles.
//!
//! Compile-time errors ([`yang_xpath_syntax::CompileError`]) are
//! re-exported here so callers depend on a single crate for both
//! compiling and running a [`Machine`].

mod context;
mod datum;
mod error;
mod eval;
mod machine;
mod node;
mod result;
mod stdlib;
mod symbol;
mod validate;

pub use context::ExecutionContext;
pub use datum::{Datum, DatumError};
pub use error::EvalError;
pub use machine::{
    new_expression_machine, new_leafref_machine, new_must_when_machine, new_path_machine, Machine,
    RunOptions, StatementKind,
};
pub use node::{dedup, match_filter, node_string, AccessibleTree, ChildOrder, Node};
pub use result::{EvalResult, Warning, WarningKind};
pub use symbol::{ArgType, BuiltinFn, CustomFn, Symbol, SymbolError, SymbolTable};
pub use validate::{validate_path, PathValidation};

pub use yang_xpath_syntax::{CompileError, QName};
