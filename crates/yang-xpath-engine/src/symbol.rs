//! The symbol table: the registry of built-in and custom XPath functions
//! (spec §3, §5, §6's Plugin API).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use yang_xpath_syntax::{FunctionArity, FunctionLookup};

use crate::context::ExecutionContext;
use crate::datum::Datum;
use crate::error::EvalError;
use crate::node::Node;
use crate::stdlib;

/// The declared type of an argument or return value, used to validate
/// coercions at the `Bltin` boundary (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// A boolean.
    Boolean,
    /// A number.
    Number,
    /// A string.
    Literal,
    /// A nodeset (no implicit coercion is performed into this type).
    Nodeset,
    /// Any type; coerced lazily by the function body itself.
    Any,
}

impl ArgType {
    /// Coerces `datum` to this declared type, or passes it through
    /// unchanged for [`ArgType::Any`].
    pub fn coerce<N: Node>(self, datum: Datum<N>) -> Result<Datum<N>, EvalError> {
        match self {
            ArgType::Boolean => Ok(Datum::Boolean(datum.to_boolean()?)),
            ArgType::Number => Ok(Datum::Number(datum.to_number()?)),
            ArgType::Literal => Ok(Datum::Literal(datum.to_literal()?)),
            ArgType::Nodeset => Ok(Datum::Nodeset(datum.as_nodeset()?.to_vec())),
            ArgType::Any => Ok(datum),
        }
    }
}

/// A built-in function's implementation: receives already-coerced
/// arguments and the execution context (for `current`/`last`/`position`),
/// and returns a value or a fatal error.
pub type BuiltinFn<N> = fn(&ExecutionContext<'_, N>, &[Datum<N>]) -> Result<Datum<N>, EvalError>;

/// A custom (plugin-registered) function body. Unlike built-ins, custom
/// functions cannot fail the run: a panic is caught and substituted with
/// `default_return` (spec §5).
pub type CustomFn<N> = Arc<dyn Fn(&[Datum<N>]) -> Datum<N> + Send + Sync>;

enum Body<N> {
    Builtin(BuiltinFn<N>),
    Custom {
        func: CustomFn<N>,
        default_return: Datum<N>,
    },
}

/// A registered function: its name, declared signature, and
/// implementation (spec §3's Symbol record).
pub struct Symbol<N> {
    name: String,
    arg_types: Vec<ArgType>,
    return_type: ArgType,
    body: Body<N>,
}

impl<N: Node> Symbol<N> {
    pub(crate) fn builtin(name: &str, arg_types: Vec<ArgType>, return_type: ArgType, f: BuiltinFn<N>) -> Self {
        Self {
            name: name.to_string(),
            arg_types,
            return_type,
            body: Body::Builtin(f),
        }
    }

    /// The function's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared arity: custom functions may accept a range.
    pub fn arity(&self) -> FunctionArity {
        FunctionArity::exact(self.arg_types.len())
    }

    /// Whether this is a plugin-registered (as opposed to built-in)
    /// function.
    pub fn is_custom(&self) -> bool {
        matches!(self.body, Body::Custom { .. })
    }

    /// Coerces `args` per the declared signature, invokes the function,
    /// and validates the return type (when `validate` is set).
    fn invoke(&self, ctx: &ExecutionContext<'_, N>, args: Vec<Datum<N>>, validate: bool) -> Result<Datum<N>, EvalError> {
        if args.len() != self.arg_types.len() {
            return Err(EvalError::ArityMismatch {
                name: self.name.clone(),
                expected: self.arg_types.len().to_string(),
                found: args.len(),
            });
        }
        let coerced = args
            .into_iter()
            .zip(&self.arg_types)
            .map(|(a, ty)| ty.coerce(a))
            .collect::<Result<Vec<_>, _>>()?;

        let result = match &self.body {
            Body::Builtin(f) => match catch_unwind(AssertUnwindSafe(|| f(ctx, &coerced))) {
                Ok(result) => result?,
                Err(payload) => {
                    let message = panic_message(&payload);
                    tracing::warn!(function = %self.name, message = %message, "built-in function panicked");
                    return Err(EvalError::FunctionPanic { name: self.name.clone(), message });
                }
            },
            Body::Custom { func, default_return } => {
                match catch_unwind(AssertUnwindSafe(|| func(&coerced))) {
                    Ok(datum) => datum,
                    Err(_) => {
                        tracing::warn!(function = %self.name, "custom function panicked, substituting default return");
                        default_return.clone()
                    }
                }
            }
        };

        if validate {
            let _ = self.return_type.coerce(result.clone())?;
        }
        Ok(result)
    }
}

/// Renders a caught panic payload as text, falling back to a generic
/// message for payloads that are neither `&str` nor `String`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Errors raised when registering a custom function (spec §6's Plugin
/// API naming rule).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SymbolError {
    /// The name was empty.
    #[error("function name must not be empty")]
    EmptyName,
    /// The name did not start with a lowercase letter or contained
    /// characters other than lowercase letters, digits, and hyphens.
    #[error("function name `{0}` must start with a lowercase letter and contain only lowercase letters, digits, and hyphens")]
    InvalidName(String),
    /// A function with this name is already registered.
    #[error("function `{0}` is already registered")]
    AlreadyRegistered(String),
}

fn validate_name(name: &str) -> Result<(), SymbolError> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(SymbolError::EmptyName),
        Some(c) if !c.is_ascii_lowercase() => return Err(SymbolError::InvalidName(name.to_string())),
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(SymbolError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// The process's function registry: built-ins plus any plugin-registered
/// customs (spec §3's Symbol Table, §5's "process-wide, populated once").
///
/// Unlike the original's dynamically-typed, truly global singleton, this
/// table is generic over the node type `N` and so cannot live behind a
/// single process-wide `static`; callers construct one (typically wrapped
/// in an `Arc` and shared across `Machine` runs) via
/// [`SymbolTable::with_builtins`].
pub struct SymbolTable<N> {
    functions: IndexMap<String, Symbol<N>>,
}

impl<N: Node> SymbolTable<N> {
    /// Builds a table containing only the built-in catalog of spec §4.7.
    pub fn with_builtins() -> Self {
        let mut functions = IndexMap::new();
        for symbol in stdlib::catalog::<N>() {
            functions.insert(symbol.name.clone(), symbol);
        }
        Self { functions }
    }

    /// Registers a custom function (spec §6's Plugin API).
    pub fn register_custom(
        &mut self,
        name: &str,
        arg_types: Vec<ArgType>,
        return_type: ArgType,
        default_return: Datum<N>,
        func: CustomFn<N>,
    ) -> Result<(), SymbolError> {
        validate_name(name)?;
        if self.functions.contains_key(name) {
            return Err(SymbolError::AlreadyRegistered(name.to_string()));
        }
        self.functions.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                arg_types,
                return_type,
                body: Body::Custom { func, default_return },
            },
        );
        Ok(())
    }

    /// Looks up a symbol by name.
    pub fn get(&self, name: &str) -> Option<&Symbol<N>> {
        self.functions.get(name)
    }

    /// Invokes `name` with `args`, coercing per its declared signature.
    pub fn call(
        &self,
        name: &str,
        ctx: &ExecutionContext<'_, N>,
        args: Vec<Datum<N>>,
        validate: bool,
    ) -> Result<Datum<N>, EvalError> {
        let symbol = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        symbol.invoke(ctx, args, validate)
    }
}

impl<N: Node> FunctionLookup for SymbolTable<N> {
    fn lookup(&self, name: &str) -> Option<FunctionArity> {
        self.functions.get(name).map(Symbol::arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;

    #[test]
    fn builtins_are_registered() {
        let table = SymbolTable::<TestNode>::with_builtins();
        assert!(table.get("concat").is_some());
        assert!(table.get("not-a-real-function").is_none());
    }

    #[test]
    fn custom_name_validation() {
        assert_eq!(validate_name(""), Err(SymbolError::EmptyName));
        assert!(validate_name("Bad").is_err());
        assert!(validate_name("good-name2").is_ok());
    }

    #[test]
    fn custom_function_panic_substitutes_default() {
        let mut table = SymbolTable::<TestNode>::with_builtins();
        table
            .register_custom(
                "always-panics",
                vec![],
                ArgType::Boolean,
                Datum::Boolean(false),
                Arc::new(|_args| panic!("boom")),
            )
            .unwrap();
        let ctx = ExecutionContext::new_for_test(TestNode::new("root"));
        let result = table.call("always-panics", &ctx, vec![], false).unwrap();
        assert!(matches!(result, Datum::Boolean(false)));
    }
}
