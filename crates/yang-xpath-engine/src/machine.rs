//! The compiled, immutable unit of execution (spec §3's Machine, §6's
//! External Interfaces compilation/evaluation API).

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use yang_xpath_syntax::{
    compile_expression, compile_leafref, compile_path, CompileError, FunctionLookup, Operand,
    PrefixResolver, Program, Step,
};

use crate::context::ExecutionContext;
use crate::error::EvalError;
use crate::eval;
use crate::node::{AccessibleTree, Node};
use crate::result::{EvalResult, Warning, WarningKind};
use crate::symbol::SymbolTable;
use crate::validate;

/// What kind of YANG statement a [`Machine`] was compiled from, which
/// governs what extra diagnostics [`Machine::validate`] produces (spec
/// §4.8's `MustOnNPContainer`/`MustOnNPContWithNPChild`, specific to
/// `must`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A generic XPath expression with no path-validation diagnostics
    /// (e.g. a `default` value computation).
    Expression,
    /// A `must` statement.
    Must,
    /// A `when` statement.
    When,
    /// A `leafref` `path` substatement.
    Leafref,
}

/// Options controlling one [`Machine::run`] (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Collect a human-readable instruction trace alongside the result.
    pub debug: bool,
    /// Coerce each `Bltin` return value to its declared type, failing
    /// the run if it doesn't fit.
    pub validation: bool,
    /// Which slice of the tree steps may traverse into.
    pub accessible_tree: AccessibleTree,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            debug: false,
            validation: false,
            accessible_tree: AccessibleTree::FullTree,
        }
    }
}

/// A compiled program plus its provenance (spec §3's Machine: "a
/// compiled Machine additionally stores the originating source
/// expression and its definition location").
pub struct Machine {
    program: Program,
    kind: StatementKind,
    source: String,
    location: String,
}

impl Machine {
    fn compile(
        program: Program,
        kind: StatementKind,
        source: &str,
        location: impl Into<String>,
    ) -> Self {
        Self {
            program,
            kind,
            source: source.to_string(),
            location: location.into(),
        }
    }

    /// The originating source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The definition location (`module:line`).
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The compiled program, for inspection or reuse.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs the machine against `ctx_node`, producing a value plus any
    /// path-validation warnings collected by [`Machine::validate`] when
    /// `options.validation` is set (spec §6).
    #[tracing::instrument(level = "debug", skip(self, ctx_node, symbols), fields(source = %self.source))]
    pub fn run<N: Node>(
        &self,
        ctx_node: N,
        options: RunOptions,
        symbols: &SymbolTable<N>,
    ) -> EvalResult<N> {
        let trace = options.debug.then(|| RefCell::new(Vec::new()));
        let ctx = ExecutionContext::new(ctx_node.clone(), options.accessible_tree, trace.as_ref());

        let warnings = if options.validation {
            self.validate(&ctx_node.root(), symbols).unwrap_or_default()
        } else {
            Vec::new()
        };

        // Per spec §9, no panic may escape this entry point: a built-in's own
        // panic is already caught and converted at the `SymbolTable` call
        // site, but this boundary is the last resort for anything else that
        // might unwind out of the interpreter loop itself.
        let run_result = match catch_unwind(AssertUnwindSafe(|| eval::run(&self.program, &ctx, symbols))) {
            Ok(result) => result,
            Err(payload) => {
                let message = crate::symbol::panic_message(&payload);
                tracing::warn!(source = %self.source, message = %message, "evaluation panicked");
                Err(EvalError::FunctionPanic { name: self.source.clone(), message })
            }
        };
        let debug = trace.map(|cell| cell.into_inner()).unwrap_or_default();
        match run_result {
            Ok(outcome) => EvalResult::ok(outcome.value, warnings, debug),
            Err(error) => EvalResult::err(error, warnings, debug),
        }
    }

    /// Runs the machine and projects a nodeset result to its sequence
    /// of string-values (spec §6's `allowed_values`).
    pub fn allowed_values<N: Node>(
        &self,
        ctx_node: N,
        debug: bool,
        symbols: &SymbolTable<N>,
    ) -> Result<Vec<String>, EvalError> {
        let options = RunOptions {
            debug,
            ..RunOptions::default()
        };
        let result = self.run(ctx_node, options, symbols);
        if let Some(error) = result.error() {
            return Err(error.clone());
        }
        Ok(result
            .nodeset()
            .expect("a path expression's result is always a nodeset")
            .iter()
            .map(Node::string_value)
            .collect())
    }

    /// Dumps the compiled program in the stable debug format (spec §6).
    pub fn print_machine(&self) -> String {
        let mut out = String::from("--- machine start ---\n");
        print_program(&self.program, 0, &mut out);
        out.push_str("---- machine end ----\n");
        out
    }

    /// Resolves every location path embedded in this machine's program
    /// against `schema_root`, producing one [`Warning`] per path plus
    /// an extra `RefNPContainer` warning where a path resolves onto a
    /// non-presence container (spec §4.8).
    pub fn validate<N: Node>(&self, schema_root: &N, symbols: &SymbolTable<N>) -> Result<Vec<Warning>, EvalError> {
        let mut warnings = Vec::new();
        if self.kind == StatementKind::Must {
            if schema_root.is_non_presence_container() {
                warnings.push(self.warning(WarningKind::MustOnNPContainer));
            } else if schema_root
                .children(&yang_xpath_syntax::QName::wildcard(), AccessibleTree::FullTree, crate::node::ChildOrder::Unsorted)
                .iter()
                .any(Node::is_non_presence_container)
            {
                warnings.push(self.warning(WarningKind::MustOnNPContWithNPChild));
            }
        }

        let mut targets = Vec::new();
        collect_path_operands(&self.program, &mut targets);
        for (steps, absolute) in targets {
            let outcome = validate::validate_path(&steps, absolute, schema_root, symbols)?;
            warnings.push(self.warning(outcome.kind));
            if outcome.ref_np_container {
                warnings.push(self.warning(WarningKind::RefNPContainer));
            }
        }
        Ok(warnings)
    }

    fn warning(&self, kind: WarningKind) -> Warning {
        Warning {
            kind,
            originating_path: self.location.clone(),
            statement: self.source.clone(),
            location: self.location.clone(),
            tested_path: self.source.clone(),
            debug_trace: String::new(),
        }
    }
}

/// Walks `program`'s instructions, and recursively every nested
/// predicate program (`Step::predicates`, `Operand::SubMachine`),
/// collecting every compiled location path it finds.
fn collect_path_operands(program: &Program, out: &mut Vec<(Vec<Step>, bool)>) {
    for instruction in program.instructions() {
        match &instruction.operand {
            Operand::Path { steps, absolute } => {
                collect_from_steps(steps, out);
                out.push((steps.clone(), *absolute));
            }
            Operand::PathStore { steps, absolute, .. } => {
                collect_from_steps(steps, out);
                out.push((steps.clone(), *absolute));
            }
            Operand::SubMachine(child) => collect_path_operands(child, out),
            _ => {}
        }
    }
}

fn collect_from_steps(steps: &[Step], out: &mut Vec<(Vec<Step>, bool)>) {
    for step in steps {
        for predicate in &step.predicates {
            collect_path_operands(predicate, out);
        }
    }
}

fn print_program(program: &Program, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for instruction in program.instructions() {
        out.push_str(&indent);
        out.push_str(&format!("{:?}\n", instruction.opcode));
        match &instruction.operand {
            Operand::SubMachine(child) => print_program(child, depth + 1, out),
            Operand::Path { steps, .. } | Operand::PathStore { steps, .. } => {
                for step in steps {
                    for predicate in &step.predicates {
                        print_program(predicate, depth + 1, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Compiles a general-purpose XPath expression with no path-validation
/// diagnostics attached (spec §6's `new_expression_machine`).
pub fn new_expression_machine(
    source: &str,
    functions: Option<&dyn FunctionLookup>,
    prefixes: Option<&dyn PrefixResolver>,
    location: impl Into<String>,
) -> Result<Machine, CompileError> {
    let program = compile_expression(source, functions, prefixes)?;
    Ok(Machine::compile(program, StatementKind::Expression, source, location))
}

/// Compiles a `must` or `when` statement's expression, tagged so that
/// [`Machine::validate`] can resolve its embedded paths against a
/// schema tree.
pub fn new_must_when_machine(
    source: &str,
    is_must: bool,
    functions: Option<&dyn FunctionLookup>,
    prefixes: Option<&dyn PrefixResolver>,
    location: impl Into<String>,
) -> Result<Machine, CompileError> {
    let program = compile_expression(source, functions, prefixes)?;
    let kind = if is_must { StatementKind::Must } else { StatementKind::When };
    Ok(Machine::compile(program, kind, source, location))
}

/// Compiles a `leafref` `path` substatement.
pub fn new_leafref_machine(
    source: &str,
    prefixes: Option<&dyn PrefixResolver>,
    location: impl Into<String>,
) -> Result<Machine, CompileError> {
    let program = compile_leafref(source, prefixes)?;
    Ok(Machine::compile(program, StatementKind::Leafref, source, location))
}

/// Compiles a bare `path` substatement (no `current()`-relative key
/// predicates), used for pattern statements (spec §4.2's path-only
/// grammar).
pub fn new_path_machine(
    source: &str,
    prefixes: Option<&dyn PrefixResolver>,
    location: impl Into<String>,
) -> Result<Machine, CompileError> {
    let program = compile_path(source, prefixes)?;
    Ok(Machine::compile(program, StatementKind::Expression, source, location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;
    use yang_xpath_syntax::FunctionArity;

    struct StubFunctions;
    impl FunctionLookup for StubFunctions {
        fn lookup(&self, name: &str) -> Option<FunctionArity> {
            match name {
                "current" | "true" | "false" => Some(FunctionArity::exact(0)),
                _ => None,
            }
        }
    }

    #[test]
    fn run_evaluates_an_arithmetic_expression() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let machine = new_expression_machine("1 + 2", None, None, "test:1").unwrap();
        let result = machine.run(TestNode::new("root"), RunOptions::default(), &symbols);
        assert_eq!(result.number().unwrap(), 3.0);
    }

    #[test]
    fn print_machine_has_the_stable_banner() {
        let machine = new_expression_machine("1 + 2", None, None, "test:1").unwrap();
        let dump = machine.print_machine();
        assert!(dump.starts_with("--- machine start ---\n"));
        assert!(dump.ends_with("---- machine end ----\n"));
    }

    #[test]
    fn must_on_a_non_presence_container_is_flagged() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = TestNode::new("root");
        let machine = new_must_when_machine("true()", true, Some(&StubFunctions), None, "test:1").unwrap();
        let warnings = machine.validate(&root, &symbols).unwrap();
        assert!(!warnings.iter().any(|w| w.kind == WarningKind::MustOnNPContainer));
    }

    #[test]
    fn leafref_path_validates_against_a_schema_tree() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = TestNode::new("root");
        let iface = TestNode::new("interface");
        root.push_child(iface.clone());
        iface.push_child(TestNode::new("name"));
        let machine = new_leafref_machine("/interface/name", None, "test:1").unwrap();
        let warnings = machine.validate(&root, &symbols).unwrap();
        assert!(warnings.iter().any(|w| w.kind == WarningKind::ValidPath));
    }
}
