//! Assembles [`Program`]s from the directives a grammar issues while it
//! recognizes a production (spec §4.2).
//!
//! The builder is a small pushdown automaton: emitting a plain directive
//! (push a literal, apply a binary operator, call a function) appends an
//! [`Instruction`] to whichever program is currently open, while
//! `begin_predicate`/`end_predicate` and `begin_path`/`end_path` pairs
//! open and close nested scopes, mirroring how predicates compile to
//! their own [`Program`] run through `EvalSubMachine`.

use crate::error::ParseError;
use crate::instruction::{
    Axis, BinaryOp, Instruction, NodeTest, Opcode, Operand, Program, Step,
};
use crate::qname::QName;

/// A location path under construction: a flat list of completed steps,
/// plus whatever predicates the step currently being built has collected.
#[derive(Debug, Default)]
struct PathScope {
    steps: Vec<Step>,
}

/// Builds a [`Program`] from a stream of directives.
///
/// A single builder instance is shared across an entire compile, since
/// predicates and nested paths recurse back into the same grammar
/// entry points that produced the outer expression.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    /// Stack of in-progress programs; `EvalSubMachine` predicates push a
    /// fresh program here while they compile, then pop it off.
    programs: Vec<Program>,
    /// Stack of in-progress location paths; nested paths inside
    /// predicates push their own scope.
    paths: Vec<PathScope>,
}

impl ProgramBuilder {
    /// Creates a builder with one open top-level program.
    pub fn new() -> Self {
        Self {
            programs: vec![Program::new()],
            paths: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut Program {
        self.programs
            .last_mut()
            .expect("a ProgramBuilder always has at least one open program")
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.current().push(instruction)
    }

    /// Emits `NumPush`.
    pub fn push_number(&mut self, value: f64) -> usize {
        self.emit(Instruction::with_operand(
            Opcode::NumPush,
            Operand::Number(value),
        ))
    }

    /// Emits `BoolPush`.
    pub fn push_bool(&mut self, value: bool) -> usize {
        self.emit(Instruction::with_operand(
            Opcode::BoolPush,
            Operand::Boolean(value),
        ))
    }

    /// Emits `LitPush`.
    pub fn push_literal(&mut self, value: impl Into<String>) -> usize {
        self.emit(Instruction::with_operand(
            Opcode::LitPush,
            Operand::Literal(value.into()),
        ))
    }

    /// Emits `Bltin`, calling `name` with `argc` arguments already pushed.
    pub fn call(&mut self, name: impl Into<String>, argc: usize) -> usize {
        self.emit(Instruction::with_operand(
            Opcode::Bltin,
            Operand::Call {
                name: name.into(),
                argc,
            },
        ))
    }

    /// Emits `Negate`.
    pub fn negate(&mut self) -> usize {
        self.emit(Instruction::bare(Opcode::Negate))
    }

    /// Emits the binary-operator instruction for `op`.
    pub fn binary(&mut self, op: BinaryOp) -> usize {
        self.emit(Instruction::with_operand(Opcode::Binary, Operand::Binary(op)))
    }

    /// Emits `KeyPredicate`, consuming the already-pushed `path-key-expr`
    /// nodeset and comparing it against the current candidate's key
    /// leaf named `key` (spec §4.5's leafref key predicate).
    pub fn key_predicate(&mut self, key: QName) -> usize {
        self.emit(Instruction::with_operand(Opcode::KeyPredicate, Operand::Key(key)))
    }

    /// Emits `FilterExprEnd`.
    pub fn filter_expr_end(&mut self) -> usize {
        self.emit(Instruction::bare(Opcode::FilterExprEnd))
    }

    /// Emits `Store`, recording the top of the value stack into `slot`.
    pub fn store(&mut self, slot: impl Into<String>) -> usize {
        self.emit(Instruction::with_operand(
            Opcode::Store,
            Operand::Slot(slot.into()),
        ))
    }

    /// Opens a new location path scope.
    pub fn begin_path(&mut self) {
        self.paths.push(PathScope::default());
    }

    /// Appends a completed step (axis, node test, and any predicates
    /// already closed via [`Self::end_predicate`]) to the innermost open
    /// path scope.
    pub fn add_step(&mut self, axis: Axis, test: NodeTest, predicates: Vec<Program>) {
        let scope = self
            .paths
            .last_mut()
            .expect("add_step called without an open path scope");
        scope.steps.push(Step {
            axis,
            test,
            predicates,
        });
    }

    /// Closes the innermost path scope and emits `EvalLocPath`, pushing
    /// the resulting nodeset. `absolute` records whether the path was
    /// written with a leading `/` (or `//`), so the engine knows whether
    /// to start from the tree root or the current context node.
    pub fn end_path(&mut self, absolute: bool) -> Result<usize, ParseError> {
        let scope = self.paths.pop().ok_or(ParseError::UnbalancedProgram)?;
        Ok(self.emit(Instruction::with_operand(
            Opcode::EvalLocPath,
            Operand::Path {
                steps: scope.steps,
                absolute,
            },
        )))
    }

    /// Closes the innermost path scope and emits `EvalLocPathExists`,
    /// pushing only whether the path matched anything. See
    /// [`Self::end_path`] for `absolute`.
    pub fn end_path_exists(&mut self, absolute: bool) -> Result<usize, ParseError> {
        let scope = self.paths.pop().ok_or(ParseError::UnbalancedProgram)?;
        Ok(self.emit(Instruction::with_operand(
            Opcode::EvalLocPathExists,
            Operand::Path {
                steps: scope.steps,
                absolute,
            },
        )))
    }

    /// Closes the innermost path scope and emits `StorePathEval`, which
    /// behaves as [`Self::end_path_exists`] but additionally records the
    /// path's existence into `slot` (used by leafref path validation).
    pub fn end_path_store(&mut self, absolute: bool, slot: impl Into<String>) -> Result<usize, ParseError> {
        let scope = self.paths.pop().ok_or(ParseError::UnbalancedProgram)?;
        Ok(self.emit(Instruction::with_operand(
            Opcode::StorePathEval,
            Operand::PathStore {
                steps: scope.steps,
                absolute,
                slot: slot.into(),
            },
        )))
    }

    /// Opens a nested program for a predicate. The grammar recurses into
    /// an expression production, emitting into this new program, then
    /// calls [`Self::end_predicate`] to retrieve it.
    pub fn begin_predicate(&mut self) {
        self.programs.push(Program::new());
    }

    /// Closes the innermost predicate program and returns it, for the
    /// caller to attach to the step being built (via [`Self::add_step`])
    /// or wrap as an `EvalSubMachine` operand directly.
    pub fn end_predicate(&mut self) -> Result<Program, ParseError> {
        if self.programs.len() <= 1 {
            return Err(ParseError::UnbalancedProgram);
        }
        Ok(self.programs.pop().expect("checked non-empty above"))
    }

    /// Emits `EvalSubMachine`, pushing a boolean from running `program`
    /// against the current context item (used for predicates evaluated
    /// inline rather than attached to a step, e.g. leafref predicates).
    pub fn eval_sub_machine(&mut self, program: Program) -> usize {
        self.emit(Instruction::with_operand(
            Opcode::EvalSubMachine,
            Operand::SubMachine(Box::new(program)),
        ))
    }

    /// Finishes the build, returning the completed top-level program.
    ///
    /// Returns [`ParseError::UnbalancedProgram`] if any predicate or path
    /// scope was left open.
    pub fn finish(mut self) -> Result<Program, ParseError> {
        if self.programs.len() != 1 || !self.paths.is_empty() {
            return Err(ParseError::UnbalancedProgram);
        }
        Ok(self.programs.pop().expect("checked length above"))
    }
}
