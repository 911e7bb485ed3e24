//! The evaluator's running state (spec §3's Execution Context record).

use std::cell::RefCell;

use crate::node::{AccessibleTree, Node};

/// The mutable state threaded through one `Machine::run` invocation:
/// the context node and its position/size within the current nodeset,
/// the accessibility filter, and an optional debug trace buffer (spec
/// §6's `print_machine`/debug logging).
pub struct ExecutionContext<'a, N> {
    /// The node the path being evaluated started from.
    pub initial: N,
    /// The node the currently-executing step is being evaluated against.
    pub current: N,
    /// 1-based position of `current` within the nodeset being iterated,
    /// for the `position()` builtin.
    pub position: usize,
    /// Size of the nodeset being iterated, for the `last()` builtin.
    pub size: usize,
    /// Which slice of the tree steps may traverse into.
    pub accessible: AccessibleTree,
    /// Nesting depth: incremented each time a predicate or sub-machine
    /// recurses into a child context.
    pub level: usize,
    /// When set, instructions append a human-readable trace line here
    /// (spec §6, debug logging); borrowed so nested sub-machine runs
    /// share the same buffer.
    pub debug: Option<&'a RefCell<Vec<String>>>,
}

impl<'a, N: Node> ExecutionContext<'a, N> {
    /// Builds a context for evaluating a path or expression rooted at
    /// `node`, with `node` as both the initial and current node and a
    /// singleton nodeset (position 1 of 1).
    pub fn new(node: N, accessible: AccessibleTree, debug: Option<&'a RefCell<Vec<String>>>) -> Self {
        Self {
            initial: node.clone(),
            current: node,
            position: 1,
            size: 1,
            accessible,
            level: 0,
            debug,
        }
    }

    /// Returns a context identical to `self` but with a new current
    /// node and position/size, used when recursing into a predicate or
    /// sub-machine against a different nodeset (spec §4.3,
    /// `EvalSubMachine`).
    pub fn with_current(&self, current: N, position: usize, size: usize) -> ExecutionContext<'a, N> {
        ExecutionContext {
            initial: self.initial.clone(),
            current,
            position,
            size,
            accessible: self.accessible,
            level: self.level + 1,
            debug: self.debug,
        }
    }

    /// Appends `line` to the debug trace, if one is attached.
    pub fn trace(&self, line: impl FnOnce() -> String) {
        if let Some(buf) = self.debug {
            buf.borrow_mut().push(line());
        }
    }
}

#[cfg(test)]
impl<'a, N: Node> ExecutionContext<'a, N> {
    /// A minimal context for unit tests that don't exercise tracing.
    pub fn new_for_test(node: N) -> ExecutionContext<'static, N> {
        ExecutionContext::new(node, AccessibleTree::FullTree, None)
    }
}
