//! The stack machine (spec §4.3): walks a compiled `Program` once,
//! dispatching on each instruction's opcode.

use indexmap::IndexMap;
use yang_xpath_syntax::{Axis, BinaryOp, Instruction, NodeTest, Opcode, Operand, Program, Step};

use crate::context::ExecutionContext;
use crate::datum::Datum;
use crate::error::EvalError;
use crate::node::{self, AccessibleTree, ChildOrder, Node};
use crate::symbol::SymbolTable;

/// The outcome of running a program: its value plus any named slots
/// recorded along the way (`Store`/`StorePathEval`; spec §4.3, §4.5).
pub struct EvalOutcome<N> {
    /// The final value left on the stack.
    pub value: Datum<N>,
    /// Slots recorded by `Store`/`StorePathEval`, in insertion order.
    pub slots: IndexMap<String, Datum<N>>,
}

/// Runs `program` to completion against `ctx`, using `symbols` to
/// resolve function calls.
pub fn run<N: Node>(
    program: &Program,
    ctx: &ExecutionContext<'_, N>,
    symbols: &SymbolTable<N>,
) -> Result<EvalOutcome<N>, EvalError> {
    let mut stack: Vec<Datum<N>> = Vec::new();
    let mut slots: IndexMap<String, Datum<N>> = IndexMap::new();
    exec(program.instructions(), &mut stack, &mut slots, ctx, symbols)?;
    let value = stack.pop().ok_or(EvalError::StackUnderflow)?;
    if !stack.is_empty() {
        return Err(EvalError::MalformedProgram(
            "instructions left extra values on the stack".to_string(),
        ));
    }
    Ok(EvalOutcome { value, slots })
}

fn pop<N: Node>(stack: &mut Vec<Datum<N>>) -> Result<Datum<N>, EvalError> {
    stack.pop().ok_or(EvalError::StackUnderflow)
}

fn exec<N: Node>(
    instructions: &[Instruction],
    stack: &mut Vec<Datum<N>>,
    slots: &mut IndexMap<String, Datum<N>>,
    ctx: &ExecutionContext<'_, N>,
    symbols: &SymbolTable<N>,
) -> Result<(), EvalError> {
    for (index, instr) in instructions.iter().enumerate() {
        ctx.trace(|| format!("{:>3}: {:?}", index, instr.opcode));
        match instr.opcode {
            Opcode::NumPush => {
                let Operand::Number(v) = instr.operand else {
                    return Err(malformed("NumPush without a number operand"));
                };
                stack.push(Datum::Number(v));
            }
            Opcode::BoolPush => {
                let Operand::Boolean(v) = instr.operand else {
                    return Err(malformed("BoolPush without a boolean operand"));
                };
                stack.push(Datum::Boolean(v));
            }
            Opcode::LitPush => {
                let Operand::Literal(ref v) = instr.operand else {
                    return Err(malformed("LitPush without a literal operand"));
                };
                stack.push(Datum::Literal(v.clone()));
            }
            Opcode::Negate => {
                let v = pop(stack)?;
                stack.push(Datum::Number(-v.to_number()?));
            }
            Opcode::Binary => {
                let Operand::Binary(op) = instr.operand else {
                    return Err(malformed("Binary without an operator operand"));
                };
                let rhs = pop(stack)?;
                let lhs = pop(stack)?;
                stack.push(eval_binary(op, lhs, rhs)?);
            }
            Opcode::Bltin => {
                let Operand::Call { ref name, argc } = instr.operand else {
                    return Err(malformed("Bltin without a call operand"));
                };
                if stack.len() < argc {
                    return Err(EvalError::StackUnderflow);
                }
                let args = stack.split_off(stack.len() - argc);
                stack.push(symbols.call(name, ctx, args, true)?);
            }
            Opcode::EvalLocPath | Opcode::EvalLocPathExists | Opcode::StorePathEval => {
                let (steps, absolute, slot): (&[Step], bool, Option<&str>) = match instr.operand {
                    Operand::Path { ref steps, absolute } => (steps, absolute, None),
                    Operand::PathStore { ref steps, absolute, ref slot } => {
                        (steps, absolute, Some(slot.as_str()))
                    }
                    _ => return Err(malformed("path opcode without a path operand")),
                };

                let chained = matches!(
                    instructions.get(index + 1).map(|n| n.opcode),
                    Some(Opcode::FilterExprEnd)
                );
                let start = if chained {
                    let top = pop(stack)?;
                    top.as_nodeset()?.to_vec()
                } else if absolute {
                    vec![ctx.initial.root()]
                } else {
                    vec![ctx.current.clone()]
                };

                let result = run_path(steps, start, ctx, symbols)?;
                let exists = !result.is_empty();
                if let Some(slot) = slot {
                    slots.insert(slot.to_string(), Datum::Boolean(exists));
                }
                match instr.opcode {
                    Opcode::EvalLocPath => stack.push(Datum::Nodeset(result)),
                    Opcode::EvalLocPathExists | Opcode::StorePathEval => {
                        stack.push(Datum::Boolean(exists))
                    }
                    _ => unreachable!(),
                }
            }
            Opcode::FilterExprEnd => {
                let top = stack.last().ok_or(EvalError::StackUnderflow)?;
                let _ = top.as_nodeset()?;
            }
            Opcode::EvalSubMachine => {
                let Operand::SubMachine(ref sub) = instr.operand else {
                    return Err(malformed("EvalSubMachine without a sub-program operand"));
                };
                let input = pop(stack)?.as_nodeset()?.to_vec();
                let filtered = filter_by_predicate(sub, &input, ctx, symbols)?;
                stack.push(Datum::Nodeset(filtered));
            }
            Opcode::Store => {
                let Operand::Slot(ref slot) = instr.operand else {
                    return Err(malformed("Store without a slot operand"));
                };
                let top = stack.last().ok_or(EvalError::StackUnderflow)?.clone();
                slots.insert(slot.clone(), top);
            }
            Opcode::KeyPredicate => {
                let Operand::Key(ref key) = instr.operand else {
                    return Err(malformed("KeyPredicate without a key operand"));
                };
                let rhs = pop(stack)?;
                // The `current()`-rooted case must reduce to a single leaf
                // (spec §4.5); the literal-string extension is already a
                // single value and needs no such check.
                let value = match &rhs {
                    Datum::Nodeset(nodes) => match nodes.as_slice() {
                        [single] => single.string_value(),
                        other => {
                            return Err(EvalError::PathResolution {
                                reason: format!(
                                    "leafref key predicate for `{}` expected the path-key-expr to resolve to exactly one leaf, found {}",
                                    key.local(),
                                    other.len()
                                ),
                            });
                        }
                    },
                    _ => rhs.to_literal()?,
                };
                stack.push(Datum::Boolean(ctx.current.list_key_matches(key, &value)));
            }
        }
    }
    Ok(())
}

fn malformed(message: &str) -> EvalError {
    EvalError::MalformedProgram(message.to_string())
}

/// Runs `sub` once per node in `candidates`, keeping the node if the
/// sub-program's result selects it (a number compares against position,
/// anything else coerces to boolean) — spec §4.3's `EvalSubMachine`.
fn filter_by_predicate<N: Node>(
    sub: &Program,
    candidates: &[N],
    ctx: &ExecutionContext<'_, N>,
    symbols: &SymbolTable<N>,
) -> Result<Vec<N>, EvalError> {
    let size = candidates.len();
    let mut kept = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let position = i + 1;
        let nested_ctx = ctx.with_current(candidate.clone(), position, size);
        let outcome = run(sub, &nested_ctx, symbols)?;
        let selected = match outcome.value {
            Datum::Number(n) => n == position as f64,
            other => other.to_boolean()?,
        };
        if selected {
            kept.push(candidate.clone());
        }
    }
    Ok(kept)
}

/// Evaluates a compiled location path's steps against `start` (spec
/// §4.6): steps apply left to right, the working set is flattened but
/// not deduplicated between steps, and the final set is deduplicated.
pub(crate) fn run_path<N: Node>(
    steps: &[Step],
    start: Vec<N>,
    ctx: &ExecutionContext<'_, N>,
    symbols: &SymbolTable<N>,
) -> Result<Vec<N>, EvalError> {
    let mut working = start;
    for step in steps {
        let mut next = Vec::new();
        for node in &working {
            next.extend(axis_candidates(step.axis, node, ctx.accessible)?);
        }
        next.retain(|n| node_test_matches(&step.test, n));
        for predicate in &step.predicates {
            next = filter_by_predicate(predicate, &next, ctx, symbols)?;
        }
        working = next;
    }
    Ok(node::dedup(working))
}

/// Computes the raw candidate set for one axis step, before node-test
/// filtering and predicates. Axes with no execution semantics in this
/// subset (spec's Non-goals: `//`/descendant beyond recognition, and
/// every axis other than child/parent/self/attribute) are rejected at
/// runtime rather than silently returning nothing.
fn axis_candidates<N: Node>(axis: Axis, node: &N, accessible: AccessibleTree) -> Result<Vec<N>, EvalError> {
    match axis {
        Axis::Child => Ok(node.children(&yang_xpath_syntax::QName::wildcard(), accessible, ChildOrder::Sorted)),
        Axis::Parent => Ok(node.parent().into_iter().collect()),
        Axis::SelfAxis => {
            if node.is_ephemeral() {
                Ok(Vec::new())
            } else {
                Ok(vec![node.clone()])
            }
        }
        Axis::Attribute => Ok(Vec::new()),
        Axis::Descendant | Axis::DescendantOrSelf => Err(EvalError::UnsupportedOperator {
            operator: "// (descendant-or-self)".to_string(),
        }),
        Axis::Ancestor
        | Axis::AncestorOrSelf
        | Axis::Following
        | Axis::FollowingSibling
        | Axis::Namespace
        | Axis::Preceding
        | Axis::PrecedingSibling => Err(EvalError::UnsupportedOperator {
            operator: format!("{axis:?}"),
        }),
    }
}

fn node_test_matches<N: Node>(test: &NodeTest, node: &N) -> bool {
    match test {
        NodeTest::Name(filter) => crate::node::match_filter(filter, &node.name()),
        NodeTest::AnyNode => true,
        // Recognized at parse time (spec's Non-goal: no `text()`
        // execution beyond recognition); never matches at runtime.
        NodeTest::Text | NodeTest::Comment | NodeTest::ProcessingInstruction(_) => false,
    }
}

/// Implements the comparison/arithmetic/logical family (spec §4.4).
fn eval_binary<N: Node>(op: BinaryOp, lhs: Datum<N>, rhs: Datum<N>) -> Result<Datum<N>, EvalError> {
    match op {
        BinaryOp::Add => Ok(Datum::Number(lhs.to_number()? + rhs.to_number()?)),
        BinaryOp::Sub => Ok(Datum::Number(lhs.to_number()? - rhs.to_number()?)),
        BinaryOp::Mul => Ok(Datum::Number(lhs.to_number()? * rhs.to_number()?)),
        BinaryOp::Div => {
            let a = lhs.to_number()?;
            let b = rhs.to_number()?;
            Ok(Datum::Number(if b == 0.0 { f64::INFINITY } else { a / b }))
        }
        BinaryOp::Mod => Ok(Datum::Number(lhs.to_number()? % rhs.to_number()?)),
        BinaryOp::And => Ok(Datum::Boolean(lhs.to_boolean()? && rhs.to_boolean()?)),
        BinaryOp::Or => Ok(Datum::Boolean(lhs.to_boolean()? || rhs.to_boolean()?)),
        BinaryOp::Eq => Ok(Datum::Boolean(compare_equality(&lhs, &rhs, true)?)),
        BinaryOp::Ne => Ok(Datum::Boolean(compare_equality(&lhs, &rhs, false)?)),
        BinaryOp::Lt => Ok(Datum::Boolean(compare_relational(&lhs, &rhs, |a, b| a < b)?)),
        BinaryOp::Le => Ok(Datum::Boolean(compare_relational(&lhs, &rhs, |a, b| a <= b)?)),
        BinaryOp::Gt => Ok(Datum::Boolean(compare_relational(&lhs, &rhs, |a, b| a > b)?)),
        BinaryOp::Ge => Ok(Datum::Boolean(compare_relational(&lhs, &rhs, |a, b| a >= b)?)),
        BinaryOp::Union => {
            let mut nodes = lhs.as_nodeset()?.to_vec();
            nodes.extend(rhs.as_nodeset()?.iter().cloned());
            Ok(Datum::Nodeset(node::dedup(nodes)))
        }
    }
}

/// `=`/`!=` per spec §4.4: nodeset operands compare via an existential
/// cross product, otherwise both sides coerce to the highest-precedence
/// type present (boolean > number > literal). `eq` selects which of
/// `=`/`!=` is being tested; native float comparison already gives NaN
/// the "never equal" behavior the spec calls for, so no special-casing
/// is needed.
fn compare_equality<N: Node>(lhs: &Datum<N>, rhs: &Datum<N>, eq: bool) -> Result<bool, EvalError> {
    match (lhs, rhs) {
        (Datum::Nodeset(a), Datum::Nodeset(b)) => Ok(a.iter().any(|x| {
            b.iter()
                .any(|y| (x.string_value() == y.string_value()) == eq)
        })),
        (Datum::Nodeset(ns), other) | (other, Datum::Nodeset(ns)) => match other {
            Datum::Number(n) => Ok(ns.iter().any(|node| {
                let v: f64 = node.string_value().trim().parse().unwrap_or(f64::NAN);
                (v == *n) == eq
            })),
            Datum::Literal(s) => Ok(ns.iter().any(|node| (&node.string_value() == s) == eq)),
            Datum::Boolean(b) => Ok((!ns.is_empty() == *b) == eq),
            Datum::Invalid => Err(EvalError::Type(crate::datum::DatumError::InvalidCoercion { to: "comparison" })),
            Datum::Nodeset(_) => unreachable!("handled by the nodeset/nodeset arm above"),
        },
        (Datum::Boolean(_), _) | (_, Datum::Boolean(_)) => Ok((lhs.to_boolean()? == rhs.to_boolean()?) == eq),
        (Datum::Number(_), _) | (_, Datum::Number(_)) => {
            let a = lhs.to_number()?;
            let b = rhs.to_number()?;
            Ok((a == b) == eq)
        }
        _ => Ok((lhs.to_literal()? == rhs.to_literal()?) == eq),
    }
}

/// `<`/`<=`/`>`/`>=` per spec §4.4: both sides coerce to number; the
/// nodeset case uses the cross product over string-values converted to
/// number.
fn compare_relational<N: Node>(
    lhs: &Datum<N>,
    rhs: &Datum<N>,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<bool, EvalError> {
    let left_numbers = operand_numbers(lhs)?;
    let right_numbers = operand_numbers(rhs)?;
    Ok(left_numbers
        .iter()
        .any(|a| right_numbers.iter().any(|b| cmp(*a, *b))))
}

fn operand_numbers<N: Node>(datum: &Datum<N>) -> Result<Vec<f64>, EvalError> {
    match datum {
        Datum::Nodeset(nodes) => Ok(nodes
            .iter()
            .map(|n| n.string_value().trim().parse::<f64>().unwrap_or(f64::NAN))
            .collect()),
        other => Ok(vec![other.to_number()?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;
    use yang_xpath_syntax::{compile_expression, compile_path, FunctionArity, FunctionLookup};

    struct StubFunctions;
    impl FunctionLookup for StubFunctions {
        fn lookup(&self, name: &str) -> Option<FunctionArity> {
            match name {
                "true" | "false" | "last" | "position" | "current" => Some(FunctionArity::exact(0)),
                "not" | "string" | "boolean" | "number" | "count" | "string-length" => {
                    Some(FunctionArity::exact(1))
                }
                "concat" | "contains" | "starts-with" | "substring-after" | "substring-before" => {
                    Some(FunctionArity { min: 2, max: 2 })
                }
                "substring" => Some(FunctionArity { min: 2, max: 3 }),
                _ => None,
            }
        }
    }

    fn tree() -> TestNode {
        let root = TestNode::new("root");
        let a = TestNode::new("a");
        root.push_child(a.clone());
        a.push_child(TestNode::leaf("name", "eth0"));
        a.push_child(TestNode::leaf("name", "eth1"));
        root
    }

    #[test]
    fn arithmetic_and_division_by_zero() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let program = compile_expression("1 div 0", Some(&StubFunctions), None).unwrap();
        let ctx = ExecutionContext::new_for_test(TestNode::new("root"));
        let outcome = run(&program, &ctx, &symbols).unwrap();
        assert!(matches!(outcome.value, Datum::Number(n) if n == f64::INFINITY));
    }

    #[test]
    fn equality_coerces_nodeset_against_literal() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = tree();
        let program = compile_expression("a/name = 'eth1'", Some(&StubFunctions), None).unwrap();
        let ctx = ExecutionContext::new_for_test(root);
        let outcome = run(&program, &ctx, &symbols).unwrap();
        assert!(matches!(outcome.value, Datum::Boolean(true)));
    }

    #[test]
    fn absolute_path_resolves_from_root() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = tree();
        let a_child = root.children(&yang_xpath_syntax::QName::wildcard(), AccessibleTree::FullTree, ChildOrder::Sorted)[0].clone();
        let program = compile_path("/a/name", None).unwrap();
        let ctx = ExecutionContext::new_for_test(a_child);
        let outcome = run(&program, &ctx, &symbols).unwrap();
        match outcome.value {
            Datum::Nodeset(nodes) => assert_eq!(nodes.len(), 2),
            other => panic!("expected a nodeset, got {other:?}"),
        }
    }

    #[test]
    fn numeric_predicate_selects_by_position() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = tree();
        let program = compile_path("/a/name", None).unwrap();
        let _ = program;
        let program = compile_expression("/a/name[2]", Some(&StubFunctions), None).unwrap();
        let ctx = ExecutionContext::new_for_test(root);
        let outcome = run(&program, &ctx, &symbols).unwrap();
        match outcome.value {
            Datum::Nodeset(nodes) => {
                assert_eq!(nodes.len(), 1);
                assert_eq!(nodes[0].value().as_deref(), Some("eth1"));
            }
            other => panic!("expected a nodeset, got {other:?}"),
        }
    }

    #[test]
    fn descendant_axis_is_rejected_at_runtime() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = tree();
        let program = compile_expression("//name", Some(&StubFunctions), None).unwrap();
        let ctx = ExecutionContext::new_for_test(root);
        let err = run(&program, &ctx, &symbols).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedOperator { .. }));
    }
}
