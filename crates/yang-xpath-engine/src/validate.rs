//! Schema-tree path validation for `must`/`when`/leafref statements
//! (spec §4.8).

use yang_xpath_syntax::{NodeTest, QName, Step};

use crate::context::ExecutionContext;
use crate::error::EvalError;
use crate::eval;
use crate::node::{AccessibleTree, Node};
use crate::result::WarningKind;
use crate::symbol::SymbolTable;

/// The outcome of resolving one compiled path against a schema tree.
pub struct PathValidation {
    /// `ValidPath`, `MissingOrWrongPrefix`, or `DoesntExist`.
    pub kind: WarningKind,
    /// Set when the path resolved to a non-presence container, in
    /// addition to `kind` (spec §4.8: "additionally").
    pub ref_np_container: bool,
}

/// Resolves `steps` against `schema_root` (spec §4.8): a successful
/// resolution is `ValidPath`; a failed one is retried with every step's
/// namespace prefix stripped, yielding `MissingOrWrongPrefix` on success
/// there or `DoesntExist` if both attempts come up empty.
pub fn validate_path<N: Node>(
    steps: &[Step],
    absolute: bool,
    schema_root: &N,
    symbols: &SymbolTable<N>,
) -> Result<PathValidation, EvalError> {
    let ctx = ExecutionContext::new(schema_root.clone(), AccessibleTree::FullTree, None);
    let start = |ctx: &ExecutionContext<'_, N>| {
        if absolute {
            vec![ctx.initial.root()]
        } else {
            vec![ctx.current.clone()]
        }
    };

    let resolved = eval::run_path(steps, start(&ctx), &ctx, symbols)?;
    if !resolved.is_empty() {
        let ref_np_container = resolved.iter().any(Node::is_non_presence_container);
        return Ok(PathValidation {
            kind: WarningKind::ValidPath,
            ref_np_container,
        });
    }

    let stripped = strip_prefixes(steps);
    let retried = eval::run_path(&stripped, start(&ctx), &ctx, symbols)?;
    let kind = if retried.is_empty() {
        WarningKind::DoesntExist
    } else {
        WarningKind::MissingOrWrongPrefix
    };
    Ok(PathValidation {
        kind,
        ref_np_container: false,
    })
}

/// Rebuilds `steps` with every name test's namespace prefix removed,
/// used for the retry pass that distinguishes `MissingOrWrongPrefix`
/// from `DoesntExist`.
fn strip_prefixes(steps: &[Step]) -> Vec<Step> {
    steps
        .iter()
        .map(|step| Step {
            axis: step.axis,
            test: match &step.test {
                NodeTest::Name(q) if q.is_qualified() => NodeTest::Name(QName::unqualified(q.local().to_string())),
                other => other.clone(),
            },
            predicates: step.predicates.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;
    use yang_xpath_syntax::{Axis, QName as Q};

    fn schema() -> TestNode {
        let root = TestNode::new("root");
        let iface = TestNode::new("interface");
        root.push_child(iface.clone());
        iface.push_child(TestNode::new("name"));
        root
    }

    #[test]
    fn a_resolvable_path_is_valid() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = schema();
        let steps = vec![
            Step {
                axis: Axis::Child,
                test: NodeTest::Name(Q::unqualified("interface")),
                predicates: Vec::new(),
            },
            Step {
                axis: Axis::Child,
                test: NodeTest::Name(Q::unqualified("name")),
                predicates: Vec::new(),
            },
        ];
        let outcome = validate_path(&steps, true, &root, &symbols).unwrap();
        assert_eq!(outcome.kind, WarningKind::ValidPath);
    }

    #[test]
    fn a_wrong_prefix_is_distinguished_from_missing() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = schema();
        let steps = vec![Step {
            axis: Axis::Child,
            test: NodeTest::Name(Q::new("urn:wrong", "interface")),
            predicates: Vec::new(),
        }];
        let outcome = validate_path(&steps, true, &root, &symbols).unwrap();
        assert_eq!(outcome.kind, WarningKind::MissingOrWrongPrefix);
    }

    #[test]
    fn a_nonexistent_name_does_not_exist() {
        let symbols = SymbolTable::<TestNode>::with_builtins();
        let root = schema();
        let steps = vec![Step {
            axis: Axis::Child,
            test: NodeTest::Name(Q::unqualified("does-not-exist")),
            predicates: Vec::new(),
        }];
        let outcome = validate_path(&steps, true, &root, &symbols).unwrap();
        assert_eq!(outcome.kind, WarningKind::DoesntExist);
    }
}
