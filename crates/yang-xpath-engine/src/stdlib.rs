//! The built-in function catalog (spec §4.7). Each function receives
//! already-coerced arguments; argument coercion failures are raised by
//! [`crate::symbol::Symbol::invoke`], never here.

use regex::Regex;

use crate::context::ExecutionContext;
use crate::datum::Datum;
use crate::error::EvalError;
use crate::node::Node;
use crate::symbol::{ArgType, Symbol};

/// The full built-in catalog: every row of spec §4.7.
pub fn catalog<N: Node>() -> Vec<Symbol<N>> {
    vec![
        Symbol::builtin("boolean", vec![ArgType::Any], ArgType::Boolean, boolean),
        Symbol::builtin("ceiling", vec![ArgType::Number], ArgType::Number, ceiling),
        Symbol::builtin("concat", vec![ArgType::Literal, ArgType::Literal], ArgType::Literal, concat),
        Symbol::builtin("contains", vec![ArgType::Literal, ArgType::Literal], ArgType::Boolean, contains),
        Symbol::builtin("re-match", vec![ArgType::Literal, ArgType::Literal], ArgType::Boolean, re_match),
        Symbol::builtin("count", vec![ArgType::Nodeset], ArgType::Number, count),
        Symbol::builtin("current", vec![], ArgType::Nodeset, current),
        Symbol::builtin("false", vec![], ArgType::Boolean, r#false),
        Symbol::builtin("true", vec![], ArgType::Boolean, r#true),
        Symbol::builtin("floor", vec![ArgType::Number], ArgType::Number, floor),
        Symbol::builtin("last", vec![], ArgType::Number, last),
        Symbol::builtin("local-name", vec![ArgType::Nodeset], ArgType::Literal, local_name),
        Symbol::builtin("normalize-space", vec![ArgType::Literal], ArgType::Literal, normalize_space),
        Symbol::builtin("not", vec![ArgType::Boolean], ArgType::Boolean, not),
        Symbol::builtin("number", vec![ArgType::Any], ArgType::Number, number),
        Symbol::builtin("round", vec![ArgType::Number], ArgType::Number, round),
        Symbol::builtin("position", vec![], ArgType::Number, position),
        Symbol::builtin("starts-with", vec![ArgType::Literal, ArgType::Literal], ArgType::Boolean, starts_with),
        Symbol::builtin("string", vec![ArgType::Any], ArgType::Literal, string),
        Symbol::builtin("string-length", vec![ArgType::Literal], ArgType::Number, string_length),
        Symbol::builtin(
            "substring",
            vec![ArgType::Literal, ArgType::Number, ArgType::Number],
            ArgType::Literal,
            substring,
        ),
        Symbol::builtin("substring-after", vec![ArgType::Literal, ArgType::Literal], ArgType::Literal, substring_after),
        Symbol::builtin("substring-before", vec![ArgType::Literal, ArgType::Literal], ArgType::Literal, substring_before),
        Symbol::builtin("sum", vec![ArgType::Nodeset], ArgType::Number, sum),
        Symbol::builtin(
            "translate",
            vec![ArgType::Literal, ArgType::Literal, ArgType::Literal],
            ArgType::Literal,
            translate,
        ),
    ]
}

fn boolean<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Boolean(args[0].to_boolean()?))
}

fn ceiling<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(args[0].to_number()?.ceil()))
}

fn concat<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let a = args[0].to_literal()?;
    let b = args[1].to_literal()?;
    Ok(Datum::Literal(format!("{a}{b}")))
}

fn contains<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let haystack = args[0].to_literal()?;
    let needle = args[1].to_literal()?;
    Ok(Datum::Boolean(haystack.contains(&needle)))
}

fn re_match<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let subject = args[0].to_literal()?;
    let pattern = args[1].to_literal()?;
    let anchored = format!("^(?:{pattern})$");
    let re = Regex::new(&anchored).map_err(|e| EvalError::InvalidPattern {
        name: "re-match".to_string(),
        reason: e.to_string(),
    })?;
    Ok(Datum::Boolean(re.is_match(&subject)))
}

fn count<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(args[0].as_nodeset()?.len() as f64))
}

fn current<N: Node>(ctx: &ExecutionContext<'_, N>, _args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::nodeset([ctx.initial.clone()]))
}

fn r#false<N: Node>(_ctx: &ExecutionContext<'_, N>, _args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Boolean(false))
}

fn r#true<N: Node>(_ctx: &ExecutionContext<'_, N>, _args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Boolean(true))
}

fn floor<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(args[0].to_number()?.floor()))
}

fn last<N: Node>(ctx: &ExecutionContext<'_, N>, _args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(ctx.size as f64))
}

fn local_name<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let nodes = args[0].as_nodeset()?;
    Ok(Datum::Literal(
        nodes.first().map(|n| n.name().local().to_string()).unwrap_or_default(),
    ))
}

fn normalize_space<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let s = args[0].to_literal()?;
    Ok(Datum::Literal(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

fn not<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Boolean(!args[0].to_boolean()?))
}

fn number<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(args[0].to_number()?))
}

fn round<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let n = args[0].to_number()?;
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return Ok(Datum::Number(n));
    }
    Ok(Datum::Number((n.abs() + 0.5).floor() * n.signum()))
}

fn position<N: Node>(ctx: &ExecutionContext<'_, N>, _args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(ctx.position as f64))
}

fn starts_with<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let s = args[0].to_literal()?;
    let prefix = args[1].to_literal()?;
    Ok(Datum::Boolean(s.starts_with(&prefix)))
}

fn string<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Literal(args[0].to_literal()?))
}

fn string_length<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    Ok(Datum::Number(args[0].to_literal()?.chars().count() as f64))
}

fn substring<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let s = args[0].to_literal()?;
    let start = args[1].to_number()?;
    let len = args[2].to_number()?;
    let chars: Vec<char> = s.chars().collect();

    if start.is_nan() || len.is_nan() {
        return Ok(Datum::Literal(String::new()));
    }

    let round_half_away_from_zero = |x: f64| -> f64 {
        if x.is_infinite() {
            return x;
        }
        (x + if x >= 0.0 { 0.5 } else { -0.5 }).trunc()
    };

    let first = round_half_away_from_zero(start);
    let last_index = if len.is_infinite() && len > 0.0 {
        f64::INFINITY
    } else {
        first + round_half_away_from_zero(len)
    };

    let mut out = String::new();
    for (i, ch) in chars.into_iter().enumerate() {
        let pos = (i + 1) as f64;
        if pos >= first && pos < last_index {
            out.push(ch);
        }
    }
    Ok(Datum::Literal(out))
}

fn substring_after<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let s = args[0].to_literal()?;
    let sep = args[1].to_literal()?;
    Ok(Datum::Literal(match s.find(&sep) {
        Some(idx) if !sep.is_empty() => s[idx + sep.len()..].to_string(),
        _ => String::new(),
    }))
}

fn substring_before<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let s = args[0].to_literal()?;
    let sep = args[1].to_literal()?;
    Ok(Datum::Literal(match s.find(&sep) {
        Some(idx) if !sep.is_empty() => s[..idx].to_string(),
        _ => String::new(),
    }))
}

fn sum<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let nodes = args[0].as_nodeset()?;
    let mut total = 0.0;
    for node in nodes {
        let v: f64 = node.string_value().trim().parse().unwrap_or(f64::NAN);
        if v.is_nan() {
            return Ok(Datum::Number(f64::NAN));
        }
        total += v;
    }
    Ok(Datum::Number(total))
}

fn translate<N: Node>(_ctx: &ExecutionContext<'_, N>, args: &[Datum<N>]) -> Result<Datum<N>, EvalError> {
    let s = args[0].to_literal()?;
    let from: Vec<char> = args[1].to_literal()?.chars().collect();
    let to: Vec<char> = args[2].to_literal()?.chars().collect();

    let mut out = String::with_capacity(s.len());
    'outer: for ch in s.chars() {
        for (i, f) in from.iter().enumerate() {
            if *f == ch {
                if let Some(t) = to.get(i) {
                    out.push(*t);
                }
                continue 'outer;
            }
        }
        out.push(ch);
    }
    Ok(Datum::Literal(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::TestNode;

    fn ctx() -> ExecutionContext<'static, TestNode> {
        ExecutionContext::new_for_test(TestNode::new("root"))
    }

    #[test]
    fn substring_basic() {
        let c = ctx();
        let result = substring(&c, &[Datum::Literal("12345".into()), Datum::Number(2.0), Datum::Number(3.0)]).unwrap();
        assert!(matches!(result, Datum::Literal(s) if s == "234"));
    }

    #[test]
    fn substring_partial_overlap() {
        let c = ctx();
        let result = substring(&c, &[Datum::Literal("12345".into()), Datum::Number(1.5), Datum::Number(2.6)]).unwrap();
        assert!(matches!(result, Datum::Literal(s) if s == "234"));
    }

    #[test]
    fn translate_first_occurrence_wins_and_drops_missing_targets() {
        let c = ctx();
        let result = translate(
            &c,
            &[
                Datum::Literal("bar".into()),
                Datum::Literal("abc".into()),
                Datum::Literal("ABC".into()),
            ],
        )
        .unwrap();
        assert!(matches!(result, Datum::Literal(s) if s == "BAr"));
    }

    #[test]
    fn sum_short_circuits_to_nan() {
        let c = ctx();
        let nodes = vec![TestNode::leaf("a", "1"), TestNode::leaf("b", "not-a-number")];
        let result = sum(&c, &[Datum::Nodeset(nodes)]).unwrap();
        assert!(matches!(result, Datum::Number(n) if n.is_nan()));
    }

    #[test]
    fn concat_is_two_arg_only() {
        let c = ctx();
        let result = concat(&c, &[Datum::Literal("foo".into()), Datum::Literal("bar".into())]).unwrap();
        assert!(matches!(result, Datum::Literal(s) if s == "foobar"));
    }

    #[test]
    fn re_match_is_anchored_to_whole_string() {
        let c = ctx();
        let result = re_match(&c, &[Datum::Literal("abc123".into()), Datum::Literal(r"[a-z]+\d+".into())]).unwrap();
        assert!(matches!(result, Datum::Boolean(true)));
        let result = re_match(&c, &[Datum::Literal("abc123x".into()), Datum::Literal(r"[a-z]+\d+".into())]).unwrap();
        assert!(matches!(result, Datum::Boolean(false)));
    }
}
