//! Guard evaluation.
//!
//! A guard is a list of condition groups. The groups are OR-ed and the
//! conditions inside one group are AND-ed:
//!
//! ```less
//! .m() when (@a > 0) and (@b), (@c) { }   // (a > 0 && b) || c
//! ```
//!
//! A condition without a comparison holds when its value is the keyword
//! `true`. Conditions are evaluated as if parenthesised, so arithmetic inside
//! them runs under strict math.

use crate::ast::{Comparison, Condition, Guard, Value};
use crate::env::Environment;
use crate::error::Result;
use crate::eval::Evaluator;

impl Evaluator<'_> {
    pub(crate) fn evaluate_guard(&mut self, guard: &Guard, env: &Environment) -> Result<bool> {
        for group in &guard.groups {
            let mut holds = true;
            for condition in group {
                if !self.evaluate_condition(condition, env)? {
                    holds = false;
                    break;
                }
            }
            if holds {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn evaluate_condition(&mut self, condition: &Condition, env: &Environment) -> Result<bool> {
        self.paren_depth += 1;
        let holds = self.condition_holds(condition, env);
        self.paren_depth -= 1;
        Ok(holds? != condition.negated)
    }

    fn condition_holds(&mut self, condition: &Condition, env: &Environment) -> Result<bool> {
        let lhs = self.evaluate_value(&condition.lhs, env)?;
        match &condition.comparison {
            None => Ok(lhs.is_true()),
            Some((op, rhs)) => {
                let rhs = self.evaluate_value(rhs, env)?;
                Ok(compare(*op, &lhs, &rhs))
            }
        }
    }

    /// Runs `f` with `default()` evaluating to `value`.
    pub(crate) fn with_default<T>(&mut self, value: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.default_guard.replace(value);
        let result = f(self);
        self.default_guard = saved;
        result
    }
}

/// Numbers with compatible units compare numerically; anything else only
/// supports equality.
pub fn compare(op: Comparison, lhs: &Value, rhs: &Value) -> bool {
    if let (Value::Dimension(a), Value::Dimension(b)) = (lhs, rhs) {
        if a.unit == b.unit || a.is_unitless() || b.is_unitless() {
            return match op {
                Comparison::Eq => a.value == b.value,
                Comparison::Lt => a.value < b.value,
                Comparison::Gt => a.value > b.value,
                Comparison::Le => a.value <= b.value,
                Comparison::Ge => a.value >= b.value,
            };
        }
    }
    match op {
        Comparison::Eq | Comparison::Le | Comparison::Ge => lhs.css_eq(rhs),
        Comparison::Lt | Comparison::Gt => false,
    }
}

/// Whether any condition of `guard` calls `default()`.
pub fn uses_default(guard: &Guard) -> bool {
    guard.groups.iter().flatten().any(|condition| {
        calls_default(&condition.lhs)
            || condition
                .comparison
                .as_ref()
                .is_some_and(|(_, rhs)| calls_default(rhs))
    })
}

fn calls_default(value: &Value) -> bool {
    match value {
        Value::Call { name, args } => name == "default" || args.iter().any(calls_default),
        Value::List { items, .. } => items.iter().any(calls_default),
        Value::Operation { lhs, rhs, .. } => calls_default(lhs) || calls_default(rhs),
        Value::Paren(inner) | Value::Url(inner) => calls_default(inner),
        Value::Keyword(_)
        | Value::Dimension(_)
        | Value::Color(_)
        | Value::Quoted { .. }
        | Value::Variable(_)
        | Value::Indirect(_) => false,
    }
}

/// Built-in type tests: `isnumber(@x)`, `isunit(@x, px)`, ...
///
/// Returns `None` when `name` is not a predicate or the arguments do not
/// fit it.
pub fn type_predicate(name: &str, args: &[Value]) -> Option<Value> {
    let [value, rest @ ..] = args else {
        return None;
    };
    let unit_is = |unit: &str| matches!(value, Value::Dimension(d) if d.unit == unit);
    let result = match (name.to_ascii_lowercase().as_str(), rest) {
        ("isnumber", []) => matches!(value, Value::Dimension(_)),
        ("iscolor", []) => matches!(value, Value::Color(_)),
        ("isstring", []) => matches!(value, Value::Quoted { .. }),
        ("iskeyword", []) => matches!(value, Value::Keyword(_)),
        ("isurl", []) => matches!(value, Value::Url(_)),
        ("ispixel", []) => unit_is("px"),
        ("isem", []) => unit_is("em"),
        ("ispercentage", []) => unit_is("%"),
        ("isunit", [unit]) => unit_is(&unit.unquoted()),
        _ => return None,
    };
    Some(Value::boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_incompatible_units() {
        let px = Value::dimension(2.0, "px");
        let em = Value::dimension(1.0, "em");
        assert!(!compare(Comparison::Gt, &px, &em));
        assert!(!compare(Comparison::Ge, &px, &em));
        assert!(compare(Comparison::Gt, &px, &Value::number(1.0)));
    }

    #[test]
    fn test_compare_keywords_only_equal() {
        let a = Value::keyword("dark");
        assert!(compare(Comparison::Eq, &a, &Value::keyword("dark")));
        assert!(compare(Comparison::Le, &a, &Value::keyword("dark")));
        assert!(!compare(Comparison::Lt, &a, &Value::keyword("light")));
    }

    #[test]
    fn test_type_predicates() {
        let px = Value::dimension(4.0, "px");
        assert_eq!(type_predicate("isnumber", &[px.clone()]), Some(Value::boolean(true)));
        assert_eq!(type_predicate("ispixel", &[px.clone()]), Some(Value::boolean(true)));
        assert_eq!(
            type_predicate("isunit", &[px.clone(), Value::keyword("em")]),
            Some(Value::boolean(false))
        );
        assert_eq!(type_predicate("isstring", &[px.clone()]), Some(Value::boolean(false)));
        assert_eq!(type_predicate("darken", &[px]), None);
        assert_eq!(type_predicate("isnumber", &[]), None);
    }

    #[test]
    fn test_uses_default_finds_nested_call() {
        let default = Value::Call {
            name: "default".into(),
            args: vec![],
        };
        let guard = Guard {
            groups: vec![vec![Condition {
                negated: true,
                lhs: Value::variable("a"),
                comparison: Some((Comparison::Eq, default)),
            }]],
        };
        assert!(uses_default(&guard));
    }
}
