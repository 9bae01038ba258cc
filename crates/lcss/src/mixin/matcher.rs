//! Matching one call's arguments against one mixin's parameters.
//!
//! Matching runs in three steps:
//!
//! 1. Arity: the call supplies at least as many arguments as there are
//!    required parameters (positional or pattern) and, unless the mixin is
//!    variadic, no more than it has parameters. Named arguments aimed at
//!    parameters with defaults do not count toward the required total.
//! 2. Assignment: named arguments bind to the parameter with that name,
//!    wherever it sits. Positional arguments then fill the remaining
//!    parameters in order; a variadic parameter takes whatever is left.
//! 3. Patterns: a parameter written as a literal must equal the argument
//!    assigned to it.
//!
//! Arguments are evaluated before matching. Default values are not: they are
//! returned unevaluated, and the resolver evaluates them in parameter order so
//! each one sees the parameters before it but not itself.

use std::fmt;

use crate::ast::{MixinParam, Value};

/// Name of the pseudo-variable listing the call's arguments.
pub const ARGUMENTS: &str = "arguments";

/// An evaluated actual argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Value,
}

impl Argument {
    pub fn positional(value: Value) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// Why a mixin rejected a call.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchFailure {
    TooFewArguments { required: usize, supplied: usize },
    TooManyArguments { allowed: usize, supplied: usize },
    NamedArgumentNotFound(String),
    PatternMismatch { position: usize, expected: Value, actual: Value },
}

impl MatchFailure {
    /// Arity and naming failures are reported when no candidate matches;
    /// pattern mismatches are ordinary overload misses.
    pub fn is_argument_error(&self) -> bool {
        !matches!(self, MatchFailure::PatternMismatch { .. })
    }
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchFailure::TooFewArguments { required, supplied } => write!(
                f,
                "expected at least {required} argument(s), got {supplied}"
            ),
            MatchFailure::TooManyArguments { allowed, supplied } => {
                write!(f, "expected at most {allowed} argument(s), got {supplied}")
            }
            MatchFailure::NamedArgumentNotFound(name) => {
                write!(f, "named argument for @{name} not found")
            }
            MatchFailure::PatternMismatch {
                position,
                expected,
                actual,
            } => write!(
                f,
                "argument {} is `{actual}`, pattern expects `{expected}`",
                position + 1
            ),
        }
    }
}

/// Result of matching: one slot per parameter plus the variadic tail.
#[derive(Clone, Debug, Default, PartialEq)]
struct Assignment {
    slots: Vec<Option<Value>>,
    rest: Vec<Value>,
}

/// Where a parameter's value came from.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    /// Supplied by the call, already evaluated.
    Supplied(Value),
    /// The parameter's default expression, unevaluated.
    Default(Value),
}

impl Bound {
    pub fn value(&self) -> &Value {
        match self {
            Bound::Supplied(value) | Bound::Default(value) => value,
        }
    }
}

/// Parameter name to value, ready to become a scope frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgumentBinding {
    /// In parameter order.
    pub bindings: Vec<(String, Bound)>,
    /// `@arguments`: every actual argument in call order.
    pub arguments: Vec<Value>,
}

impl ArgumentBinding {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, bound)| bound.value())
    }
}

/// Checks whether `args` can call a mixin declared with `params`.
pub fn matches(params: &[MixinParam], args: &[Argument]) -> Result<(), MatchFailure> {
    assign(params, args).map(|_| ())
}

/// Matches and binds `args` to `params`.
pub fn bind(params: &[MixinParam], args: &[Argument]) -> Result<ArgumentBinding, MatchFailure> {
    let assignment = assign(params, args)?;
    let mut binding = ArgumentBinding {
        bindings: Vec::with_capacity(params.len()),
        arguments: args.iter().map(|arg| arg.value.clone()).collect(),
    };

    for (param, slot) in params.iter().zip(assignment.slots) {
        match param {
            MixinParam::Positional(name) => {
                if let Some(value) = slot {
                    binding.bindings.push((name.clone(), Bound::Supplied(value)));
                }
            }
            MixinParam::Named { name, default } => {
                let bound = match slot {
                    Some(value) => Bound::Supplied(value),
                    None => Bound::Default(default.clone()),
                };
                binding.bindings.push((name.clone(), bound));
            }
            MixinParam::Pattern(_) => {}
            MixinParam::Variadic(name) => {
                if let Some(name) = name {
                    let rest = Value::space_list(assignment.rest.clone());
                    binding.bindings.push((name.clone(), Bound::Supplied(rest)));
                }
            }
        }
    }
    Ok(binding)
}

fn assign(params: &[MixinParam], args: &[Argument]) -> Result<Assignment, MatchFailure> {
    let variadic = params.iter().any(|p| matches!(p, MixinParam::Variadic(_)));
    let fixed = params
        .iter()
        .filter(|p| !matches!(p, MixinParam::Variadic(_)))
        .count();
    let required = params.iter().filter(|p| p.is_required()).count();

    let optional_names: Vec<&str> = params
        .iter()
        .filter_map(|p| match p {
            MixinParam::Named { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    let counted = args
        .iter()
        .filter(|a| match &a.name {
            Some(name) => !optional_names.contains(&name.as_str()),
            None => true,
        })
        .count();

    if counted < required {
        return Err(MatchFailure::TooFewArguments {
            required,
            supplied: counted,
        });
    }
    if !variadic && args.len() > fixed {
        return Err(MatchFailure::TooManyArguments {
            allowed: fixed,
            supplied: args.len(),
        });
    }

    let mut assignment = Assignment {
        slots: vec![None; params.len()],
        rest: Vec::new(),
    };

    for arg in args {
        let Some(name) = &arg.name else { continue };
        let position = params
            .iter()
            .position(|p| !matches!(p, MixinParam::Variadic(_)) && p.name() == Some(name))
            .ok_or_else(|| MatchFailure::NamedArgumentNotFound(name.clone()))?;
        assignment.slots[position] = Some(arg.value.clone());
    }

    let mut positional = args.iter().filter(|a| a.name.is_none()).map(|a| &a.value);
    for (i, param) in params.iter().enumerate() {
        if matches!(param, MixinParam::Variadic(_)) {
            assignment.rest.extend(positional.by_ref().cloned());
            break;
        }
        if assignment.slots[i].is_some() {
            continue;
        }
        if let Some(value) = positional.next() {
            assignment.slots[i] = Some(value.clone());
        }
    }
    if positional.next().is_some() {
        return Err(MatchFailure::TooManyArguments {
            allowed: fixed,
            supplied: args.len(),
        });
    }

    for (i, (param, slot)) in params.iter().zip(&assignment.slots).enumerate() {
        match (param, slot) {
            (MixinParam::Pattern(expected), Some(actual)) if !expected.css_eq(actual) => {
                return Err(MatchFailure::PatternMismatch {
                    position: i,
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
            (p, None) if p.is_required() => {
                return Err(MatchFailure::TooFewArguments {
                    required,
                    supplied: assignment.slots.iter().filter(|s| s.is_some()).count(),
                });
            }
            _ => {}
        }
    }

    Ok(assignment)
}
