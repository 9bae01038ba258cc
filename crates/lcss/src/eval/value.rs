//! Value evaluation: variables, interpolation, arithmetic and calls.
//!
//! Variables are lazy. A definition's value is evaluated each time it is
//! referenced, in the environment of the reference, so a block can redefine a
//! variable that an outer definition refers to.

use std::rc::Rc;

use crate::ast::{Definition, Dimension, Operator, Value};
use crate::env::Environment;
use crate::error::{CompileError, ResolveError, Result, ResultExt};
use crate::eval::Evaluator;
use crate::eval::guard::type_predicate;

impl Evaluator<'_> {
    pub(crate) fn evaluate_value(&mut self, value: &Value, env: &Environment) -> Result<Value> {
        match value {
            Value::Keyword(_) | Value::Dimension(_) | Value::Color(_) => Ok(value.clone()),
            Value::Quoted { text, quote } => Ok(Value::Quoted {
                text: self.interpolate(text, env)?,
                quote: *quote,
            }),
            Value::Url(inner) => Ok(Value::Url(Box::new(self.evaluate_value(inner, env)?))),
            Value::Variable(name) => self.variable_value(name, env),
            Value::Indirect(name) => {
                let target = self.variable_value(name, env)?.unquoted();
                self.variable_value(target.trim_start_matches('@'), env)
            }
            Value::List { items, separator } => {
                let items = items
                    .iter()
                    .map(|item| self.evaluate_value(item, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List {
                    items,
                    separator: *separator,
                })
            }
            Value::Operation { op, lhs, rhs } => {
                let lhs = self.evaluate_value(lhs, env)?;
                let rhs = self.evaluate_value(rhs, env)?;
                if self.options.strict_math && self.paren_depth == 0 && !is_negation(*op, &lhs) {
                    return Ok(Value::Operation {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    });
                }
                self.operate(*op, lhs, rhs)
            }
            Value::Paren(inner) => {
                self.paren_depth += 1;
                let inner = self.evaluate_value(inner, env);
                self.paren_depth -= 1;
                match inner? {
                    literal @ (Value::Dimension(_) | Value::Color(_)) => Ok(literal),
                    other => Ok(Value::Paren(Box::new(other))),
                }
            }
            Value::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate_value(arg, env))
                    .collect::<Result<Vec<_>>>()?;
                self.call(name, args)
            }
        }
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        if name == "default" && args.is_empty() {
            if let Some(default) = self.default_guard {
                return Ok(Value::boolean(default));
            }
        }
        if let Some(result) = type_predicate(name, &args) {
            return Ok(result);
        }
        if let Some(result) = self.functions.call(name, &args) {
            return Ok(result);
        }
        log::trace!("passing through unknown function {name}()");
        Ok(Value::Call {
            name: name.to_string(),
            args,
        })
    }

    /// Value of the nearest definition of `name`.
    pub(crate) fn variable_value(&mut self, name: &str, env: &Environment) -> Result<Value> {
        let definition = env.lookup(name)?;
        self.dereference(&definition, env)
    }

    /// Evaluates a definition, failing if it is already being evaluated
    /// further up the stack.
    pub(crate) fn dereference(&mut self, definition: &Rc<Definition>, env: &Environment) -> Result<Value> {
        if definition.is_evaluating() {
            return Err(
                CompileError::new(ResolveError::CircularReference(definition.name.clone()))
                    .at(definition.span),
            );
        }
        let _evaluating = definition.evaluating.enter();
        let paren_depth = std::mem::take(&mut self.paren_depth);
        let value = self.evaluate_value(&definition.value, env);
        self.paren_depth = paren_depth;
        value.at(definition.span)
    }

    /// Replaces `@{name}` with the unquoted value of `@name`.
    fn interpolate(&mut self, text: &str, env: &Environment) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("@{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            out.push_str(&self.variable_value(&after[..end], env)?.unquoted());
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Applies `op` to evaluated operands. Operands that cannot be combined
    /// are kept as an operation.
    pub(crate) fn operate(&mut self, op: Operator, lhs: Value, rhs: Value) -> Result<Value> {
        let keep = |lhs: Value, rhs: Value| Value::Operation {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };

        match (&lhs, &rhs) {
            (Value::Dimension(a), Value::Dimension(b)) => {
                if op == Operator::Divide && b.value == 0.0 {
                    self.warn(format!("division by zero in `{lhs} / {rhs}`"))?;
                    return Ok(keep(lhs, rhs));
                }
                let unit = if a.unit == b.unit || b.is_unitless() {
                    a.unit.clone()
                } else if a.is_unitless() {
                    b.unit.clone()
                } else {
                    self.warn(format!(
                        "incompatible units {} and {} in `{lhs} {} {rhs}`, keeping {}",
                        a.unit,
                        b.unit,
                        op.symbol(),
                        a.unit
                    ))?;
                    a.unit.clone()
                };
                Ok(Value::Dimension(Dimension::new(apply(op, a.value, b.value), unit)))
            }
            (Value::Color(_), _) | (_, Value::Color(_)) => match (channels(&lhs), channels(&rhs)) {
                (Some(a), Some(b)) => {
                    if op == Operator::Divide && b.contains(&0.0) {
                        self.warn(format!("division by zero in `{lhs} / {rhs}`"))?;
                        return Ok(keep(lhs, rhs));
                    }
                    let mixed = [0, 1, 2].map(|i| apply(op, a[i], b[i]));
                    Ok(Value::Color(format_hex(mixed)))
                }
                _ => Ok(keep(lhs, rhs)),
            },
            _ => Ok(keep(lhs, rhs)),
        }
    }
}

/// Negation parses as `-1 * operand`.
fn is_negation(op: Operator, lhs: &Value) -> bool {
    op == Operator::Multiply
        && matches!(lhs, Value::Dimension(d) if d.is_unitless() && d.value == -1.0)
}

fn apply(op: Operator, a: f64, b: f64) -> f64 {
    match op {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => a / b,
    }
}

/// RGB channels of a `#rgb` / `#rrggbb` color, or of a plain number applied
/// to every channel.
fn channels(value: &Value) -> Option<[f64; 3]> {
    match value {
        Value::Color(hex) => parse_hex(hex),
        Value::Dimension(d) if d.is_unitless() => Some([d.value; 3]),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<[f64; 3]> {
    let digits = hex.strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let mut out = [0.0; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let pair = expanded.get(i * 2..i * 2 + 2)?;
        *slot = f64::from(u8::from_str_radix(pair, 16).ok()?);
    }
    Some(out)
}

fn format_hex(channels: [f64; 3]) -> String {
    let [r, g, b] = channels.map(|c| c.round().clamp(0.0, 255.0) as u8);
    format!("#{r:02x}{g:02x}{b:02x}")
}
