//! Property and argument values.
//!
//! A [`Value`] read from source may still contain variable references,
//! operations and interpolated strings. Evaluation replaces those with
//! literals; the literal subset renders through [`Display`](std::fmt::Display).

use std::fmt;

/// A number with an optional unit (`10`, `1.5em`, `50%`).
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    pub value: f64,
    pub unit: String,
}

impl Dimension {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn unitless(value: f64) -> Self {
        Self::new(value, "")
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_empty()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value), self.unit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    Space,
    Comma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Bare identifier: `red`, `solid`, `true`.
    Keyword(String),
    Dimension(Dimension),
    /// Hex color kept in source form (`#fff`).
    Color(String),
    /// String literal. `quote` is `None` for escaped `~"..."` strings, which
    /// render without quotes. `@{name}` sequences interpolate on evaluation.
    Quoted { text: String, quote: Option<char> },
    Url(Box<Value>),
    /// `@name`
    Variable(String),
    /// `@@name`: the variable whose name is the value of `@name`.
    Indirect(String),
    List { items: Vec<Value>, separator: Separator },
    Operation {
        op: Operator,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    Paren(Box<Value>),
    Call { name: String, args: Vec<Value> },
}

impl Value {
    pub fn keyword(text: impl Into<String>) -> Self {
        Value::Keyword(text.into())
    }

    pub fn number(value: f64) -> Self {
        Value::Dimension(Dimension::unitless(value))
    }

    pub fn dimension(value: f64, unit: impl Into<String>) -> Self {
        Value::Dimension(Dimension::new(value, unit))
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Value::Quoted {
            text: text.into(),
            quote: Some('"'),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Value::Variable(name.into())
    }

    pub fn space_list(items: Vec<Value>) -> Self {
        Value::List {
            items,
            separator: Separator::Space,
        }
    }

    pub fn comma_list(items: Vec<Value>) -> Self {
        Value::List {
            items,
            separator: Separator::Comma,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Value::Keyword(if value { "true" } else { "false" }.to_string())
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Keyword(k) if k == "true")
    }

    /// Items of a list, or the value itself as a one-element slice.
    pub fn items(&self) -> &[Value] {
        match self {
            Value::List { items, .. } => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Text of a string or keyword without quotes, used by interpolation and
    /// variable-variables.
    pub fn unquoted(&self) -> String {
        match self {
            Value::Quoted { text, .. } => text.clone(),
            other => other.to_string(),
        }
    }

    /// True when the value still needs evaluation.
    pub fn is_unresolved(&self) -> bool {
        match self {
            Value::Variable(_) | Value::Indirect(_) | Value::Operation { .. } => true,
            Value::Quoted { text, .. } => text.contains("@{"),
            Value::Url(inner) | Value::Paren(inner) => inner.is_unresolved(),
            Value::List { items, .. } => items.iter().any(Value::is_unresolved),
            Value::Call { args, .. } => args.iter().any(Value::is_unresolved),
            Value::Keyword(_) | Value::Dimension(_) | Value::Color(_) => false,
        }
    }

    /// Value equality as used by pattern parameters and guard `=`.
    ///
    /// Dimensions compare numerically; a unitless number equals the same
    /// number in any unit. Everything else compares by rendered form, with
    /// colors compared case-insensitively.
    pub fn css_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Dimension(a), Value::Dimension(b)) => {
                a.value == b.value && (a.unit == b.unit || a.is_unitless() || b.is_unitless())
            }
            (Value::Color(a), Value::Color(b)) => a.eq_ignore_ascii_case(b),
            (Value::List { items: a, .. }, Value::List { items: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.css_eq(y))
            }
            (a, b) => a.to_string() == b.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Keyword(k) => write!(f, "{k}"),
            Value::Dimension(d) => write!(f, "{d}"),
            Value::Color(c) => write!(f, "{c}"),
            Value::Quoted { text, quote } => match quote {
                Some(q) => write!(f, "{q}{text}{q}"),
                None => write!(f, "{text}"),
            },
            Value::Url(inner) => write!(f, "url({inner})"),
            Value::Variable(name) => write!(f, "@{name}"),
            Value::Indirect(name) => write!(f, "@@{name}"),
            Value::List { items, separator } => {
                let sep = match separator {
                    Separator::Space => " ",
                    Separator::Comma => ", ",
                };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Operation { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Value::Paren(inner) => write!(f, "({inner})"),
            Value::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Formats a number without trailing zeros (`10`, `1.5`, `0.333333`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.8}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
