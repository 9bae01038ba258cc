use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use bitflags::bitflags;

use crate::ast::{Reentry, Selector, Span, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stylesheet {
    pub path: Option<PathBuf>,
    pub root: Block,
}

impl Stylesheet {
    pub fn new(rules: Vec<Node>) -> Self {
        Self {
            path: None,
            root: Block::new(rules),
        }
    }

    pub fn rules(&self) -> &[Node] {
        &self.root.rules
    }

    /// Top-level rulesets, in order.
    pub fn rulesets(&self) -> impl Iterator<Item = &Ruleset> {
        self.root.rules.iter().filter_map(|node| match node {
            Node::Ruleset(ruleset) => Some(ruleset.as_ref()),
            _ => None,
        })
    }
}

/// An ordered rule sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub rules: Vec<Node>,
}

impl Block {
    pub fn new(rules: Vec<Node>) -> Self {
        Self { rules }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.rules.iter().filter_map(|node| match node {
            Node::Declaration(decl) => Some(decl),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Declaration(Declaration),
    Variable(Rc<Definition>),
    Ruleset(Rc<Ruleset>),
    MixinDefinition(Rc<MixinDefinition>),
    MixinCall(MixinCall),
    Import(Import),
    Media(Media),
    Directive(Directive),
}

/// `property: value [!important];`
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: Value,
    pub important: bool,
    pub span: Span,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            value,
            important: false,
            span: Span::default(),
        }
    }
}

/// `@name: value;`
///
/// The value is kept unevaluated and dereferenced lazily. The reentry
/// counter marks a dereference in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub name: String,
    pub value: Value,
    pub span: Span,
    pub(crate) evaluating: Reentry,
}

impl Definition {
    pub fn new(name: impl Into<String>, value: Value, span: Span) -> Self {
        Self {
            name: name.into(),
            value,
            span,
            evaluating: Reentry::default(),
        }
    }

    pub fn is_evaluating(&self) -> bool {
        self.evaluating.is_active()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ruleset {
    pub selectors: Vec<Selector>,
    pub block: Block,
    pub span: Span,
    pub(crate) entries: Reentry,
}

impl Ruleset {
    pub fn new(selectors: Vec<Selector>, rules: Vec<Node>, span: Span) -> Self {
        Self {
            selectors,
            block: Block::new(rules),
            span,
            entries: Reentry::default(),
        }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.block.declarations()
    }

    /// Whether this ruleset can be invoked as a parameterless mixin `name`.
    pub fn answers_to(&self, name: &str) -> bool {
        self.selectors.iter().any(|s| s.mixin_name() == Some(name))
    }
}

/// One formal parameter of a mixin.
#[derive(Clone, Debug, PartialEq)]
pub enum MixinParam {
    /// `@name`
    Positional(String),
    /// `@name: default`
    Named { name: String, default: Value },
    /// A literal that the actual argument must equal.
    Pattern(Value),
    /// `...` or `@rest...`
    Variadic(Option<String>),
}

impl MixinParam {
    pub fn name(&self) -> Option<&str> {
        match self {
            MixinParam::Positional(name) | MixinParam::Named { name, .. } => Some(name),
            MixinParam::Variadic(name) => name.as_deref(),
            MixinParam::Pattern(_) => None,
        }
    }

    /// Positional and pattern parameters must be supplied by every call.
    pub fn is_required(&self) -> bool {
        matches!(self, MixinParam::Positional(_) | MixinParam::Pattern(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Lt => "<",
            Comparison::Gt => ">",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
        }
    }
}

/// `[not] (lhs [op rhs])`
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub negated: bool,
    pub lhs: Value,
    pub comparison: Option<(Comparison, Value)>,
}

/// Comma-separated groups are OR-ed; conditions within a group are AND-ed.
#[derive(Clone, Debug, PartialEq)]
pub struct Guard {
    pub groups: Vec<Vec<Condition>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixinDefinition {
    pub name: String,
    pub params: Vec<MixinParam>,
    pub guard: Option<Guard>,
    pub block: Block,
    pub span: Span,
    pub(crate) entries: Reentry,
}

impl MixinDefinition {
    pub fn new(name: impl Into<String>, params: Vec<MixinParam>, rules: Vec<Node>, span: Span) -> Self {
        Self {
            name: name.into(),
            params,
            guard: None,
            block: Block::new(rules),
            span,
            entries: Reentry::default(),
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn is_variadic(&self) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p, MixinParam::Variadic(_)))
    }

    /// Active expansions of this mixin.
    pub fn entry_count(&self) -> usize {
        self.entries.count()
    }
}

/// An actual argument, optionally named (`@size: 10px`).
#[derive(Clone, Debug, PartialEq)]
pub struct MixinArg {
    pub name: Option<String>,
    pub value: Value,
}

impl MixinArg {
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

/// `.name(args) [!important];`, `#ns > .name();`, `#ns.name;`
#[derive(Clone, Debug, PartialEq)]
pub struct MixinCall {
    /// Namespace segments followed by the mixin name, each with its
    /// leading `.` or `#`.
    pub path: Vec<String>,
    pub args: Vec<MixinArg>,
    pub important: bool,
    pub span: Span,
}

impl fmt::Display for MixinCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join(" > "))?;
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(name) = &arg.name {
                write!(f, "@{name}: ")?;
            }
            write!(f, "{}", arg.value)?;
        }
        f.write_str(")")
    }
}

bitflags! {
    /// Keywords from `@import (once, optional) "file";`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ImportOptions: u8 {
        /// Import the file at most once per compile.
        const ONCE     = 0b0000_0001;
        /// Import the file every time it is referenced.
        const MULTIPLE = 0b0000_0010;
        /// Skip silently when the file cannot be found.
        const OPTIONAL = 0b0000_0100;
        /// Leave the import in the output as plain CSS.
        const CSS      = 0b0000_1000;
        /// Treat the file as a stylesheet whatever its extension.
        const LESS     = 0b0001_0000;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub path: Value,
    pub options: ImportOptions,
    pub media: Option<Value>,
    pub span: Span,
}

impl Import {
    /// Paths that depend on variables cannot be resolved until the enclosing
    /// scope is known.
    pub fn is_interpolated(&self) -> bool {
        self.path.is_unresolved()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Media {
    pub features: Value,
    pub block: Block,
    pub span: Span,
}

/// Any other at-rule: `@charset "utf-8";`, `@font-face { ... }`.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    pub name: String,
    pub prelude: Option<Value>,
    pub block: Option<Block>,
    pub span: Span,
}
