//! Stylesheet syntax tree.
//!
//! The tree is a closed set of node kinds that every resolution step matches
//! over exhaustively:
//!
//! - [`Stylesheet`] / [`Block`] / [`Node`]: rule containers
//! - [`Value`]: unevaluated and evaluated property values
//! - [`Selector`] / [`Element`]: selectors as combinator + element pairs
//!
//! Heavy nodes (rulesets, mixin definitions, variable definitions) are shared
//! behind [`Rc`](std::rc::Rc) so cached stylesheets, frames and mixin closures
//! can copy rule lists cheaply. Shared nodes are never mutated in place except
//! through their [`Reentry`] counters.

pub mod selector;
pub mod stylesheet;
pub mod value;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

pub use selector::{Combinator, Element, ElementKind, Selector};
pub use stylesheet::{
    Block, Comparison, Condition, Declaration, Definition, Directive, Guard, Import, ImportOptions,
    Media, MixinArg, MixinCall, MixinDefinition, MixinParam, Node, Ruleset, Stylesheet,
};
pub use value::{Dimension, Operator, Separator, Value};

/// Identifies the source file a node was parsed from.
///
/// `FileId::MAIN` is the stylesheet handed to the compiler; imported files
/// are numbered in the order they are first loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub const MAIN: FileId = FileId(0);
}

/// Source position of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Counts in-flight evaluations of a node.
///
/// Entering returns a [`ReentryGuard`] that decrements the count when dropped,
/// so every exit path, including `?` propagation, releases its slot.
/// Cloning yields a fresh counter and equality ignores the count.
#[derive(Debug, Default)]
pub struct Reentry(Rc<Cell<usize>>);

impl Reentry {
    /// Number of evaluations currently in flight.
    pub fn count(&self) -> usize {
        self.0.get()
    }

    pub fn is_active(&self) -> bool {
        self.count() > 0
    }

    pub(crate) fn enter(&self) -> ReentryGuard {
        self.0.set(self.0.get() + 1);
        ReentryGuard(Rc::clone(&self.0))
    }
}

impl Clone for Reentry {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for Reentry {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Scoped slot taken from a [`Reentry`] counter.
#[derive(Debug)]
pub(crate) struct ReentryGuard(Rc<Cell<usize>>);

impl ReentryGuard {
    /// Count including this guard.
    pub(crate) fn depth(&self) -> usize {
        self.0.get()
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
