//! Scope frames and name resolution.
//!
//! An [`Environment`] is a stack of [`Frame`]s, outermost first, plus an
//! optional captured environment consulted after the stack is exhausted.
//! Each frame wraps the rules of one block and indexes its variable
//! definitions and callables on first lookup. Splicing rules into a frame
//! (imports, mixin expansion) drops the index so the next lookup rebuilds it.
//!
//! Every rule also records its import nesting: how many imports deep the file
//! it came from was loaded. Blocks nested in that rule are entered at the same
//! nesting, so their own imports count against the import depth limit.
//!
//! ## Lookup order
//!
//! Frames are searched innermost to outermost, then the captured environment.
//! Within a frame the last definition of a name wins, wherever it appears in
//! the block.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Block, Definition, Guard, MixinDefinition, MixinParam, Node, Reentry, Ruleset};
use crate::error::ResolveError;

/// Something a mixin call can expand: a mixin definition, or a ruleset whose
/// selector is a single class or id.
#[derive(Clone, Debug)]
pub enum Callable {
    Mixin(Rc<MixinDefinition>),
    Ruleset(Rc<Ruleset>),
}

impl Callable {
    pub fn answers_to(&self, name: &str) -> bool {
        match self {
            Callable::Mixin(mixin) => mixin.name == name,
            Callable::Ruleset(ruleset) => ruleset.answers_to(name),
        }
    }

    pub fn params(&self) -> &[MixinParam] {
        match self {
            Callable::Mixin(mixin) => &mixin.params,
            Callable::Ruleset(_) => &[],
        }
    }

    pub fn guard(&self) -> Option<&Guard> {
        match self {
            Callable::Mixin(mixin) => mixin.guard.as_ref(),
            Callable::Ruleset(_) => None,
        }
    }

    /// Name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            Callable::Mixin(mixin) => mixin.name.clone(),
            Callable::Ruleset(ruleset) => ruleset
                .selectors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn block(&self) -> &Block {
        match self {
            Callable::Mixin(mixin) => &mixin.block,
            Callable::Ruleset(ruleset) => &ruleset.block,
        }
    }

    pub(crate) fn entries(&self) -> &Reentry {
        match self {
            Callable::Mixin(mixin) => &mixin.entries,
            Callable::Ruleset(ruleset) => &ruleset.entries,
        }
    }

    /// Namespaces are rulesets and parameterless mixins.
    pub fn is_namespace(&self) -> bool {
        match self {
            Callable::Mixin(mixin) => mixin.params.is_empty(),
            Callable::Ruleset(_) => true,
        }
    }
}

#[derive(Debug, Default)]
struct FrameIndex {
    variables: HashMap<String, Rc<Definition>>,
    callables: Vec<Callable>,
}

impl FrameIndex {
    fn build(rules: &[Node]) -> Self {
        let mut index = FrameIndex::default();
        for node in rules {
            match node {
                Node::Variable(def) => {
                    index.variables.insert(def.name.clone(), Rc::clone(def));
                }
                Node::MixinDefinition(mixin) => {
                    index.callables.push(Callable::Mixin(Rc::clone(mixin)));
                }
                Node::Ruleset(ruleset) => {
                    if ruleset.selectors.iter().any(|s| s.mixin_name().is_some()) {
                        index.callables.push(Callable::Ruleset(Rc::clone(ruleset)));
                    }
                }
                Node::Declaration(_)
                | Node::MixinCall(_)
                | Node::Import(_)
                | Node::Media(_)
                | Node::Directive(_) => {}
            }
        }
        index
    }
}

/// One lexical scope: the rules of a block and a lazily built name index.
///
/// Mixin definitions exported into a frame from an expanded mixin body keep
/// the frames of that expansion (its parameters and body) as their closure.
#[derive(Debug, Default)]
pub struct Frame {
    rules: RefCell<Vec<Node>>,
    /// Import nesting of each rule, parallel to `rules`.
    nesting: RefCell<Vec<usize>>,
    /// Import nesting of the block itself.
    base: usize,
    index: RefCell<Option<Rc<FrameIndex>>>,
    revision: Cell<u64>,
    closures: RefCell<Vec<(Rc<MixinDefinition>, Vec<Rc<Frame>>)>>,
}

impl Frame {
    pub fn new(rules: Vec<Node>) -> Rc<Self> {
        Self::nested(rules, 0)
    }

    /// A frame for a block found `nesting` imports deep.
    pub fn nested(rules: Vec<Node>, nesting: usize) -> Rc<Self> {
        Rc::new(Self {
            nesting: RefCell::new(vec![nesting; rules.len()]),
            rules: RefCell::new(rules),
            base: nesting,
            ..Self::default()
        })
    }

    pub fn from_block(block: &Block) -> Rc<Self> {
        Self::new(block.rules.clone())
    }

    pub fn from_block_at(block: &Block, nesting: usize) -> Rc<Self> {
        Self::nested(block.rules.clone(), nesting)
    }

    /// Import nesting of the block this frame wraps.
    pub fn base_nesting(&self) -> usize {
        self.base
    }

    /// Import nesting of the rule at `at`.
    pub fn nesting_at(&self, at: usize) -> usize {
        self.nesting.borrow().get(at).copied().unwrap_or(self.base)
    }

    /// Copy of the current rules, each with its import nesting.
    pub fn snapshot_nested(&self) -> Vec<(Node, usize)> {
        let rules = self.rules.borrow();
        let nesting = self.nesting.borrow();
        rules.iter().cloned().zip(nesting.iter().copied()).collect()
    }

    pub fn rules(&self) -> Ref<'_, Vec<Node>> {
        self.rules.borrow()
    }

    /// Copy of the current rules.
    pub fn snapshot(&self) -> Vec<Node> {
        self.rules.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.rules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.borrow().is_empty()
    }

    pub fn rule(&self, at: usize) -> Option<Node> {
        self.rules.borrow().get(at).cloned()
    }

    /// Number of splices applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// Replaces `remove` rules starting at `at` with `nodes`, which take the
    /// nesting of the first rule they replace.
    pub fn splice(&self, at: usize, remove: usize, nodes: Vec<Node>) {
        let nesting = if remove > 0 {
            self.nesting_at(at)
        } else {
            self.base
        };
        self.splice_at(at, remove, nodes, nesting);
    }

    /// Replaces `remove` rules starting at `at` with `nodes` loaded
    /// `nesting` imports deep.
    pub fn splice_at(&self, at: usize, remove: usize, nodes: Vec<Node>, nesting: usize) {
        {
            let mut rules = self.rules.borrow_mut();
            let mut depths = self.nesting.borrow_mut();
            let end = (at + remove).min(rules.len());
            let start = at.min(end);
            depths.splice(start..end, std::iter::repeat_n(nesting, nodes.len()));
            rules.splice(start..end, nodes);
        }
        self.invalidate();
    }

    pub fn push(&self, node: Node) {
        self.splice(self.len(), 0, vec![node]);
    }

    /// Adds definitions ahead of the block's own rules, so the block's own
    /// definitions of the same names still win.
    pub fn prepend(&self, nodes: Vec<Node>) {
        if !nodes.is_empty() {
            self.splice(0, 0, nodes);
        }
    }

    /// Prepends definitions exported by a mixin expansion whose own frames
    /// are `closure`. Exported mixins that already carry a closure keep it.
    pub fn prepend_exports(&self, nodes: Vec<Node>, closure: &[Rc<Frame>], from: &Frame) {
        {
            let mut closures = self.closures.borrow_mut();
            for node in &nodes {
                if let Node::MixinDefinition(mixin) = node {
                    let frames = from
                        .closure_of(mixin)
                        .unwrap_or_else(|| closure.to_vec());
                    closures.push((Rc::clone(mixin), frames));
                }
            }
        }
        self.prepend(nodes);
    }

    /// Frames captured with an exported mixin definition.
    pub fn closure_of(&self, mixin: &Rc<MixinDefinition>) -> Option<Vec<Rc<Frame>>> {
        self.closures
            .borrow()
            .iter()
            .rev()
            .find(|(m, _)| Rc::ptr_eq(m, mixin))
            .map(|(_, frames)| frames.clone())
    }

    fn invalidate(&self) {
        self.index.borrow_mut().take();
        self.revision.set(self.revision.get() + 1);
    }

    fn index(&self) -> Rc<FrameIndex> {
        if let Some(index) = self.index.borrow().as_ref() {
            return Rc::clone(index);
        }
        let index = Rc::new(FrameIndex::build(&self.rules.borrow()));
        log::trace!(
            "rebuilt frame index: {} variables, {} callables",
            index.variables.len(),
            index.callables.len()
        );
        *self.index.borrow_mut() = Some(Rc::clone(&index));
        index
    }

    pub fn variable(&self, name: &str) -> Option<Rc<Definition>> {
        self.index().variables.get(name).cloned()
    }

    /// Callables answering to `name`, in document order.
    pub fn callables(&self, name: &str) -> Vec<Callable> {
        self.index()
            .callables
            .iter()
            .filter(|c| c.answers_to(name))
            .cloned()
            .collect()
    }
}

/// A stack of frames plus an optional captured environment.
///
/// Cloning is cheap: frames are shared, so a clone is a snapshot of the
/// stack whose frames still observe later splices.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    frames: Vec<Rc<Frame>>,
    captured: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// This environment with `frame` pushed as the innermost scope.
    pub fn with_frame(&self, frame: Rc<Frame>) -> Self {
        let mut env = self.clone();
        env.frames.push(frame);
        env
    }

    /// This environment falling back to `captured` once its own frames are
    /// exhausted.
    pub fn with_captured(mut self, captured: Environment) -> Self {
        self.captured = Some(Rc::new(captured));
        self
    }

    pub fn frames(&self) -> &[Rc<Frame>] {
        &self.frames
    }

    pub fn captured(&self) -> Option<&Environment> {
        self.captured.as_deref()
    }

    pub fn innermost(&self) -> Option<&Rc<Frame>> {
        self.frames.last()
    }

    /// This environment with `frames` pushed in order.
    pub fn with_frames(&self, frames: impl IntoIterator<Item = Rc<Frame>>) -> Self {
        let mut env = self.clone();
        env.frames.extend(frames);
        env
    }

    /// The scope chain seen from the frame at `depth`: frames `0..=depth`
    /// and the same captured environment.
    pub fn scope_of(&self, depth: usize) -> Environment {
        Environment {
            frames: self.frames.iter().take(depth + 1).cloned().collect(),
            captured: self.captured.clone(),
        }
    }

    /// Nearest definition of `name`, if any.
    pub fn resolve(&self, name: &str) -> Option<Rc<Definition>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.variable(name))
            .or_else(|| self.captured.as_ref().and_then(|env| env.resolve(name)))
    }

    pub fn lookup(&self, name: &str) -> Result<Rc<Definition>, ResolveError> {
        self.resolve(name)
            .ok_or_else(|| ResolveError::UndefinedVariable(name.to_string()))
    }
}
