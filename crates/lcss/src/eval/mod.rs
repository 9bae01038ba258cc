//! Stylesheet evaluation.
//!
//! The [`Evaluator`] walks the tree once per compile and produces a flat
//! stylesheet: rulesets with combined selectors and literal declarations,
//! media blocks, directives and pass-through imports.
//!
//! ## Block evaluation
//!
//! Each block gets a [`Frame`]. Its imports are spliced in first, then its
//! mixin calls are expanded (so definitions they export are visible to the
//! whole block), then the remaining rules are evaluated in order:
//!
//! - declarations: value evaluated, collected for the enclosing ruleset
//! - variables: dereferenced, so broken definitions fail even when unused
//! - nested rulesets: selectors combined with the enclosing ones
//! - `@media`: bubbled up to the enclosing output block, wrapping its
//!   declarations in the current selectors
//! - other at-rules: evaluated with no enclosing selectors
//!
//! The root frame is special: interpolated imports found there wait in a
//! queue until the rest of the root is imported (see [`imports`]).

pub mod guard;
pub mod imports;
pub mod value;

use std::collections::VecDeque;
use std::rc::Rc;

use crate::ast::{
    Block, Declaration, Directive, Import, Media, Node, Ruleset, Selector, Span, Stylesheet, Value,
};
use crate::combinator::combine;
use crate::env::{Environment, Frame};
use crate::error::{CompileError, ResolveError, Result, ResultExt, Warning};
use crate::import::Importer;
use crate::options::CompileOptions;
use crate::FunctionLibrary;

/// Where a block is being evaluated.
#[derive(Clone, Debug, Default)]
pub(crate) struct Context {
    /// Effective selectors of the enclosing ruleset; empty at the root.
    pub(crate) selectors: Vec<Selector>,
    /// Combined features of the enclosing `@media` blocks.
    pub(crate) media: Option<Value>,
    /// Set inside `!important` mixin calls.
    pub(crate) important: bool,
}

/// What evaluating one block produced.
#[derive(Debug, Default)]
pub(crate) struct BlockOutput {
    /// Declarations belonging to the enclosing ruleset.
    pub(crate) declarations: Vec<Declaration>,
    /// Rulesets, media blocks, directives and imports, in output order.
    pub(crate) rules: Vec<Node>,
}

impl BlockOutput {
    pub(crate) fn append(&mut self, other: BlockOutput) {
        self.declarations.extend(other.declarations);
        self.rules.extend(other.rules);
    }
}

/// State for one compile.
pub(crate) struct Evaluator<'c> {
    pub(crate) options: &'c CompileOptions,
    pub(crate) functions: &'c dyn FunctionLibrary,
    pub(crate) importer: Importer<'c>,
    pub(crate) warnings: Vec<Warning>,
    /// Open parentheses around the expression being evaluated.
    pub(crate) paren_depth: usize,
    /// Value of `default()` while a guard is being evaluated.
    pub(crate) default_guard: Option<bool>,
    /// Position used for warnings.
    pub(crate) span: Span,
}

impl<'c> Evaluator<'c> {
    pub(crate) fn new(
        options: &'c CompileOptions,
        functions: &'c dyn FunctionLibrary,
        importer: Importer<'c>,
    ) -> Self {
        Self {
            options,
            functions,
            importer,
            warnings: Vec::new(),
            paren_depth: 0,
            default_guard: None,
            span: Span::default(),
        }
    }

    /// Evaluates `stylesheet` into a flat, fully resolved stylesheet.
    pub(crate) fn run(mut self, stylesheet: &Stylesheet) -> Result<(Stylesheet, Vec<Warning>)> {
        match self.evaluate_root(stylesheet) {
            Ok(root) => Ok((
                Stylesheet {
                    path: stylesheet.path.clone(),
                    root,
                },
                self.warnings,
            )),
            Err(mut error) => {
                if error.file.is_none() {
                    error.file = match error.span {
                        Some(span) => self
                            .importer
                            .file_path(span.file)
                            .map(|p| p.to_path_buf())
                            .or_else(|| stylesheet.path.clone()),
                        None => stylesheet.path.clone(),
                    };
                }
                Err(error)
            }
        }
    }

    fn evaluate_root(&mut self, stylesheet: &Stylesheet) -> Result<Block> {
        let root = Frame::from_block(&stylesheet.root);
        let env = Environment::new().with_frame(Rc::clone(&root));

        self.expand_imports(&root, &env, true)?;
        self.replay_deferred(&root)?;
        let output = self.evaluate_block(&env, &Context::default())?;

        let (imports, others): (Vec<Node>, Vec<Node>) = output
            .rules
            .into_iter()
            .partition(|node| matches!(node, Node::Import(_)));
        let mut rules = imports;
        rules.extend(output.declarations.into_iter().map(Node::Declaration));
        rules.extend(others);
        Ok(Block::new(rules))
    }

    /// Evaluates the innermost frame of `env`, whose imports must already be
    /// expanded.
    pub(crate) fn evaluate_block(&mut self, env: &Environment, ctx: &Context) -> Result<BlockOutput> {
        let Some(frame) = env.innermost().cloned() else {
            return Ok(BlockOutput::default());
        };

        let mut expansions = VecDeque::new();
        for (node, nesting) in frame.snapshot_nested() {
            if let Node::MixinCall(call) = node {
                expansions.push_back(self.call_mixin(&call, env, ctx, nesting)?);
            }
        }

        let mut out = BlockOutput::default();
        for (node, nesting) in frame.snapshot_nested() {
            match node {
                Node::MixinCall(_) => {
                    if let Some(expanded) = expansions.pop_front() {
                        out.append(expanded);
                    }
                }
                Node::Declaration(decl) => {
                    self.span = decl.span;
                    let value = self.evaluate_value(&decl.value, env).at(decl.span)?;
                    out.declarations.push(Declaration {
                        property: decl.property,
                        value,
                        important: decl.important || ctx.important,
                        span: decl.span,
                    });
                }
                Node::Variable(def) => {
                    self.span = def.span;
                    self.dereference(&def, env).at(def.span)?;
                }
                Node::MixinDefinition(_) => {}
                Node::Ruleset(ruleset) => {
                    self.evaluate_ruleset(&ruleset, env, ctx, nesting, &mut out)?
                }
                Node::Media(media) => self.evaluate_media(&media, env, ctx, nesting, &mut out)?,
                Node::Directive(directive) => {
                    self.evaluate_directive(&directive, env, ctx, nesting, &mut out)?
                }
                Node::Import(import) => {
                    let path = self.evaluate_value(&import.path, env).at(import.span)?;
                    let media = match &import.media {
                        Some(media) => Some(self.evaluate_value(media, env).at(import.span)?),
                        None => None,
                    };
                    out.rules.push(Node::Import(Import {
                        path,
                        media,
                        ..import
                    }));
                }
            }
        }
        Ok(out)
    }

    /// A fresh frame for `block`, found `nesting` imports deep, pushed onto
    /// `env` with its imports expanded.
    pub(crate) fn enter_block(
        &mut self,
        block: &Block,
        env: &Environment,
        nesting: usize,
    ) -> Result<Environment> {
        let frame = Frame::from_block_at(block, nesting);
        let env = env.with_frame(Rc::clone(&frame));
        self.expand_imports(&frame, &env, false)?;
        Ok(env)
    }

    fn evaluate_ruleset(
        &mut self,
        ruleset: &Rc<Ruleset>,
        env: &Environment,
        ctx: &Context,
        nesting: usize,
        out: &mut BlockOutput,
    ) -> Result<()> {
        let selectors = combine(
            &ctx.selectors,
            &ruleset.selectors,
            self.options.max_selector_expansions,
        )
        .at(ruleset.span)?;
        let label = || selector_label(&ruleset.selectors);

        let inner = self.enter_block(&ruleset.block, env, nesting).within(label)?;
        let ctx = Context {
            selectors,
            ..ctx.clone()
        };
        let body = self.evaluate_block(&inner, &ctx).within(label)?;

        if !body.declarations.is_empty() {
            out.rules.push(ruleset_node(ctx.selectors, body.declarations, ruleset.span));
        }
        out.rules.extend(body.rules);
        Ok(())
    }

    fn evaluate_media(
        &mut self,
        media: &Media,
        env: &Environment,
        ctx: &Context,
        nesting: usize,
        out: &mut BlockOutput,
    ) -> Result<()> {
        let features = self.evaluate_value(&media.features, env).at(media.span)?;
        let features = match &ctx.media {
            Some(outer) => Value::space_list(vec![outer.clone(), Value::keyword("and"), features]),
            None => features,
        };

        let inner = self.enter_block(&media.block, env, nesting)?;
        let inner_ctx = Context {
            media: Some(features.clone()),
            ..ctx.clone()
        };
        let body = self.evaluate_block(&inner, &inner_ctx)?;

        let mut rules = Vec::new();
        if !body.declarations.is_empty() {
            if ctx.selectors.is_empty() {
                rules.extend(body.declarations.into_iter().map(Node::Declaration));
            } else {
                rules.push(ruleset_node(
                    ctx.selectors.clone(),
                    body.declarations,
                    media.span,
                ));
            }
        }
        let (nested, own): (Vec<Node>, Vec<Node>) = body
            .rules
            .into_iter()
            .partition(|node| matches!(node, Node::Media(_)));
        rules.extend(own);

        if !rules.is_empty() {
            out.rules.push(Node::Media(Media {
                features,
                block: Block::new(rules),
                span: media.span,
            }));
        }
        out.rules.extend(nested);
        Ok(())
    }

    fn evaluate_directive(
        &mut self,
        directive: &Directive,
        env: &Environment,
        ctx: &Context,
        nesting: usize,
        out: &mut BlockOutput,
    ) -> Result<()> {
        let prelude = match &directive.prelude {
            Some(prelude) => Some(self.evaluate_value(prelude, env).at(directive.span)?),
            None => None,
        };
        let block = match &directive.block {
            Some(block) => {
                let inner = self.enter_block(block, env, nesting)?;
                let inner_ctx = Context {
                    important: ctx.important,
                    ..Context::default()
                };
                let body = self
                    .evaluate_block(&inner, &inner_ctx)
                    .within(|| format!("@{}", directive.name))?;
                let mut rules: Vec<Node> =
                    body.declarations.into_iter().map(Node::Declaration).collect();
                rules.extend(body.rules);
                Some(Block::new(rules))
            }
            None => None,
        };
        out.rules.push(Node::Directive(Directive {
            name: directive.name.clone(),
            prelude,
            block,
            span: directive.span,
        }));
        Ok(())
    }

    /// Records a warning, or fails when warnings are errors.
    pub(crate) fn warn(&mut self, message: String) -> Result<()> {
        if self.options.warnings_as_errors {
            return Err(CompileError::new(ResolveError::WarningAsError(message)).at(self.span));
        }
        log::warn!("{message} (at {})", self.span);
        self.warnings.push(Warning {
            message,
            span: self.span,
        });
        Ok(())
    }
}

fn ruleset_node(selectors: Vec<Selector>, declarations: Vec<Declaration>, span: Span) -> Node {
    let rules = declarations.into_iter().map(Node::Declaration).collect();
    Node::Ruleset(Rc::new(Ruleset::new(selectors, rules, span)))
}

fn selector_label(selectors: &[Selector]) -> String {
    selectors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
