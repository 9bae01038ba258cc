//! Mixin call expansion.
//!
//! A call is resolved in four steps:
//!
//! 1. Candidates: the nearest frame holding a callable that answers to the
//!    call's path, searching outward and then the captured environment.
//!    Namespaced paths (`#ns > .m`) descend into the matching namespaces.
//! 2. Matching: each candidate's parameters are bound to the evaluated
//!    arguments. Failures are remembered for diagnostics.
//! 3. Guards: evaluated against the bound parameters. Guards that call
//!    `default()` are evaluated twice to place the candidate in a default
//!    group; `default()` candidates only expand when no plain candidate does.
//! 4. Expansion: every surviving body is evaluated with the parameters bound
//!    in front of the definition's scope, falling back to the caller's
//!    environment. Variables and mixins the body defines are exported to the
//!    caller's frame.
//!
//! Each expansion holds a slot on the callable's entry counter for its whole
//! duration; exceeding `max_mixin_depth` nested expansions fails.

use std::rc::Rc;

use crate::ast::{Definition, MixinCall, Node, Span, Value};
use crate::env::{Callable, Environment, Frame};
use crate::error::{ResolveError, Result, ResultExt};
use crate::eval::guard::uses_default;
use crate::eval::{BlockOutput, Context, Evaluator};
use crate::mixin::matcher::{self, ARGUMENTS, Argument, ArgumentBinding, Bound, MatchFailure};

/// A callable found for a call, with the scope its body is evaluated in.
#[derive(Debug)]
struct Candidate {
    callable: Callable,
    scope: Environment,
}

/// How a candidate's guard responds to `default()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DefaultGroup {
    /// No guard, or a guard that does not depend on `default()`.
    Plain,
    /// Passes only when `default()` is true.
    WhenDefault,
    /// Passes only when `default()` is false.
    UnlessDefault,
}

/// A candidate whose arguments matched and whose guard can pass.
struct Matched {
    callable: Callable,
    scope: Environment,
    params: Rc<Frame>,
    group: DefaultGroup,
}

impl Evaluator<'_> {
    /// Expands `call` made from the innermost frame of `env`. Bodies are
    /// entered at the call's import `nesting`.
    pub(crate) fn call_mixin(
        &mut self,
        call: &MixinCall,
        env: &Environment,
        ctx: &Context,
        nesting: usize,
    ) -> Result<BlockOutput> {
        self.span = call.span;
        self.resolve_call(call, env, ctx, nesting)
            .at(call.span)
            .within(|| call.to_string())
    }

    fn resolve_call(
        &mut self,
        call: &MixinCall,
        env: &Environment,
        ctx: &Context,
        nesting: usize,
    ) -> Result<BlockOutput> {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(Argument {
                name: arg.name.clone(),
                value: self.evaluate_value(&arg.value, env)?,
            });
        }

        let candidates = find_candidates(env, &call.path);
        if candidates.is_empty() {
            return Err(ResolveError::MixinNotFound(call.path.join(" > ")).into());
        }
        let candidate_count = candidates.len();
        log::debug!("{candidate_count} candidate(s) for {call}");

        let mut failures: Vec<MatchFailure> = Vec::new();
        let mut matched = Vec::new();
        for candidate in candidates {
            let binding = match matcher::bind(candidate.callable.params(), &args) {
                Ok(binding) => binding,
                Err(failure) => {
                    log::trace!("{} rejected: {failure}", candidate.callable.name());
                    failures.push(failure);
                    continue;
                }
            };
            let params = self.parameter_frame(binding, &candidate.scope, env, call.span)?;
            let scope = candidate
                .scope
                .with_frame(Rc::clone(&params))
                .with_captured(env.clone());

            let group = match candidate.callable.guard() {
                None => DefaultGroup::Plain,
                Some(guard) if !uses_default(guard) => {
                    if !self.evaluate_guard(guard, &scope)? {
                        log::trace!("{} guard is false", candidate.callable.name());
                        continue;
                    }
                    DefaultGroup::Plain
                }
                Some(guard) => {
                    let unless = self.with_default(false, |ev| ev.evaluate_guard(guard, &scope))?;
                    let when = self.with_default(true, |ev| ev.evaluate_guard(guard, &scope))?;
                    match (unless, when) {
                        (true, true) => DefaultGroup::Plain,
                        (false, true) => DefaultGroup::WhenDefault,
                        (true, false) => DefaultGroup::UnlessDefault,
                        (false, false) => continue,
                    }
                }
            };
            matched.push(Matched {
                callable: candidate.callable,
                scope,
                params,
                group,
            });
        }

        if matched.is_empty() {
            if let Some(failure) = failures.iter().find(|f| f.is_argument_error()) {
                return Err(ResolveError::ArgumentMismatch {
                    call: call.to_string(),
                    reason: failure.to_string(),
                }
                .into());
            }
            if failures.len() == candidate_count {
                return Err(ResolveError::MixinNotFound(call.to_string()).into());
            }
            log::debug!("every guard for {call} is false, nothing to expand");
            return Ok(BlockOutput::default());
        }

        let default_group = default_group(&matched, call)?;
        let caller = env.innermost().cloned();
        let mut out = BlockOutput::default();
        for candidate in matched
            .into_iter()
            .filter(|m| m.group == DefaultGroup::Plain || m.group == default_group)
        {
            out.append(self.expand(call, candidate, caller.as_ref(), ctx, nesting)?);
        }
        Ok(out)
    }

    /// Evaluates one candidate's body and exports its definitions to
    /// `caller`.
    fn expand(
        &mut self,
        call: &MixinCall,
        candidate: Matched,
        caller: Option<&Rc<Frame>>,
        ctx: &Context,
        nesting: usize,
    ) -> Result<BlockOutput> {
        let Matched {
            callable,
            scope,
            params,
            ..
        } = candidate;

        let entry = callable.entries().enter();
        if entry.depth() > self.options.max_mixin_depth {
            return Err(ResolveError::MixinRecursionLimitExceeded {
                name: callable.name(),
                limit: self.options.max_mixin_depth,
            }
            .into());
        }
        log::debug!("expanding {} (depth {})", callable.name(), entry.depth());

        let body = Frame::from_block_at(callable.block(), nesting);
        let body_env = scope.with_frame(Rc::clone(&body));
        self.expand_imports(&body, &body_env, false)?;

        let inner = Context {
            important: ctx.important || call.important,
            ..ctx.clone()
        };
        let output = self.evaluate_block(&body_env, &inner)?;

        if let Some(caller) = caller {
            let exports = self.exports(&body, &body_env)?;
            caller.prepend_exports(exports, &[params, Rc::clone(&body)], &body);
        }
        drop(entry);
        Ok(output)
    }

    /// A frame with one definition per bound parameter plus `@arguments`.
    /// Defaults are evaluated in parameter order against the definition's
    /// scope and the parameters bound before them.
    fn parameter_frame(
        &mut self,
        binding: ArgumentBinding,
        scope: &Environment,
        caller: &Environment,
        span: Span,
    ) -> Result<Rc<Frame>> {
        let params = Frame::new(Vec::new());
        for (name, bound) in binding.bindings {
            let value = match bound {
                Bound::Supplied(value) => value,
                Bound::Default(default) => {
                    let seen = scope
                        .with_frame(Rc::clone(&params))
                        .with_captured(caller.clone());
                    self.evaluate_value(&default, &seen)?
                }
            };
            params.push(Node::Variable(Rc::new(Definition::new(name, value, span))));
        }
        let arguments = Value::space_list(binding.arguments);
        params.push(Node::Variable(Rc::new(Definition::new(ARGUMENTS, arguments, span))));
        Ok(params)
    }

    /// Variables (with their values fixed) and mixin definitions of an
    /// expanded body.
    fn exports(&mut self, body: &Rc<Frame>, body_env: &Environment) -> Result<Vec<Node>> {
        let mut exports = Vec::new();
        for node in body.snapshot() {
            match node {
                Node::Variable(def) => {
                    let value = self.dereference(&def, body_env)?;
                    exports.push(Node::Variable(Rc::new(Definition::new(
                        def.name.clone(),
                        value,
                        def.span,
                    ))));
                }
                Node::MixinDefinition(_) => exports.push(node),
                _ => {}
            }
        }
        Ok(exports)
    }
}

/// Picks which `default()` group expands alongside the plain candidates.
fn default_group(matched: &[Matched], call: &MixinCall) -> Result<DefaultGroup> {
    if matched.iter().any(|m| m.group == DefaultGroup::Plain) {
        return Ok(DefaultGroup::UnlessDefault);
    }
    let conditional = matched
        .iter()
        .filter(|m| m.group != DefaultGroup::Plain)
        .count();
    if conditional > 1 {
        return Err(ResolveError::ArgumentMismatch {
            call: call.to_string(),
            reason: "ambiguous use of `default()`".to_string(),
        }
        .into());
    }
    Ok(DefaultGroup::WhenDefault)
}

/// Callables answering to `path` in the nearest frame that has any.
fn find_candidates(env: &Environment, path: &[String]) -> Vec<Candidate> {
    for (depth, frame) in env.frames().iter().enumerate().rev() {
        let found = search_frame(frame, path);
        if !found.is_empty() {
            let scope = env.scope_of(depth);
            return found
                .into_iter()
                .map(|(callable, closure)| Candidate {
                    callable,
                    scope: scope.with_frames(closure),
                })
                .collect();
        }
    }
    env.captured()
        .map(|captured| find_candidates(captured, path))
        .unwrap_or_default()
}

/// Callables reached from `frame` by `path`, each with the frames between
/// `frame` and its body: captured closures and enclosing namespaces.
fn search_frame(frame: &Rc<Frame>, path: &[String]) -> Vec<(Callable, Vec<Rc<Frame>>)> {
    let Some((first, rest)) = path.split_first() else {
        return Vec::new();
    };
    let closure_of = |callable: &Callable| match callable {
        Callable::Mixin(mixin) => frame.closure_of(mixin).unwrap_or_default(),
        Callable::Ruleset(_) => Vec::new(),
    };

    let callables = frame.callables(first);
    if rest.is_empty() {
        return callables
            .into_iter()
            .map(|callable| {
                let closure = closure_of(&callable);
                (callable, closure)
            })
            .collect();
    }

    let mut found = Vec::new();
    for namespace in callables.iter().filter(|c| c.is_namespace()) {
        let inner = Frame::from_block(namespace.block());
        for (callable, frames) in search_frame(&inner, rest) {
            let mut closure = closure_of(namespace);
            closure.push(Rc::clone(&inner));
            closure.extend(frames);
            found.push((callable, closure));
        }
    }
    found
}
