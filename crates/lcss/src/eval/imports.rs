//! Splicing imported files into frames.
//!
//! An `@import` is replaced in place by the rules of the file it names, and
//! the imports among those rules are expanded in turn while the import depth
//! slot of the outer file is held. The spliced rules remember the nesting
//! they were loaded at; imports inside their blocks start from it.
//!
//! ## Deferred imports
//!
//! In the root frame, an import whose path interpolates variables is not
//! expanded on the first pass: the variables may be defined further down, or
//! in a file imported later. Such imports are queued with the index they sit
//! at and replayed once every plain import has been expanded. Replay runs to
//! a fixed point: an import whose variables are still undefined is requeued
//! as long as some other import in the same pass made progress.

use std::rc::Rc;

use crate::ast::{Block, Import, Media, Node, Value};
use crate::env::{Environment, Frame};
use crate::error::{ErrorKind, Result, ResultExt};
use crate::eval::Evaluator;
use crate::import::{DeferredImport, ImportedFile, Opened, shift_locations};

impl Evaluator<'_> {
    /// Expands every import in `frame`. With `defer`, interpolated imports
    /// are queued for [`replay_deferred`](Self::replay_deferred) instead.
    pub(crate) fn expand_imports(
        &mut self,
        frame: &Rc<Frame>,
        env: &Environment,
        defer: bool,
    ) -> Result<()> {
        let end = frame.len();
        let outer = self.importer.set_base_depth(frame.base_nesting());
        let result = self.expand_import_range(frame, env, 0, end, defer);
        self.importer.set_base_depth(outer);
        result.map(|_| ())
    }

    /// Expands the imports in `frame[start..end]`, returning the new end of
    /// the range.
    fn expand_import_range(
        &mut self,
        frame: &Rc<Frame>,
        env: &Environment,
        start: usize,
        mut end: usize,
        defer: bool,
    ) -> Result<usize> {
        let mut at = start;
        while at < end {
            let Some(Node::Import(import)) = frame.rule(at) else {
                at += 1;
                continue;
            };
            if defer && import.is_interpolated() {
                log::debug!("deferring interpolated import `{}`", import.path);
                self.importer.defer(DeferredImport {
                    location: at,
                    scope: env.clone(),
                    depth: self.importer.nesting(),
                });
                at += 1;
                continue;
            }
            let inserted = self.splice_import(frame, env, at, &import, defer)?;
            end = end + inserted - 1;
            at += inserted;
        }
        Ok(end)
    }

    /// Replaces the import at `at` with what it contributes and returns the
    /// number of rules now in its place.
    fn splice_import(
        &mut self,
        frame: &Rc<Frame>,
        env: &Environment,
        at: usize,
        import: &Import,
        defer: bool,
    ) -> Result<usize> {
        let (value, path) = self.import_path(import, env)?;
        match self.importer.open(import, &path).at(import.span)? {
            Opened::PassThrough => {
                let kept = Import {
                    path: value,
                    ..import.clone()
                };
                frame.splice(at, 1, vec![Node::Import(kept)]);
                Ok(1)
            }
            Opened::Skipped => {
                frame.splice(at, 1, Vec::new());
                Ok(0)
            }
            Opened::File(file) => {
                let ImportedFile {
                    rules,
                    path: canonical,
                    _depth: depth,
                } = file;
                let nesting = self.importer.nesting();
                log::debug!("importing {canonical} at depth {nesting}");
                let rules = match &import.media {
                    Some(features) => vec![Node::Media(Media {
                        features: features.clone(),
                        block: Block::new(rules),
                        span: import.span,
                    })],
                    None => rules,
                };
                let count = rules.len();
                frame.splice_at(at, 1, rules, nesting);
                let end = self.expand_import_range(frame, env, at, at + count, defer)?;
                drop(depth);
                Ok(end - at)
            }
        }
    }

    /// The evaluated path value and the text used to resolve it.
    fn import_path(&mut self, import: &Import, env: &Environment) -> Result<(Value, String)> {
        self.span = import.span;
        let value = self.evaluate_value(&import.path, env).at(import.span)?;
        let text = match &value {
            Value::Url(inner) => inner.unquoted(),
            other => other.unquoted(),
        };
        Ok((value, text))
    }

    /// Expands the queued interpolated imports of `root` until none is left.
    ///
    /// Fails with the first undefined-variable error when a whole pass makes
    /// no progress.
    pub(crate) fn replay_deferred(&mut self, root: &Rc<Frame>) -> Result<()> {
        loop {
            let mut pending = self.importer.take_deferred();
            if pending.is_empty() {
                return Ok(());
            }
            log::debug!("replaying {} deferred import(s)", pending.len());

            let mut blocked: Vec<DeferredImport> = Vec::new();
            let mut first_error = None;
            let mut progressed = false;

            while let Some(item) = pending.pop_front() {
                let Some(Node::Import(import)) = root.rule(item.location) else {
                    log::debug!("no import left at {}, dropping", item.location);
                    continue;
                };

                let mut earlier = self.importer.take_deferred();
                let outer = self.importer.set_base_depth(item.depth);
                let result = self.splice_import(root, &item.scope, item.location, &import, true);
                self.importer.set_base_depth(outer);

                match result {
                    Ok(inserted) => {
                        progressed = true;
                        let delta = inserted as isize - 1;
                        shift_locations(
                            pending
                                .iter_mut()
                                .chain(blocked.iter_mut())
                                .chain(earlier.iter_mut()),
                            item.location,
                            delta,
                        );
                        let added = self.importer.take_deferred();
                        for deferred in earlier.into_iter().chain(added) {
                            self.importer.defer(deferred);
                        }
                    }
                    Err(error) if error.kind() == ErrorKind::UndefinedVariable => {
                        log::debug!("deferred import `{}` still blocked: {error}", import.path);
                        for deferred in earlier {
                            self.importer.defer(deferred);
                        }
                        first_error.get_or_insert(error);
                        blocked.push(item);
                    }
                    Err(error) => return Err(error),
                }
            }

            if !progressed {
                if let Some(error) = first_error {
                    return Err(error);
                }
            }
            for item in blocked {
                self.importer.defer(item);
            }
        }
    }
}
