//! Error types for stylesheet resolution.
//!
//! Every failure is a [`CompileError`]: a typed [`ResolveError`] plus the
//! source position, file and the chain of enclosing rulesets and mixin calls
//! that were being expanded when it happened. Formatting those for humans is
//! left to the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::ast::Span;

/// Copyable tag naming the kind of a [`ResolveError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UndefinedVariable,
    CircularReference,
    MixinNotFound,
    ArgumentMismatch,
    MixinRecursionLimitExceeded,
    SelectorCombination,
    ImportFileNotFound,
    ImportRecursionLimitExceeded,
    InvalidSyntax,
    Io,
    WarningAsError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A variable was referenced but no enclosing scope defines it.
    #[error("variable @{0} is undefined")]
    UndefinedVariable(String),

    /// A variable's value refers back to itself, directly or through others.
    #[error("recursive variable definition for @{0}")]
    CircularReference(String),

    #[error("{0} is undefined")]
    MixinNotFound(String),

    /// Mixins with the called name exist but none accepts the arguments.
    #[error("no matching definition was found for `{call}`: {reason}")]
    ArgumentMismatch { call: String, reason: String },

    #[error("mixin {name} exceeded the recursion limit of {limit}")]
    MixinRecursionLimitExceeded { name: String, limit: usize },

    #[error("cannot combine selectors: {0}")]
    SelectorCombination(String),

    #[error("file '{path}' wasn't found, tried {searched:?}")]
    ImportFileNotFound { path: String, searched: Vec<PathBuf> },

    #[error("import of '{path}' exceeded the import depth limit of {limit}")]
    ImportRecursionLimitExceeded { path: String, limit: usize },

    /// Invalid syntax in a stylesheet read by the front-end.
    #[error("CSS syntax error: {0}")]
    InvalidSyntax(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// A warning raised while `warnings_as_errors` is set.
    #[error("{0}")]
    WarningAsError(String),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::UndefinedVariable(_) => ErrorKind::UndefinedVariable,
            ResolveError::CircularReference(_) => ErrorKind::CircularReference,
            ResolveError::MixinNotFound(_) => ErrorKind::MixinNotFound,
            ResolveError::ArgumentMismatch { .. } => ErrorKind::ArgumentMismatch,
            ResolveError::MixinRecursionLimitExceeded { .. } => {
                ErrorKind::MixinRecursionLimitExceeded
            }
            ResolveError::SelectorCombination(_) => ErrorKind::SelectorCombination,
            ResolveError::ImportFileNotFound { .. } => ErrorKind::ImportFileNotFound,
            ResolveError::ImportRecursionLimitExceeded { .. } => {
                ErrorKind::ImportRecursionLimitExceeded
            }
            ResolveError::InvalidSyntax(_) => ErrorKind::InvalidSyntax,
            ResolveError::Io(_) => ErrorKind::Io,
            ResolveError::WarningAsError(_) => ErrorKind::WarningAsError,
        }
    }
}

/// A [`ResolveError`] with its diagnostic context.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct CompileError {
    #[source]
    pub error: ResolveError,
    pub span: Option<Span>,
    pub file: Option<PathBuf>,
    /// Enclosing rulesets and mixin calls, innermost first.
    pub trail: Vec<String>,
}

impl CompileError {
    pub fn new(error: ResolveError) -> Self {
        Self {
            error,
            span: None,
            file: None,
            trail: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Records where the error happened. The innermost position wins.
    pub fn at(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    /// Appends an enclosing rule or mixin frame to the trail.
    pub fn within(mut self, frame: impl Into<String>) -> Self {
        self.trail.push(frame.into());
        self
    }
}

impl From<ResolveError> for CompileError {
    fn from(error: ResolveError) -> Self {
        Self::new(error)
    }
}

impl From<std::io::Error> for CompileError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ResolveError::Io(error.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// A non-fatal diagnostic, collected for the whole compile.
#[derive(Clone, Debug, PartialEq)]
pub struct Warning {
    pub message: String,
    pub span: Span,
}

/// Adds diagnostic context to a fallible result.
pub(crate) trait ResultExt<T> {
    fn at(self, span: Span) -> Result<T>;

    fn within(self, frame: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E: Into<CompileError>> ResultExt<T> for std::result::Result<T, E> {
    fn at(self, span: Span) -> Result<T> {
        self.map_err(|e| {
            let error: CompileError = e.into();
            error.at(span)
        })
    }

    fn within(self, frame: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| {
            let error: CompileError = e.into();
            error.within(frame())
        })
    }
}
