//! Compile options.

use std::path::PathBuf;

pub const DEFAULT_MAX_MIXIN_DEPTH: usize = 64;
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 32;
pub const DEFAULT_MAX_SELECTOR_EXPANSIONS: usize = 4096;

/// Options for one compile.
///
/// ```rust
/// use lcss::CompileOptions;
///
/// let options = CompileOptions::default()
///     .with_strict_math(true)
///     .with_include_path("styles/vendor")
///     .with_max_import_depth(8);
/// assert!(options.import_once);
/// ```
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Only evaluate operations inside parentheses.
    pub strict_math: bool,
    /// Fail on the first warning instead of collecting it.
    pub warnings_as_errors: bool,
    /// Directories searched after the importing file's own directory.
    pub include_paths: Vec<PathBuf>,
    /// Import each file once unless an import says `(multiple)`.
    pub import_once: bool,
    /// Concurrent expansions allowed per mixin.
    pub max_mixin_depth: usize,
    /// Nested imports allowed.
    pub max_import_depth: usize,
    /// Selectors one nested ruleset may expand into.
    pub max_selector_expansions: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict_math: false,
            warnings_as_errors: false,
            include_paths: Vec::new(),
            import_once: true,
            max_mixin_depth: DEFAULT_MAX_MIXIN_DEPTH,
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            max_selector_expansions: DEFAULT_MAX_SELECTOR_EXPANSIONS,
        }
    }
}

impl CompileOptions {
    pub fn with_strict_math(mut self, strict: bool) -> Self {
        self.strict_math = strict;
        self
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_import_once(mut self, once: bool) -> Self {
        self.import_once = once;
        self
    }

    pub fn with_max_mixin_depth(mut self, depth: usize) -> Self {
        self.max_mixin_depth = depth;
        self
    }

    pub fn with_max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }

    pub fn with_max_selector_expansions(mut self, limit: usize) -> Self {
        self.max_selector_expansions = limit;
        self
    }
}
