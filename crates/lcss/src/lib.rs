//! # LCSS - stylesheet resolution engine
//!
//! Resolves a LESS-style stylesheet into a flat tree a CSS renderer can
//! print: variables are dereferenced, mixins expanded, nested selectors
//! combined and imports spliced in.
//!
//! ## Quick Start
//!
//! ```rust
//! use lcss::{CompileOptions, Compiler, MemoryLoader};
//!
//! let loader = MemoryLoader::new().with_file("/theme.less", "@accent: #336699;");
//! let compiler = Compiler::new(CompileOptions::default()).with_loader(loader);
//!
//! let compilation = compiler
//!     .compile_source(
//!         r#"
//!         @import "/theme";
//!         .bordered(@width: 2px) { border-width: @width; }
//!         .card {
//!             color: @accent;
//!             .bordered(4px);
//!             &:hover { color: red; }
//!         }
//!         "#,
//!     )
//!     .unwrap();
//!
//! let rulesets: Vec<_> = compilation.stylesheet.rulesets().collect();
//! assert_eq!(rulesets.len(), 2);
//! assert_eq!(rulesets[0].selectors[0].to_string(), ".card");
//! assert_eq!(rulesets[1].selectors[0].to_string(), ".card:hover");
//! ```
//!
//! ## What Resolution Does
//!
//! - **Variables**: lazy, lexically scoped, with `@@name` indirection and
//!   `@{name}` string interpolation; cycles fail with `CircularReference`
//! - **Mixins**: positional, named, default, pattern and variadic parameters,
//!   `when` guards with `default()`, namespaces, `!important` calls, closures
//!   and a per-mixin recursion limit
//! - **Selectors**: `&` expansion across selector lists
//! - **Imports**: include paths, once/multiple/optional/css/less options,
//!   a per-compile parse cache, a depth limit, and late resolution of
//!   interpolated paths
//! - **Media**: nested `@media` bubbles to the top and joins features
//!
//! Rendering CSS text, source maps and the built-in function library are out
//! of scope; functions are supplied through [`FunctionLibrary`].
//!
//! ## Modules
//!
//! - [`ast`]: syntax tree shared by input and output
//! - [`parser`]: text front-end
//! - [`env`]: scope frames and lookup
//! - [`mixin`]: argument matching
//! - [`combinator`]: selector combination
//! - [`import`]: loaders and the import cache
//! - [`options`] / [`error`]: configuration and failures

pub mod ast;
pub mod combinator;
pub mod env;
pub mod error;
mod eval;
pub mod import;
pub mod mixin;
pub mod options;
pub mod parser;

use std::path::Path;

pub use ast::{FileId, Node, Span, Stylesheet, Value};
pub use error::{CompileError, ErrorKind, ResolveError, Result, Warning};
pub use import::{CanonicalPath, FsLoader, Loader, MemoryLoader};
pub use options::CompileOptions;
pub use parser::parse_stylesheet;

use eval::Evaluator;
use import::Importer;
use parser::parse_stylesheet_in;

/// Built-in value functions (`darken()`, `percentage()`, ...).
///
/// Returning `None` leaves the call in the output with its arguments
/// evaluated.
pub trait FunctionLibrary {
    fn call(&self, name: &str, args: &[Value]) -> Option<Value>;
}

/// A library with no functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFunctions;

impl FunctionLibrary for NoFunctions {
    fn call(&self, _name: &str, _args: &[Value]) -> Option<Value> {
        None
    }
}

/// Result of a successful compile.
#[derive(Clone, Debug, PartialEq)]
pub struct Compilation {
    pub stylesheet: Stylesheet,
    pub warnings: Vec<Warning>,
}

/// Compiles stylesheets with fixed options, loader and function library.
///
/// Every compile gets its own import cache, so a `Compiler` can be reused
/// after files change on disk.
pub struct Compiler {
    options: CompileOptions,
    loader: Box<dyn Loader>,
    functions: Box<dyn FunctionLibrary>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            loader: Box::new(FsLoader),
            functions: Box::new(NoFunctions),
        }
    }

    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_functions(mut self, functions: impl FunctionLibrary + 'static) -> Self {
        self.functions = Box::new(functions);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Resolves a parsed stylesheet. Relative imports resolve against the
    /// directory of `stylesheet.path`, or the include paths when it is unset.
    pub fn compile(&self, stylesheet: &Stylesheet) -> Result<Compilation> {
        let mut importer = Importer::new(self.loader.as_ref(), &self.options);
        if let Some(path) = &stylesheet.path {
            importer.set_main(path);
        }
        let evaluator = Evaluator::new(&self.options, self.functions.as_ref(), importer);
        let (stylesheet, warnings) = evaluator.run(stylesheet)?;
        log::debug!(
            "compiled {} top-level rule(s) with {} warning(s)",
            stylesheet.rules().len(),
            warnings.len()
        );
        Ok(Compilation {
            stylesheet,
            warnings,
        })
    }

    pub fn compile_source(&self, source: &str) -> Result<Compilation> {
        self.compile(&parse_stylesheet(source)?)
    }

    /// Reads, parses and resolves the stylesheet at `path` through the
    /// compiler's loader.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Compilation> {
        let canonical = self.loader.normalize(path.as_ref())?;
        let source = self.loader.load(&canonical)?;
        let path = canonical.into_path_buf();
        let stylesheet =
            parse_stylesheet_in(&source, FileId::MAIN, Some(path.clone())).map_err(|mut e| {
                e.file.get_or_insert(path);
                e
            })?;
        self.compile(&stylesheet)
    }
}
