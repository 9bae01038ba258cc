//! Import resolution and caching.
//!
//! The [`Importer`] lives for one compile. It owns:
//!
//! - the canonical path table: `(directory, reference)` to [`CanonicalPath`]
//! - the cache: canonical path to parsed stylesheet, so a file is read and
//!   parsed once however many times it is imported
//! - the set of files already imported, for `(once)` semantics
//! - the import depth counter
//! - the queue of interpolated imports waiting for their variables
//!
//! Callers always receive a copy of the cached rules, never the cached
//! stylesheet itself.
//!
//! ## Resolution order
//!
//! A reference is looked up relative to the directory of the file that
//! contains the `@import`, then relative to each include path in order.
//! A reference without an extension is looked up with `.less` appended.

pub mod loader;

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::ast::{FileId, Import, ImportOptions, Node, Reentry, ReentryGuard, Stylesheet};
use crate::env::Environment;
use crate::error::{CompileError, ResolveError, Result};
use crate::options::CompileOptions;
use crate::parser::parse_stylesheet_in;

pub use loader::{CanonicalPath, FsLoader, Loader, MemoryLoader};

/// An interpolated import waiting for the variables in its path.
///
/// `location` is the import's index among the rules of the root frame;
/// `scope` is the environment its path is evaluated in and `depth` the
/// import nesting it was found at.
#[derive(Clone, Debug)]
pub struct DeferredImport {
    pub location: usize,
    pub scope: Environment,
    pub depth: usize,
}

/// What to do with one `@import`.
#[derive(Debug)]
pub(crate) enum Opened {
    /// Plain CSS import, kept in the output.
    PassThrough,
    /// Already imported under once semantics, or optional and missing.
    Skipped,
    File(ImportedFile),
}

/// Rules of a loaded file. The depth slot is released when this is dropped,
/// so hold it while the file's own imports are expanded.
#[derive(Debug)]
pub(crate) struct ImportedFile {
    pub(crate) rules: Vec<Node>,
    pub(crate) path: CanonicalPath,
    pub(crate) _depth: ReentryGuard,
}

#[derive(Debug)]
struct CacheEntry {
    stylesheet: Stylesheet,
}

pub struct Importer<'l> {
    loader: &'l dyn Loader,
    include_paths: Vec<PathBuf>,
    import_once: bool,
    max_depth: usize,
    depth: Reentry,
    /// Import nesting of the block whose imports are being expanded.
    base_depth: usize,
    cache: HashMap<CanonicalPath, CacheEntry>,
    canonical: HashMap<(Option<PathBuf>, String), CanonicalPath>,
    imported: HashSet<CanonicalPath>,
    files: Vec<Option<CanonicalPath>>,
    deferred: VecDeque<DeferredImport>,
}

impl<'l> Importer<'l> {
    pub fn new(loader: &'l dyn Loader, options: &CompileOptions) -> Self {
        Self {
            loader,
            include_paths: options.include_paths.clone(),
            import_once: options.import_once,
            max_depth: options.max_import_depth,
            depth: Reentry::default(),
            base_depth: 0,
            cache: HashMap::new(),
            canonical: HashMap::new(),
            imported: HashSet::new(),
            files: vec![None],
            deferred: VecDeque::new(),
        }
    }

    /// Registers the main stylesheet's path so relative imports resolve
    /// against its directory and it cannot be re-imported under once
    /// semantics.
    pub fn set_main(&mut self, path: &Path) {
        match self.loader.normalize(path) {
            Ok(canonical) => {
                self.imported.insert(canonical.clone());
                self.files[0] = Some(canonical);
            }
            Err(e) => log::debug!("main stylesheet {} not normalized: {e}", path.display()),
        }
    }

    /// Path of the file a node was parsed from.
    pub fn file_path(&self, file: FileId) -> Option<&Path> {
        self.files
            .get(file.0 as usize)
            .and_then(Option::as_ref)
            .map(CanonicalPath::as_path)
    }

    /// Number of imports currently being expanded.
    pub fn depth(&self) -> usize {
        self.depth.count()
    }

    /// Import nesting of the rules being expanded: the nesting of their block
    /// plus the imports open inside it.
    pub fn nesting(&self) -> usize {
        self.base_depth + self.depth.count()
    }

    /// Sets the nesting new imports start from and returns the previous one.
    pub(crate) fn set_base_depth(&mut self, depth: usize) -> usize {
        std::mem::replace(&mut self.base_depth, depth)
    }

    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }

    /// Whether an import stays in the output as plain CSS.
    pub fn is_pass_through(import: &Import, path: &str) -> bool {
        if import.options.contains(ImportOptions::LESS) {
            return false;
        }
        import.options.contains(ImportOptions::CSS)
            || path.ends_with(".css")
            || path.starts_with("http://")
            || path.starts_with("https://")
            || path.starts_with("//")
    }

    /// Resolves `reference` as seen from `dir`, trying `dir` then each
    /// include path.
    pub fn resolve(
        &mut self,
        reference: &str,
        dir: Option<&Path>,
    ) -> std::result::Result<CanonicalPath, ResolveError> {
        let key = (dir.map(Path::to_path_buf), reference.to_string());
        if let Some(canonical) = self.canonical.get(&key) {
            return Ok(canonical.clone());
        }

        let file_name = if Path::new(reference).extension().is_some() {
            reference.to_string()
        } else {
            format!("{reference}.less")
        };
        let mut searched = Vec::new();
        let roots = dir
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.include_paths.iter().cloned());
        let roots: Vec<PathBuf> = if dir.is_none() {
            std::iter::once(PathBuf::new()).chain(roots).collect()
        } else {
            roots.collect()
        };

        for root in roots {
            let candidate = root.join(&file_name);
            if self.loader.exists(&candidate) {
                let canonical = self
                    .loader
                    .normalize(&candidate)
                    .map_err(|e| ResolveError::Io(e.to_string()))?;
                self.canonical.insert(key, canonical.clone());
                return Ok(canonical);
            }
            searched.push(candidate);
        }

        Err(ResolveError::ImportFileNotFound {
            path: reference.to_string(),
            searched,
        })
    }

    /// Decides what `import` (with its path evaluated to `path`) contributes.
    pub(crate) fn open(&mut self, import: &Import, path: &str) -> Result<Opened> {
        if Self::is_pass_through(import, path) {
            return Ok(Opened::PassThrough);
        }

        let depth = self.depth.enter();
        if self.base_depth + depth.depth() > self.max_depth {
            return Err(ResolveError::ImportRecursionLimitExceeded {
                path: path.to_string(),
                limit: self.max_depth,
            }
            .into());
        }

        let dir = self
            .file_path(import.span.file)
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let canonical = match self.resolve(path, dir.as_deref()) {
            Ok(canonical) => canonical,
            Err(ResolveError::ImportFileNotFound { .. })
                if import.options.contains(ImportOptions::OPTIONAL) =>
            {
                log::debug!("optional import '{path}' not found, skipping");
                return Ok(Opened::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        let once = import.options.contains(ImportOptions::ONCE)
            || (self.import_once && !import.options.contains(ImportOptions::MULTIPLE));
        if once && self.imported.contains(&canonical) {
            log::debug!("{canonical} already imported, skipping");
            return Ok(Opened::Skipped);
        }
        self.imported.insert(canonical.clone());

        let rules = self.load(&canonical)?;
        Ok(Opened::File(ImportedFile {
            rules,
            path: canonical,
            _depth: depth,
        }))
    }

    /// A copy of the rules of `path`, parsing it on first use.
    fn load(&mut self, path: &CanonicalPath) -> Result<Vec<Node>> {
        if let Some(entry) = self.cache.get(path) {
            log::debug!("import cache hit: {path}");
            return Ok(entry.stylesheet.rules().to_vec());
        }

        log::debug!("import cache miss: {path}");
        let source = self
            .loader
            .load(path)
            .map_err(|e| CompileError::new(ResolveError::Io(format!("{path}: {e}"))))?;
        let file = FileId(self.files.len() as u32);
        self.files.push(Some(path.clone()));
        let stylesheet =
            parse_stylesheet_in(&source, file, Some(path.as_path().to_path_buf()))?;
        let rules = stylesheet.rules().to_vec();
        self.cache.insert(path.clone(), CacheEntry { stylesheet });
        Ok(rules)
    }

    pub fn defer(&mut self, import: DeferredImport) {
        self.deferred.push_back(import);
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn take_deferred(&mut self) -> VecDeque<DeferredImport> {
        std::mem::take(&mut self.deferred)
    }
}

/// Moves queued locations past a splice at `at` that changed the rule count
/// by `delta`.
pub fn shift_locations<'a>(
    queue: impl IntoIterator<Item = &'a mut DeferredImport>,
    at: usize,
    delta: isize,
) {
    for item in queue {
        if item.location > at {
            item.location = item.location.saturating_add_signed(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Span, Value};

    fn import(path: &str, options: ImportOptions) -> Import {
        Import {
            path: Value::quoted(path),
            options,
            media: None,
            span: Span::default(),
        }
    }

    #[test]
    fn test_resolve_prefers_importing_directory() {
        let loader = MemoryLoader::new()
            .with_file("/src/a.less", "")
            .with_file("/lib/a.less", "");
        let options = CompileOptions::default().with_include_path("/lib");
        let mut importer = Importer::new(&loader, &options);

        let found = importer.resolve("a", Some(Path::new("/src"))).unwrap();
        assert_eq!(found.as_path(), Path::new("/src/a.less"));
        let found = importer.resolve("a.less", Some(Path::new("/other"))).unwrap();
        assert_eq!(found.as_path(), Path::new("/lib/a.less"));
    }

    #[test]
    fn test_resolve_reports_searched_paths() {
        let loader = MemoryLoader::new();
        let options = CompileOptions::default().with_include_path("/lib");
        let mut importer = Importer::new(&loader, &options);
        let err = importer.resolve("x.less", Some(Path::new("/src"))).unwrap_err();
        assert_eq!(
            err,
            ResolveError::ImportFileNotFound {
                path: "x.less".into(),
                searched: vec![PathBuf::from("/src/x.less"), PathBuf::from("/lib/x.less")],
            }
        );
    }

    #[test]
    fn test_once_skips_second_import() {
        let loader = MemoryLoader::new().with_file("/a.less", "@a: 1;");
        let options = CompileOptions::default();
        let mut importer = Importer::new(&loader, &options);

        let first = importer.open(&import("a.less", ImportOptions::empty()), "a.less");
        assert!(matches!(first, Ok(Opened::File(_))));
        let second = importer.open(&import("a.less", ImportOptions::empty()), "a.less");
        assert!(matches!(second, Ok(Opened::Skipped)));
        let multiple = importer.open(&import("a.less", ImportOptions::MULTIPLE), "a.less");
        assert!(matches!(multiple, Ok(Opened::File(_))));
        assert_eq!(importer.cached_files(), 1);
    }

    #[test]
    fn test_depth_released_on_drop() {
        let loader = MemoryLoader::new().with_file("/a.less", "");
        let options = CompileOptions::default().with_import_once(false);
        let mut importer = Importer::new(&loader, &options);
        {
            let opened = importer.open(&import("a.less", ImportOptions::empty()), "a.less");
            assert!(matches!(opened, Ok(Opened::File(_))));
            assert_eq!(importer.depth(), 1);
        }
        assert_eq!(importer.depth(), 0);
    }

    #[test]
    fn test_base_depth_counts_toward_limit() {
        let loader = MemoryLoader::new().with_file("/a.less", "");
        let options = CompileOptions::default()
            .with_import_once(false)
            .with_max_import_depth(2);
        let mut importer = Importer::new(&loader, &options);
        importer.set_base_depth(2);
        assert_eq!(importer.nesting(), 2);
        let err = importer
            .open(&import("a.less", ImportOptions::empty()), "a.less")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ImportRecursionLimitExceeded);
    }

    #[test]
    fn test_css_imports_pass_through() {
        let css = import("x.css", ImportOptions::empty());
        assert!(Importer::is_pass_through(&css, "x.css"));
        let forced = import("x.css", ImportOptions::LESS);
        assert!(!Importer::is_pass_through(&forced, "x.css"));
        assert!(Importer::is_pass_through(
            &import("x", ImportOptions::empty()),
            "https://fonts.example/x"
        ));
    }

    #[test]
    fn test_shift_locations() {
        let scope = Environment::new();
        let mut queue = vec![
            DeferredImport { location: 1, scope: scope.clone(), depth: 0 },
            DeferredImport { location: 5, scope, depth: 1 },
        ];
        shift_locations(queue.iter_mut(), 3, 2);
        assert_eq!(queue[0].location, 1);
        assert_eq!(queue[1].location, 7);
    }
}
