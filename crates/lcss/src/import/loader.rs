//! Where imported stylesheets come from.
//!
//! The importer only talks to a [`Loader`], so stylesheets can be read from
//! disk ([`FsLoader`]) or from memory ([`MemoryLoader`], handy for tests and
//! embedding).

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A normalized absolute path. Distinct references to one file normalize to
/// the same value, so it keys the import cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPath(PathBuf);

impl CanonicalPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Directory containing the file, used to resolve its own imports.
    pub fn parent(&self) -> Option<&Path> {
        self.0.parent()
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

pub trait Loader {
    /// Whether `path` names a loadable file.
    fn exists(&self, path: &Path) -> bool;

    fn normalize(&self, path: &Path) -> io::Result<CanonicalPath>;

    fn load(&self, path: &CanonicalPath) -> io::Result<String>;
}

/// Reads stylesheets from the filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn normalize(&self, path: &Path) -> io::Result<CanonicalPath> {
        std::fs::canonicalize(path).map(CanonicalPath)
    }

    fn load(&self, path: &CanonicalPath) -> io::Result<String> {
        std::fs::read_to_string(path.as_path())
    }
}

/// Serves stylesheets from an in-memory map. Relative paths are taken
/// relative to `/`, and `.` / `..` are resolved lexically.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files
            .insert(normalize_lexically(path.as_ref()), source.into());
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

impl Loader for MemoryLoader {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_lexically(path))
    }

    fn normalize(&self, path: &Path) -> io::Result<CanonicalPath> {
        Ok(CanonicalPath(normalize_lexically(path)))
    }

    fn load(&self, path: &CanonicalPath) -> io::Result<String> {
        self.files.get(path.as_path()).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{path} is not loaded in memory"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_paths_normalize_lexically() {
        let loader = MemoryLoader::new().with_file("styles/a.less", "");
        assert!(loader.exists(Path::new("/styles/./lib/../a.less")));
        assert_eq!(
            loader.normalize(Path::new("styles/x/../a.less")).unwrap(),
            loader.normalize(Path::new("/styles/a.less")).unwrap()
        );
    }

    #[test]
    fn test_fs_loader_canonicalizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.less"), "@a: 1;").unwrap();

        let loader = FsLoader;
        let direct = loader.normalize(&dir.path().join("a.less")).unwrap();
        let dotted = loader.normalize(&dir.path().join("sub/../a.less")).unwrap();
        assert_eq!(direct, dotted);
        assert_eq!(loader.load(&direct).unwrap(), "@a: 1;");
        assert!(!loader.exists(&dir.path().join("missing.less")));
    }
}
