// Path resolution anchored at the application directory

use std::path::{Path, PathBuf};

/// Resolves stored button paths against a base directory
///
/// Buttons may store paths relative to the install directory so a soundboard
/// folder can be moved around together with its sounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base: PathBuf,
}

impl PathResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Anchor at the directory of the running executable
    ///
    /// Falls back to the current directory when the executable path is not
    /// available.
    pub fn from_executable() -> Self {
        let base = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute paths are returned unchanged, relative ones are joined to the base
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }

    /// Express `path` relative to the base when it lives underneath it
    pub fn to_relative_if_possible(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match path.strip_prefix(&self.base) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => path.to_path_buf(),
        }
    }

    /// Whether the resolved path points at an existing regular file
    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        !path.as_os_str().is_empty() && self.resolve(path).is_file()
    }
}
