//! Working-directory context for absolutizing relative paths.

use crate::PathError;
use crate::path::Path;

/// The directory relative paths are resolved against.
///
/// Most callers want [`PathContext::process`]. Tests and tools that need
/// deterministic output construct one with [`PathContext::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    cwd: Path,
}

impl PathContext {
    /// Use an explicit working directory. It must be a root or drive path.
    pub fn new(cwd: Path) -> Result<Self, PathError> {
        if cwd.is_relative() {
            return Err(PathError::InvalidOperation(format!(
                "working directory must be absolute: '{}'",
                cwd
            )));
        }
        Ok(Self {
            cwd: cwd.normalize().as_directory(),
        })
    }

    /// Snapshot the process working directory.
    ///
    /// Falls back to `/` when the directory cannot be read or is not valid
    /// UTF-8.
    pub fn process() -> Self {
        std::env::current_dir()
            .ok()
            .and_then(|dir| dir.to_str().map(Path::parse))
            .and_then(|cwd| Self::new(cwd).ok())
            .unwrap_or_else(|| Self {
                cwd: Path::root_path(),
            })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}
