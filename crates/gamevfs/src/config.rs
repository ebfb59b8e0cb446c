//! TOML configuration describing a pool stack.
//!
//! Loaded from `~/.config/gamevfs/vfs.toml` (or the platform equivalent):
//!
//! ```toml
//! [[pools]]
//! kind = "filesystem"
//! path = "assets"
//! cached = true
//!
//! [[pools]]
//! kind = "archive"
//! path = "data.pak|textures"
//!
//! [[pools]]
//! kind = "overlay"
//! precedence = "first-wins"
//! pools = [ { kind = "filesystem", path = "mods" } ]
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::archive::{ArchivePool, IndexedArchivePool, split_location};
use crate::error::{VfsError, VfsResult};
use crate::pool::{CachedPool, FilesystemPool, OverlayPool, Precedence};
use crate::resource::ResourcePool;
use crate::vfs::VirtualFileSystem;

/// Pools to register, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VfsConfig {
    #[serde(default)]
    pub pools: Vec<PoolConfig>,

    /// Directory relative pool paths resolve against. Set by
    /// [`load_from`](VfsConfig::load_from); the process working directory
    /// otherwise.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One pool of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PoolConfig {
    /// A host directory.
    Filesystem {
        path: PathBuf,
        #[serde(default)]
        cached: bool,
    },
    /// An archive location, `file[|base]`.
    Archive {
        path: String,
        /// Scan the raw table per query instead of building a tree.
        #[serde(default)]
        indexed: bool,
        #[serde(default)]
        cached: bool,
    },
    /// Nested pools merged into one tree.
    Overlay {
        pools: Vec<PoolConfig>,
        #[serde(default)]
        precedence: Precedence,
        #[serde(default)]
        cached: bool,
    },
}

impl VfsConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns an empty configuration.
    pub fn load() -> VfsResult<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VfsError::Config(format!("failed to read config from {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| {
            VfsError::Config(format!("failed to parse config from {}: {e}", path.display()))
        })?;
        // A bare file name has an empty parent, meaning the working directory.
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        config.base_dir = Some(std::path::absolute(dir)?);
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> VfsResult<Self> {
        toml::from_str(text).map_err(|e| VfsError::Config(e.to_string()))
    }

    /// Get the default config file path.
    pub fn config_path() -> VfsResult<PathBuf> {
        let dirs = ProjectDirs::from("", "", "gamevfs")
            .ok_or_else(|| VfsError::Config("could not determine config directory".into()))?;

        Ok(dirs.config_dir().join("vfs.toml"))
    }

    /// Construct every configured pool and register them in order.
    pub fn build(&self) -> VfsResult<VirtualFileSystem> {
        let mut vfs = VirtualFileSystem::new();
        for pool in &self.pools {
            vfs.add_shared_pool(pool.build(self.base_dir.as_deref())?);
        }
        Ok(vfs)
    }
}

impl PoolConfig {
    /// Guess a pool from a bare location: an archive when it names a
    /// `.pak` file or carries an in-archive base, a directory otherwise.
    pub fn from_location(location: &str) -> Self {
        let (file, base) = split_location(location);
        if base.is_some() || file.to_ascii_lowercase().ends_with(".pak") {
            PoolConfig::Archive {
                path: location.to_string(),
                indexed: false,
                cached: false,
            }
        } else {
            PoolConfig::Filesystem {
                path: PathBuf::from(location),
                cached: false,
            }
        }
    }

    /// Whether the pool is wrapped in a [`CachedPool`].
    pub fn cached(&self) -> bool {
        match self {
            PoolConfig::Filesystem { cached, .. }
            | PoolConfig::Archive { cached, .. }
            | PoolConfig::Overlay { cached, .. } => *cached,
        }
    }

    /// Construct the pool, resolving relative host paths against `base_dir`.
    pub fn build(&self, base_dir: Option<&Path>) -> VfsResult<Arc<dyn ResourcePool>> {
        let resolve = |path: &Path| match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };

        let pool: Arc<dyn ResourcePool> = match self {
            PoolConfig::Filesystem { path, .. } => {
                Arc::new(FilesystemPool::new(resolve(path.as_path())))
            }
            PoolConfig::Archive { path, indexed, .. } => {
                let (file, base) = split_location(path);
                let file = resolve(Path::new(file));
                let base = base.unwrap_or("");
                let pool: Arc<dyn ResourcePool> = if *indexed {
                    Arc::new(IndexedArchivePool::open_scoped(file, base)?)
                } else {
                    Arc::new(ArchivePool::open_scoped(file, base)?)
                };
                pool
            }
            PoolConfig::Overlay {
                pools, precedence, ..
            } => {
                let sources = pools
                    .iter()
                    .map(|pool| pool.build(base_dir))
                    .collect::<VfsResult<Vec<_>>>()?;
                Arc::new(OverlayPool::with_precedence(sources, *precedence))
            }
        };

        if self.cached() {
            Ok(Arc::new(CachedPool::from_shared(pool)))
        } else {
            Ok(pool)
        }
    }
}
