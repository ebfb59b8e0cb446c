//! gamevfs: a case-insensitive virtual filesystem for game assets.
//!
//! This crate provides:
//!
//! - **Resource**: the [`ResourcePool`] contract and [`Resource`] tree handles
//! - **Pools**: host directories, in-memory trees, overlays and a caching wrapper
//! - **Archives**: the `GPAK` format reader, writer and two archive pools
//! - **VirtualFileSystem**: case-insensitive lookup across an ordered pool stack
//! - **Config**: TOML description of a pool stack
//!
//! ```
//! use gamevfs::{InMemoryPool, ResourceType, VirtualFileSystem};
//!
//! let pool = InMemoryPool::new()
//!     .with_file("Textures/Hero.png", b"png")
//!     .unwrap();
//! let vfs = VirtualFileSystem::new().with_pool(pool);
//!
//! assert_eq!(vfs.resource_type("textures\\HERO.PNG"), ResourceType::File);
//! assert_eq!(vfs.list_directory("/"), vec!["textures"]);
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod pool;
pub mod resource;
pub mod vfs;

pub use archive::{ArchiveBuilder, ArchivePool, IndexedArchivePool};
pub use config::{PoolConfig, VfsConfig};
pub use error::{VfsError, VfsResult};
pub use pool::{CachedPool, FilesystemPool, InMemoryPool, OverlayPool, Precedence};
pub use resource::{
    Content, DirEntry, ReadSeek, Resource, ResourcePool, ResourcePoolExt, ResourceType,
};
pub use vfs::VirtualFileSystem;

// ═══════════════════════════════════════════════════════════════════════════
// Path algebra
// ═══════════════════════════════════════════════════════════════════════════

pub use gamevfs_path::{Path, PathContext, PathError, PathKind};
