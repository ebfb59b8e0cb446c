//! Concrete resource pools.
//!
//! - [`FilesystemPool`]: a directory on the host filesystem
//! - [`InMemoryPool`]: a tree built programmatically
//! - [`OverlayPool`]: several pools merged into one tree
//! - [`CachedPool`]: memoizing wrapper around another pool
//!
//! Archive-backed pools live in [`crate::archive`].

mod cached;
mod filesystem;
mod memory;
mod overlay;

pub use cached::CachedPool;
pub use filesystem::FilesystemPool;
pub use memory::InMemoryPool;
pub use overlay::{OverlayPool, Precedence};

use gamevfs_path::{Path, fold_case};

/// Normalize a pool-relative argument.
///
/// `None` for absolute paths and for paths whose `..` climbs above the pool
/// root; pools report those as non-existent.
pub(crate) fn pool_key(path: &Path) -> Option<Path> {
    if !path.is_relative() || !path.stays_inbound() {
        return None;
    }
    Some(path.normalize())
}

/// Case-folded lookup key for a normalized path: `a/b/c`, `""` for the root.
pub(crate) fn folded_key(path: &Path) -> String {
    let folded: Vec<String> = path.segments().iter().map(|s| fold_case(s)).collect();
    folded.join("/")
}
