//! Case-insensitive lookup across an ordered list of pools.
//!
//! Pools are consulted in registration order. For typing and content the
//! first pool that resolves a path answers; directory listings are the
//! union over every pool that resolves the path as a directory.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use gamevfs_path::{Path, PathKind, fold_case};

use crate::resource::{Content, ResourcePool, ResourceType};

/// An ordered stack of pools presented as one case-insensitive tree.
///
/// Query paths may use either separator, `.` and `..`, and any casing. A
/// leading `/` is read relative to each pool's root. Drive-qualified paths
/// and paths climbing above the root resolve to nothing.
#[derive(Default)]
pub struct VirtualFileSystem {
    pools: Vec<Arc<dyn ResourcePool>>,
}

impl std::fmt::Debug for VirtualFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileSystem")
            .field("pools", &self.pools)
            .finish()
    }
}

impl VirtualFileSystem {
    pub fn new() -> Self {
        Self { pools: Vec::new() }
    }

    /// Register a pool after the existing ones.
    pub fn add_pool(&mut self, pool: impl ResourcePool + 'static) {
        self.add_shared_pool(Arc::new(pool));
    }

    /// Register a pool (already wrapped in Arc) after the existing ones.
    pub fn add_shared_pool(&mut self, pool: Arc<dyn ResourcePool>) {
        tracing::debug!(?pool, position = self.pools.len(), "registered pool");
        self.pools.push(pool);
    }

    /// Builder form of [`add_pool`](Self::add_pool).
    pub fn with_pool(mut self, pool: impl ResourcePool + 'static) -> Self {
        self.add_pool(pool);
        self
    }

    /// Registered pools, highest priority first.
    pub fn pools(&self) -> &[Arc<dyn ResourcePool>] {
        &self.pools
    }

    /// Find `path` in `pool`, correcting its casing to the pool's own.
    ///
    /// An exact query is tried first and returned unchanged on a hit.
    /// Otherwise the path is walked one segment at a time against the
    /// pool's listings, preferring an exact spelling over a case-folded
    /// one. Every segment but the last must be a directory.
    pub fn resolve(path: &str, pool: &dyn ResourcePool) -> Option<(Path, ResourceType)> {
        let query = Self::query(path)?;

        let exact = pool.resource_type(&query);
        if exact.exists() {
            tracing::trace!(path, "exact hit");
            return Some((query, exact));
        }

        let mut resolved: Vec<String> = Vec::new();
        let count = query.segments().len();
        for (i, segment) in query.segments().iter().enumerate() {
            let current = Path::parse(&resolved.join("/")).as_directory();
            let candidates = if i + 1 < count || query.is_directory() {
                pool.directories(&current)
            } else {
                pool.list(&current)
            };
            let Some(actual) = pick(candidates, segment) else {
                tracing::trace!(path, %segment, "no case-insensitive match");
                return None;
            };
            resolved.push(actual);
        }

        let mut corrected = Path::parse(&resolved.join("/"));
        if query.is_directory() {
            corrected = corrected.as_directory();
        }
        let kind = pool.resource_type(&corrected);
        tracing::trace!(path, corrected = %corrected, %kind, "case-corrected");
        kind.exists().then_some((corrected, kind))
    }

    /// Parse and normalize a query, or `None` if it can never resolve.
    fn query(path: &str) -> Option<Path> {
        let parsed = Path::parse(path);
        let parsed = match parsed.kind() {
            PathKind::Relative => parsed,
            PathKind::Root => parsed.to_relative(),
            PathKind::Drive => return None,
        };
        if !parsed.stays_inbound() {
            return None;
        }
        Some(parsed.normalize())
    }

    /// What `path` is in the first pool that has it.
    pub fn resource_type(&self, path: &str) -> ResourceType {
        self.pools
            .iter()
            .find_map(|pool| Self::resolve(path, pool.as_ref()))
            .map_or(ResourceType::NonExistent, |(_, kind)| kind)
    }

    /// Open a file from the first pool that resolves `path`.
    ///
    /// The search stops at that pool: if it resolves the path as a
    /// directory, or fails to open it, later pools are not consulted.
    pub fn open_file(&self, path: &str) -> Option<Content> {
        for (position, pool) in self.pools.iter().enumerate() {
            let Some((resolved, kind)) = Self::resolve(path, pool.as_ref()) else {
                continue;
            };
            if !kind.is_file() {
                return None;
            }
            let content = pool.open(&resolved);
            if content.is_none() {
                tracing::debug!(path, position, "resolved file failed to open");
            }
            return content;
        }
        None
    }

    /// Read a whole file. `None` when it is missing or unreadable.
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let mut content = self.open_file(path)?;
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes).ok()?;
        Some(bytes)
    }

    /// Lower-cased, deduplicated, sorted union of the listings of every pool
    /// that resolves `path` as a directory.
    pub fn list_directory(&self, path: &str) -> Vec<String> {
        let mut names = BTreeSet::new();
        for pool in &self.pools {
            if let Some((resolved, ResourceType::Directory)) = Self::resolve(path, pool.as_ref()) {
                names.extend(pool.list(&resolved).iter().map(|name| fold_case(name)));
            }
        }
        names.into_iter().collect()
    }

    /// Host path of the file or directory `path` resolves to in the first
    /// pool that has it, if that pool is backed by the host filesystem.
    pub fn real_path(&self, path: &str) -> Option<PathBuf> {
        let (pool, resolved) = self.pools.iter().find_map(|pool| {
            Self::resolve(path, pool.as_ref()).map(|(resolved, _)| (pool, resolved))
        })?;
        pool.real_path(&resolved)
    }
}

/// The name spelled exactly like `wanted`, else the first case-folded match.
fn pick(candidates: Vec<String>, wanted: &str) -> Option<String> {
    let folded = fold_case(wanted);
    let mut fallback = None;
    for name in candidates {
        if name == wanted {
            return Some(name);
        }
        if fallback.is_none() && fold_case(&name) == folded {
            fallback = Some(name);
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::InMemoryPool;

    fn vfs() -> VirtualFileSystem {
        VirtualFileSystem::new().with_pool(
            InMemoryPool::new()
                .with_file("answer.txt", "42")
                .unwrap()
                .with_file("A/B/content.txt", "1337")
                .unwrap(),
        )
    }

    #[test]
    fn test_resolve_exact_is_unchanged() {
        let pool = InMemoryPool::new().with_file("A/b.txt", "").unwrap();
        let (path, kind) = VirtualFileSystem::resolve("A/./b.txt", &pool).unwrap();
        assert_eq!(path.to_posix_string(), "A/b.txt");
        assert_eq!(kind, ResourceType::File);
    }

    #[test]
    fn test_resolve_corrects_case() {
        let pool = InMemoryPool::new().with_file("A/B/content.txt", "").unwrap();
        let (path, kind) = VirtualFileSystem::resolve("a\\b\\CONTENT.TXT", &pool).unwrap();
        assert_eq!(path.to_posix_string(), "A/B/content.txt");
        assert_eq!(kind, ResourceType::File);
    }

    #[test]
    fn test_resolve_prefers_exact_spelling() {
        let pool = InMemoryPool::new().with_file("x/Data.txt", "").unwrap();
        // The in-memory pool refuses case-folded duplicates, so check the
        // helper directly.
        assert_eq!(
            pick(vec!["DATA".into(), "data".into()], "data").as_deref(),
            Some("data")
        );
        assert_eq!(pick(vec!["DATA".into(), "Data".into()], "data").as_deref(), Some("DATA"));
        assert!(VirtualFileSystem::resolve("X/data.TXT", &pool).is_some());
    }

    #[test]
    fn test_intermediate_segments_must_be_directories() {
        let pool = InMemoryPool::new().with_file("file", "").unwrap();
        assert!(VirtualFileSystem::resolve("FILE/inner", &pool).is_none());
        assert!(VirtualFileSystem::resolve("FILE/", &pool).is_none());
        assert!(VirtualFileSystem::resolve("FILE", &pool).is_some());
    }

    #[test]
    fn test_types() {
        let vfs = vfs();
        assert_eq!(vfs.resource_type(""), ResourceType::Directory);
        assert_eq!(vfs.resource_type("a/"), ResourceType::Directory);
        assert_eq!(vfs.resource_type("a/b/content.txt"), ResourceType::File);
        assert_eq!(vfs.resource_type("/A/B"), ResourceType::Directory);
        assert_eq!(vfs.resource_type("a/nope"), ResourceType::NonExistent);
    }

    #[test]
    fn test_rejected_queries() {
        let vfs = vfs();
        assert_eq!(vfs.resource_type("c:/answer.txt"), ResourceType::NonExistent);
        assert_eq!(vfs.resource_type("a/../../answer.txt"), ResourceType::NonExistent);
        assert!(vfs.open_file("../answer.txt").is_none());
        assert!(vfs.list_directory("..").is_empty());
    }

    #[test]
    fn test_read_file() {
        let vfs = vfs();
        assert_eq!(vfs.read_file("A/B/CONTENT.TXT").unwrap(), b"1337");
        assert_eq!(vfs.read_file("./a/../answer.txt").unwrap(), b"42");
        assert!(vfs.read_file("a").is_none());
    }

    #[test]
    fn test_empty_vfs() {
        let vfs = VirtualFileSystem::new();
        assert_eq!(vfs.resource_type(""), ResourceType::NonExistent);
        assert!(vfs.list_directory("").is_empty());
        assert!(vfs.pools().is_empty());
    }

    #[test]
    fn test_real_path_of_virtual_pool_is_none() {
        assert!(vfs().real_path("answer.txt").is_none());
    }
}
