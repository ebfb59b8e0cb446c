//! Several pools merged into one tree.
//!
//! Directories present in more than one source are unioned, never replaced.
//! Files with the same case-folded name are overridden: only the
//! highest-precedence source's file is visible.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use gamevfs_path::{Path, fold_case};
use serde::{Deserialize, Serialize};

use super::{folded_key, pool_key};
use crate::resource::{Content, DirEntry, ResourcePool, ResourceType};

/// Which source wins when several define the same file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precedence {
    /// The source listed last overrides the ones before it.
    #[default]
    LastWins,
    /// The source listed first overrides the ones after it.
    FirstWins,
}

#[derive(Debug, Clone)]
enum ChildKind {
    Directory,
    File { source: usize, path: Path },
}

#[derive(Debug, Clone)]
struct Child {
    name: String,
    kind: ChildKind,
}

/// One synthesized directory: where it lives in each source, and the merged
/// children keyed by folded name.
#[derive(Debug)]
struct MergedDir {
    sources: Vec<(usize, Path)>,
    children: BTreeMap<String, Child>,
}

/// A pool presenting the merge of an ordered list of pools.
///
/// Lookups are case-insensitive. Merged directories are built on first use
/// and memoized by folded path, so repeated traversals see the same node.
pub struct OverlayPool {
    pools: Vec<Arc<dyn ResourcePool>>,
    precedence: Precedence,
    merged: Mutex<HashMap<String, Arc<MergedDir>>>,
}

impl std::fmt::Debug for OverlayPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayPool")
            .field("pools", &self.pools)
            .field("precedence", &self.precedence)
            .finish()
    }
}

impl OverlayPool {
    /// Overlay `pools` with [`Precedence::LastWins`].
    pub fn new(pools: impl IntoIterator<Item = Arc<dyn ResourcePool>>) -> Self {
        Self::with_precedence(pools, Precedence::default())
    }

    pub fn with_precedence(
        pools: impl IntoIterator<Item = Arc<dyn ResourcePool>>,
        precedence: Precedence,
    ) -> Self {
        let pools: Vec<_> = pools.into_iter().collect();
        tracing::debug!(sources = pools.len(), ?precedence, "overlay pool");
        Self {
            pools,
            precedence,
            merged: Mutex::new(HashMap::new()),
        }
    }

    pub fn pools(&self) -> &[Arc<dyn ResourcePool>] {
        &self.pools
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// Source indices from lowest to highest precedence.
    fn ascending(&self) -> Vec<usize> {
        match self.precedence {
            Precedence::LastWins => (0..self.pools.len()).collect(),
            Precedence::FirstWins => (0..self.pools.len()).rev().collect(),
        }
    }

    /// The merged directory at a normalized path, building and memoizing it
    /// and its ancestors as needed.
    fn merged_dir(&self, path: &Path) -> Option<Arc<MergedDir>> {
        let key = folded_key(path);
        if let Some(dir) = self.memo().get(&key) {
            return Some(Arc::clone(dir));
        }

        let sources = match path.segments().split_last() {
            None => self
                .ascending()
                .into_iter()
                .filter(|&i| self.pools[i].resource_type(path).is_directory())
                .map(|i| (i, Path::empty()))
                .collect(),
            Some((name, _)) => {
                let parent = self.merged_dir(&path.parent()?)?;
                let folded = fold_case(name);
                match parent.children.get(&folded) {
                    Some(Child {
                        kind: ChildKind::Directory,
                        ..
                    }) => {}
                    _ => return None,
                }
                let mut sources = Vec::new();
                for (i, dir) in &parent.sources {
                    for actual in self.pools[*i].directories(dir) {
                        if fold_case(&actual) == folded {
                            if let Ok(joined) = dir.join(&Path::parse(&actual)) {
                                sources.push((*i, joined));
                            }
                        }
                    }
                }
                sources
            }
        };

        let built = Arc::new(self.build(sources));
        let mut memo = self.memo();
        Some(Arc::clone(memo.entry(key).or_insert(built)))
    }

    fn build(&self, sources: Vec<(usize, Path)>) -> MergedDir {
        let mut children: BTreeMap<String, Child> = BTreeMap::new();
        for (i, dir) in &sources {
            let pool = &self.pools[*i];
            for name in pool.directories(dir) {
                children.insert(
                    fold_case(&name),
                    Child {
                        name,
                        kind: ChildKind::Directory,
                    },
                );
            }
            for name in pool.files(dir) {
                let folded = fold_case(&name);
                if let Some(Child {
                    kind: ChildKind::Directory,
                    ..
                }) = children.get(&folded)
                {
                    continue;
                }
                let Ok(path) = dir.join(&Path::parse(&name)) else {
                    continue;
                };
                children.insert(
                    folded,
                    Child {
                        name,
                        kind: ChildKind::File { source: *i, path },
                    },
                );
            }
        }
        MergedDir { sources, children }
    }

    fn memo(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<MergedDir>>> {
        self.merged.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The merged child a normalized non-root path names.
    fn child(&self, path: &Path) -> Option<Child> {
        let name = path.file_name()?;
        let parent = self.merged_dir(&path.parent()?)?;
        parent.children.get(&fold_case(name)).cloned()
    }
}

impl ResourcePool for OverlayPool {
    fn resource_type(&self, path: &Path) -> ResourceType {
        let Some(key) = pool_key(path) else {
            return ResourceType::NonExistent;
        };
        if key.is_empty() {
            return ResourceType::Directory;
        }
        match self.child(&key) {
            Some(Child {
                kind: ChildKind::Directory,
                ..
            }) => ResourceType::Directory,
            Some(_) => ResourceType::File,
            None => ResourceType::NonExistent,
        }
    }

    fn open(&self, path: &Path) -> Option<Content> {
        let key = pool_key(path)?;
        match self.child(&key)?.kind {
            ChildKind::File { source, path } => self.pools[source].open(&path),
            ChildKind::Directory => None,
        }
    }

    /// The winning source's host path. Merged directories have none.
    fn real_path(&self, path: &Path) -> Option<std::path::PathBuf> {
        let key = pool_key(path)?;
        match self.child(&key)?.kind {
            ChildKind::File { source, path } => self.pools[source].real_path(&path),
            ChildKind::Directory => None,
        }
    }

    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        let Some(dir) = pool_key(dir).and_then(|key| self.merged_dir(&key)) else {
            return Vec::new();
        };
        dir.children
            .values()
            .map(|child| match child.kind {
                ChildKind::Directory => DirEntry::directory(&child.name),
                ChildKind::File { .. } => DirEntry::file(&child.name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::InMemoryPool;
    use crate::resource::ResourcePoolExt;
    use std::io::Read;

    fn read(pool: &dyn ResourcePool, path: &str) -> String {
        let mut out = String::new();
        pool.open(&Path::parse(path))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    fn pool_a() -> Arc<dyn ResourcePool> {
        Arc::new(
            InMemoryPool::new()
                .with_file("content.txt", "from a")
                .unwrap()
                .with_file("common/a.txt", "a")
                .unwrap()
                .with_file("only_a/x.txt", "x")
                .unwrap(),
        )
    }

    fn pool_b() -> Arc<dyn ResourcePool> {
        Arc::new(
            InMemoryPool::new()
                .with_file("CONTENT.TXT", "from b")
                .unwrap()
                .with_file("Common/b.txt", "b")
                .unwrap(),
        )
    }

    #[test]
    fn test_last_source_wins_by_default() {
        let overlay = OverlayPool::new([pool_a(), pool_b()]);
        assert_eq!(read(&overlay, "content.txt"), "from b");
        assert_eq!(overlay.files(&Path::parse("")), vec!["CONTENT.TXT"]);
    }

    #[test]
    fn test_first_wins_when_selected() {
        let overlay = OverlayPool::with_precedence([pool_a(), pool_b()], Precedence::FirstWins);
        assert_eq!(read(&overlay, "CONTENT.txt"), "from a");
        assert_eq!(overlay.files(&Path::parse("")), vec!["content.txt"]);
    }

    #[test]
    fn test_directories_are_unioned() {
        let overlay = OverlayPool::new([pool_a(), pool_b()]);
        assert_eq!(overlay.files(&Path::parse("common")), vec!["a.txt", "b.txt"]);
        assert_eq!(overlay.directories(&Path::parse("")), vec!["Common", "only_a"]);
        assert_eq!(read(&overlay, "COMMON/a.txt"), "a");
        assert_eq!(read(&overlay, "common/B.TXT"), "b");
    }

    #[test]
    fn test_directory_shadows_file() {
        let files: Arc<dyn ResourcePool> =
            Arc::new(InMemoryPool::new().with_file("thing", "file").unwrap());
        let dirs: Arc<dyn ResourcePool> =
            Arc::new(InMemoryPool::new().with_file("thing/inner.txt", "i").unwrap());
        let overlay = OverlayPool::new([dirs, files]);
        assert_eq!(overlay.resource_type(&Path::parse("thing")), ResourceType::Directory);
        assert!(overlay.open(&Path::parse("thing")).is_none());
        assert_eq!(read(&overlay, "thing/inner.txt"), "i");
    }

    #[test]
    fn test_types() {
        let overlay = OverlayPool::new([pool_a(), pool_b()]);
        assert_eq!(overlay.resource_type(&Path::parse("")), ResourceType::Directory);
        assert_eq!(overlay.resource_type(&Path::parse("only_a/X.txt")), ResourceType::File);
        assert_eq!(overlay.resource_type(&Path::parse("nope")), ResourceType::NonExistent);
        assert_eq!(overlay.resource_type(&Path::parse("content.txt/x")), ResourceType::NonExistent);
        assert_eq!(overlay.resource_type(&Path::parse("../x")), ResourceType::NonExistent);
    }

    #[test]
    fn test_merged_directories_are_memoized() {
        let overlay = OverlayPool::new([pool_a(), pool_b()]);
        let first = overlay.merged_dir(&Path::parse("common")).unwrap();
        let second = overlay.merged_dir(&Path::parse("COMMON")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_merged_directories_shared_across_threads() {
        let overlay = OverlayPool::new([pool_a(), pool_b()]);
        let merged: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let overlay = &overlay;
                    let query = if i % 2 == 0 { "common" } else { "COMMON" };
                    scope.spawn(move || overlay.merged_dir(&Path::parse(query)).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(merged.iter().all(|dir| Arc::ptr_eq(dir, &merged[0])));
        assert_eq!(overlay.files(&Path::parse("common")), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_resources_compare_equal_across_traversals() {
        let overlay = OverlayPool::new([pool_a(), pool_b()]);
        let via_find = overlay.find("common/a.txt").unwrap().unwrap();
        let via_walk = overlay.root().directories()[0].files()[0].clone();
        assert_eq!(via_find, via_walk);
        assert_eq!(via_find.parent().unwrap(), overlay.find("COMMON").unwrap().unwrap());
    }

    #[test]
    fn test_empty_overlay() {
        let overlay = OverlayPool::new(Vec::new());
        assert_eq!(overlay.resource_type(&Path::parse("")), ResourceType::Directory);
        assert!(overlay.list(&Path::parse("")).is_empty());
    }

    #[test]
    fn test_precedence_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            precedence: Precedence,
        }
        let parsed: Wrapper = toml::from_str("precedence = \"first-wins\"").unwrap();
        assert_eq!(parsed.precedence, Precedence::FirstWins);
    }
}
