//! Memoizing wrapper around another pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gamevfs_path::Path;

use crate::resource::{Content, DirEntry, ResourcePool, ResourceType};

/// Remembers `resource_type` and directory listings of an inner pool.
///
/// Results are keyed by the exact POSIX rendering of the argument, without
/// normalizing, so `a/b` and `a/./b` are cached separately. Content is never
/// cached. Call [`clear`](CachedPool::clear) after the inner store changes.
pub struct CachedPool {
    inner: Arc<dyn ResourcePool>,
    types: Mutex<HashMap<String, ResourceType>>,
    listings: Mutex<HashMap<String, Arc<[DirEntry]>>>,
}

impl std::fmt::Debug for CachedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPool")
            .field("inner", &self.inner)
            .field("cached_types", &lock(&self.types).len())
            .field("cached_listings", &lock(&self.listings).len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CachedPool {
    pub fn new(inner: impl ResourcePool + 'static) -> Self {
        Self::from_shared(Arc::new(inner))
    }

    /// Wrap a pool that is also referenced elsewhere.
    pub fn from_shared(inner: Arc<dyn ResourcePool>) -> Self {
        Self {
            inner,
            types: Mutex::new(HashMap::new()),
            listings: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &Arc<dyn ResourcePool> {
        &self.inner
    }

    /// Forget everything memoized so far.
    pub fn clear(&self) {
        lock(&self.types).clear();
        lock(&self.listings).clear();
    }

    fn listing(&self, dir: &Path) -> Arc<[DirEntry]> {
        let key = dir.to_posix_string();
        if let Some(hit) = lock(&self.listings).get(&key) {
            return Arc::clone(hit);
        }
        let fresh: Arc<[DirEntry]> = self.inner.entries(dir).into();
        Arc::clone(lock(&self.listings).entry(key).or_insert(fresh))
    }
}

impl ResourcePool for CachedPool {
    fn resource_type(&self, path: &Path) -> ResourceType {
        let key = path.to_posix_string();
        if let Some(&hit) = lock(&self.types).get(&key) {
            return hit;
        }
        let fresh = self.inner.resource_type(path);
        *lock(&self.types).entry(key).or_insert(fresh)
    }

    fn open(&self, path: &Path) -> Option<Content> {
        self.inner.open(path)
    }

    fn real_path(&self, path: &Path) -> Option<std::path::PathBuf> {
        self.inner.real_path(path)
    }

    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        self.listing(dir).to_vec()
    }

    fn files(&self, dir: &Path) -> Vec<String> {
        self.listing(dir)
            .iter()
            .filter(|e| e.is_file())
            .map(|e| e.name.clone())
            .collect()
    }

    fn directories(&self, dir: &Path) -> Vec<String> {
        self.listing(dir)
            .iter()
            .filter(|e| e.is_dir())
            .map(|e| e.name.clone())
            .collect()
    }
}
