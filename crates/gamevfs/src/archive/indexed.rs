//! Archive pool that scans the raw entry table per query.
//!
//! Construction only reads the table. Every lookup walks it linearly, which
//! suits archives that are opened often but queried rarely or narrowly. The
//! tree shape is not validated: where a name is both a file and a directory
//! prefix, the earliest table entry decides.

use std::collections::HashSet;
use std::path::PathBuf;

use gamevfs_path::{Path, fold_case};

use super::format::{self, ArchiveEntry};
use super::{scope_base, split_location};
use crate::error::{VfsError, VfsResult};
use crate::pool::pool_key;
use crate::resource::{Content, DirEntry, ResourcePool, ResourceType};

/// An archive pool without a prebuilt tree.
pub struct IndexedArchivePool {
    file: PathBuf,
    data_offset: u64,
    entries: Vec<ArchiveEntry>,
    /// Folded segments of the in-archive base.
    base: Vec<String>,
}

impl std::fmt::Debug for IndexedArchivePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedArchivePool")
            .field("file", &self.file)
            .field("base", &self.base.join("/"))
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Whether `entry` lies at or below the folded `prefix`.
fn under(entry: &ArchiveEntry, prefix: &[String]) -> bool {
    let segments = entry.path.segments();
    segments.len() >= prefix.len()
        && segments
            .iter()
            .zip(prefix)
            .all(|(segment, wanted)| fold_case(segment) == *wanted)
}

impl IndexedArchivePool {
    /// Open `archive-file[|base]`.
    pub fn open(location: &str) -> VfsResult<Self> {
        let (file, base) = split_location(location);
        Self::open_scoped(file, base.unwrap_or(""))
    }

    /// Open an archive, scoped to the directory `base` inside it.
    pub fn open_scoped(file: impl AsRef<std::path::Path>, base: &str) -> VfsResult<Self> {
        let (file, table) = format::load(file.as_ref())?;
        let base_path = scope_base(base)?;
        let pool = Self {
            file,
            data_offset: table.data_offset,
            entries: table.entries,
            base: base_path.segments().iter().map(|s| fold_case(s)).collect(),
        };
        if pool.type_at(&pool.base) != ResourceType::Directory {
            return Err(VfsError::NotFound(format!(
                "{}|{base}",
                pool.file.display()
            )));
        }
        tracing::debug!(
            archive = %pool.file.display(),
            base = %base_path,
            entries = pool.entries.len(),
            "indexed archive pool"
        );
        Ok(pool)
    }

    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Folded full in-archive segments for a pool-relative path.
    fn full(&self, path: &Path) -> Option<Vec<String>> {
        let key = pool_key(path)?;
        let mut full = self.base.clone();
        full.extend(key.segments().iter().map(|s| fold_case(s)));
        Some(full)
    }

    fn type_at(&self, full: &[String]) -> ResourceType {
        if full.is_empty() {
            return ResourceType::Directory;
        }
        self.entries
            .iter()
            .find(|entry| under(entry, full))
            .map_or(ResourceType::NonExistent, |entry| {
                if entry.path.segments().len() == full.len() {
                    ResourceType::File
                } else {
                    ResourceType::Directory
                }
            })
    }
}

impl ResourcePool for IndexedArchivePool {
    fn resource_type(&self, path: &Path) -> ResourceType {
        self.full(path)
            .map_or(ResourceType::NonExistent, |full| self.type_at(&full))
    }

    fn open(&self, path: &Path) -> Option<Content> {
        let full = self.full(path)?;
        let entry = self
            .entries
            .iter()
            .find(|entry| under(entry, &full))
            .filter(|entry| entry.path.segments().len() == full.len())?;
        format::open_entry(&self.file, self.data_offset + entry.offset, entry.length)
    }

    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        let Some(full) = self.full(dir) else {
            return Vec::new();
        };
        if self.type_at(&full) != ResourceType::Directory {
            return Vec::new();
        }

        let depth = full.len();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in self.entries.iter().filter(|entry| under(entry, &full)) {
            let segments = entry.path.segments();
            let Some(name) = segments.get(depth) else {
                continue;
            };
            if !seen.insert(fold_case(name)) {
                continue;
            }
            if segments.len() == depth + 1 {
                out.push(DirEntry::file(name));
            } else {
                out.push(DirEntry::directory(name));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveBuilder, ArchivePool};
    use std::io::Read;
    use tempfile::TempDir;

    fn sample() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.pak");
        ArchiveBuilder::new()
            .with_file("a.txt", "alpha")
            .unwrap()
            .with_file("B.txt", "beta")
            .unwrap()
            .with_file("c/D.txt", "delta")
            .unwrap()
            .with_file("c/e/F.txt", "foxtrot")
            .unwrap()
            .write_file(&file)
            .unwrap();
        (dir, file)
    }

    #[test]
    fn test_agrees_with_eager_pool() {
        let (_dir, file) = sample();
        let indexed = IndexedArchivePool::open_scoped(&file, "").unwrap();
        let eager = ArchivePool::open_scoped(&file, "").unwrap();
        for dir in ["", "c", "C/E", "a.txt", "missing"] {
            let dir = Path::parse(dir);
            assert_eq!(indexed.entries(&dir), eager.entries(&dir), "{dir}");
            assert_eq!(indexed.resource_type(&dir), eager.resource_type(&dir), "{dir}");
        }
    }

    #[test]
    fn test_open() {
        let (_dir, file) = sample();
        let pool = IndexedArchivePool::open_scoped(&file, "").unwrap();
        let mut out = String::new();
        pool.open(&Path::parse("c/E/f.TXT"))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "foxtrot");
        assert!(pool.open(&Path::parse("c")).is_none());
        assert!(pool.open(&Path::parse("c/nope")).is_none());
    }

    #[test]
    fn test_scoped() {
        let (_dir, file) = sample();
        let pool = IndexedArchivePool::open(&format!("{}|c", file.display())).unwrap();
        assert_eq!(pool.list(&Path::parse("")), vec!["D.txt", "e"]);
        assert_eq!(pool.resource_type(&Path::parse("e/f.txt")), ResourceType::File);
        assert_eq!(pool.resource_type(&Path::parse("../a.txt")), ResourceType::NonExistent);
    }

    #[test]
    fn test_missing_base() {
        let (_dir, file) = sample();
        assert!(matches!(
            IndexedArchivePool::open_scoped(&file, "B.txt"),
            Err(VfsError::NotFound(_))
        ));
    }
}
