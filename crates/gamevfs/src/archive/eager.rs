//! Archive pool with a directory tree built up front.

use std::collections::HashMap;
use std::path::PathBuf;

use gamevfs_path::{Path, fold_case};

use super::format::{self, ArchiveTable};
use super::{scope_base, split_location};
use crate::error::{VfsError, VfsResult};
use crate::pool::{folded_key, pool_key};
use crate::resource::{Content, DirEntry, ResourcePool, ResourceType};

const ROOT: usize = 0;

#[derive(Debug)]
enum NodeKind {
    Directory(Vec<usize>),
    File { offset: u64, length: u64 },
}

#[derive(Debug)]
struct Node {
    name: String,
    kind: NodeKind,
}

impl Node {
    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }
}

/// The parsed directory tree of an archive.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
    /// Folded full path to node index.
    index: HashMap<String, usize>,
}

impl Tree {
    fn build(table: &ArchiveTable) -> VfsResult<Self> {
        let mut tree = Tree {
            nodes: vec![Node {
                name: String::new(),
                kind: NodeKind::Directory(Vec::new()),
            }],
            index: HashMap::from([(String::new(), ROOT)]),
        };

        for entry in &table.entries {
            let key = folded_key(&entry.path);
            if let Some(&existing) = tree.index.get(&key) {
                if tree.nodes[existing].is_directory() {
                    return Err(VfsError::CorruptArchive(format!(
                        "file '{}' collides with a directory",
                        entry.path
                    )));
                }
                tracing::debug!(path = %entry.path, "duplicate archive entry ignored");
                continue;
            }

            let Some((name, dirs)) = entry.path.segments().split_last() else {
                continue;
            };
            let parent = tree.ensure_directories(dirs)?;
            tree.push(
                parent,
                key,
                Node {
                    name: name.clone(),
                    kind: NodeKind::File {
                        offset: entry.offset,
                        length: entry.length,
                    },
                },
            );
        }
        Ok(tree)
    }

    /// Make sure every prefix of `dirs` is a directory, creating the missing
    /// ones. Returns the index of the deepest.
    fn ensure_directories(&mut self, dirs: &[String]) -> VfsResult<usize> {
        let folded: Vec<String> = dirs.iter().map(|s| fold_case(s)).collect();
        let key_at = |depth: usize| folded[..depth].join("/");

        let mut missing = Vec::new();
        let mut depth = dirs.len();
        let mut parent = loop {
            match self.index.get(&key_at(depth)) {
                Some(&found) if self.nodes[found].is_directory() => break found,
                Some(_) => {
                    return Err(VfsError::CorruptArchive(format!(
                        "directory '{}' collides with a file",
                        dirs[..depth].join("/")
                    )));
                }
                // The root is always indexed, so depth never underflows.
                None => {
                    missing.push(depth);
                    depth -= 1;
                }
            }
        };

        while let Some(depth) = missing.pop() {
            parent = self.push(
                parent,
                key_at(depth),
                Node {
                    name: dirs[depth - 1].clone(),
                    kind: NodeKind::Directory(Vec::new()),
                },
            );
        }
        Ok(parent)
    }

    fn push(&mut self, parent: usize, key: String, node: Node) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        if let NodeKind::Directory(children) = &mut self.nodes[parent].kind {
            children.push(index);
        }
        self.index.insert(key, index);
        index
    }
}

/// A pool over an archive file, parsed into a tree at construction.
///
/// Lookups are case-insensitive. Each `open` reads through a freshly opened
/// file handle, so streams never share a cursor.
pub struct ArchivePool {
    file: PathBuf,
    data_offset: u64,
    tree: Tree,
    base: String,
    entry_count: usize,
}

impl std::fmt::Debug for ArchivePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchivePool")
            .field("file", &self.file)
            .field("base", &self.base)
            .field("entries", &self.entry_count)
            .finish()
    }
}

impl ArchivePool {
    /// Open `archive-file[|base]`.
    pub fn open(location: &str) -> VfsResult<Self> {
        let (file, base) = split_location(location);
        Self::open_scoped(file, base.unwrap_or(""))
    }

    /// Open an archive, scoped to the directory `base` inside it.
    ///
    /// An empty base exposes the whole archive. A base that is not a
    /// directory of the archive is `NotFound`.
    pub fn open_scoped(file: impl AsRef<std::path::Path>, base: &str) -> VfsResult<Self> {
        let (file, table) = format::load(file.as_ref())?;
        let tree = Tree::build(&table)?;

        let base_key = folded_key(&scope_base(base)?);
        match tree.index.get(&base_key) {
            Some(&node) if tree.nodes[node].is_directory() => {}
            _ => {
                return Err(VfsError::NotFound(format!(
                    "{}|{base}",
                    file.display()
                )));
            }
        }

        tracing::debug!(
            archive = %file.display(),
            base = %base_key,
            nodes = tree.nodes.len(),
            "archive pool"
        );
        Ok(Self {
            file,
            data_offset: table.data_offset,
            tree,
            base: base_key,
            entry_count: table.entries.len(),
        })
    }

    /// The absolute archive file path.
    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    /// Number of entries in the archive table, duplicates included.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    fn node(&self, path: &Path) -> Option<&Node> {
        let key = folded_key(&pool_key(path)?);
        let full = match (self.base.is_empty(), key.is_empty()) {
            (true, _) => key,
            (false, true) => self.base.clone(),
            (false, false) => format!("{}/{key}", self.base),
        };
        self.tree.index.get(&full).map(|&i| &self.tree.nodes[i])
    }
}

impl ResourcePool for ArchivePool {
    fn resource_type(&self, path: &Path) -> ResourceType {
        match self.node(path) {
            Some(node) if node.is_directory() => ResourceType::Directory,
            Some(_) => ResourceType::File,
            None => ResourceType::NonExistent,
        }
    }

    fn open(&self, path: &Path) -> Option<Content> {
        match self.node(path)?.kind {
            NodeKind::File { offset, length } => {
                format::open_entry(&self.file, self.data_offset + offset, length)
            }
            NodeKind::Directory(_) => None,
        }
    }

    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        let Some(Node {
            kind: NodeKind::Directory(children),
            ..
        }) = self.node(dir)
        else {
            return Vec::new();
        };
        children
            .iter()
            .map(|&i| {
                let child = &self.tree.nodes[i];
                if child.is_directory() {
                    DirEntry::directory(&child.name)
                } else {
                    DirEntry::file(&child.name)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_archive(builder: ArchiveBuilder) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.pak");
        builder.write_file(&file).unwrap();
        (dir, file)
    }

    fn sample() -> (TempDir, PathBuf) {
        write_archive(
            ArchiveBuilder::new()
                .with_file("a.txt", "alpha")
                .unwrap()
                .with_file("B.txt", "beta")
                .unwrap()
                .with_file("c/D.txt", "delta")
                .unwrap(),
        )
    }

    fn read(pool: &ArchivePool, path: &str) -> String {
        let mut out = String::new();
        pool.open(&Path::parse(path))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_listing_in_table_order() {
        let (_dir, file) = sample();
        let pool = ArchivePool::open_scoped(&file, "").unwrap();
        assert_eq!(pool.files(&Path::parse(".")), vec!["a.txt", "B.txt"]);
        assert_eq!(pool.directories(&Path::parse(".")), vec!["c"]);
        assert_eq!(pool.list(&Path::parse("c")), vec!["D.txt"]);
        assert_eq!(pool.entry_count(), 3);
    }

    #[test]
    fn test_case_insensitive_open() {
        let (_dir, file) = sample();
        let pool = ArchivePool::open_scoped(&file, "").unwrap();
        assert_eq!(read(&pool, "C/d.txt"), "delta");
        assert_eq!(read(&pool, "b.TXT"), "beta");
        assert!(pool.open(&Path::parse("c")).is_none());
    }

    #[test]
    fn test_concurrent_streams_do_not_interfere() {
        let (_dir, file) = sample();
        let pool = ArchivePool::open_scoped(&file, "").unwrap();
        let mut first = pool.open(&Path::parse("a.txt")).unwrap();
        let mut second = pool.open(&Path::parse("c/D.txt")).unwrap();
        let mut byte = [0u8; 1];
        first.read_exact(&mut byte).unwrap();
        let mut rest = String::new();
        second.read_to_string(&mut rest).unwrap();
        assert_eq!(&byte, b"a");
        assert_eq!(rest, "delta");
        let mut tail = String::new();
        first.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "lpha");
    }

    #[test]
    fn test_parallel_reads_from_threads() {
        let (_dir, file) = sample();
        let pool = ArchivePool::open_scoped(&file, "").unwrap();
        let expected = [("a.txt", "alpha"), ("B.txt", "beta"), ("c/D.txt", "delta")];
        std::thread::scope(|scope| {
            for _ in 0..4 {
                for (path, text) in expected {
                    let pool = &pool;
                    scope.spawn(move || assert_eq!(read(pool, path), text));
                }
            }
        });
    }

    #[test]
    fn test_scoped_location() {
        let (_dir, file) = sample();
        let pool = ArchivePool::open(&format!("{}|C", file.display())).unwrap();
        assert_eq!(pool.list(&Path::parse("")), vec!["D.txt"]);
        assert_eq!(read(&pool, "d.txt"), "delta");
        assert_eq!(pool.resource_type(&Path::parse("a.txt")), ResourceType::NonExistent);
    }

    #[test]
    fn test_missing_base() {
        let (_dir, file) = sample();
        let err = ArchivePool::open_scoped(&file, "nope").unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
        let err = ArchivePool::open_scoped(&file, "a.txt").unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_entries_first_wins() {
        let (_dir, file) = write_archive(
            ArchiveBuilder::new()
                .with_file("x.txt", "first")
                .unwrap()
                .with_file("X.TXT", "second")
                .unwrap(),
        );
        let pool = ArchivePool::open_scoped(&file, "").unwrap();
        assert_eq!(pool.list(&Path::parse("")), vec!["x.txt"]);
        assert_eq!(read(&pool, "X.txt"), "first");
    }

    #[test]
    fn test_file_directory_collision_is_corrupt() {
        let (_dir, file) = write_archive(
            ArchiveBuilder::new()
                .with_file("a", "file")
                .unwrap()
                .with_file("a/b", "nested")
                .unwrap(),
        );
        let err = ArchivePool::open_scoped(&file, "").unwrap_err();
        assert!(matches!(err, VfsError::CorruptArchive(_)));
    }

    #[test]
    fn test_bad_magic_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("junk.pak");
        std::fs::write(&file, b"not an archive").unwrap();
        let err = ArchivePool::open_scoped(&file, "").unwrap_err();
        assert!(matches!(err, VfsError::BadArchiveMagic { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArchivePool::open_scoped(dir.path().join("gone.pak"), "").unwrap_err();
        assert!(matches!(err, VfsError::Io(_)));
    }

    #[test]
    fn test_nested_ancestors_created_once() {
        let (_dir, file) = write_archive(
            ArchiveBuilder::new()
                .with_file("x/y/z/1.txt", "1")
                .unwrap()
                .with_file("X/Y/2.txt", "2")
                .unwrap(),
        );
        let pool = ArchivePool::open_scoped(&file, "").unwrap();
        assert_eq!(pool.list(&Path::parse("x")), vec!["y"]);
        assert_eq!(pool.list(&Path::parse("x/y")), vec!["z", "2.txt"]);
        assert_eq!(pool.resource_type(&Path::parse("x/y/z")), ResourceType::Directory);
    }
}
