//! The resource tree contract every pool implements.
//!
//! A pool answers three questions about pool-relative paths: what is there
//! ([`ResourcePool::resource_type`]), what does a directory contain
//! ([`ResourcePool::entries`], or the typed [`ResourcePool::files`] and
//! [`ResourcePool::directories`]) and what are a file's bytes
//! ([`ResourcePool::open`]).
//!
//! On top of that contract sits [`Resource`], a node handle for tree-style
//! navigation, and the case-insensitive [`Resource::find`] lookup.
//!
//! # Design
//!
//! A `Resource` borrows its pool and carries its own path. The parent is
//! derived from the path, so handles never own each other and the tree has
//! no reference cycles. Two handles are equal when they point into the same
//! pool at the same path.

use std::fmt;
use std::io::{Read, Seek};

use gamevfs_path::{Path, names_match};

use crate::error::{VfsError, VfsResult};

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    NonExistent,
    File,
    Directory,
}

impl ResourceType {
    pub fn exists(self) -> bool {
        self != ResourceType::NonExistent
    }

    pub fn is_file(self) -> bool {
        self == ResourceType::File
    }

    pub fn is_directory(self) -> bool {
        self == ResourceType::Directory
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceType::NonExistent => "non-existent",
            ResourceType::File => "file",
            ResourceType::Directory => "directory",
        })
    }
}

/// An immediate child of a directory, in the pool's own casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (not full path).
    pub name: String,
    /// `File` or `Directory`.
    pub kind: ResourceType,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceType::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceType::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_directory()
    }
}

/// A readable, seekable byte stream.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// An opened file. Every call to `open` returns an independent stream.
pub type Content = Box<dyn ReadSeek>;

/// A backing store exposing a tree of files and directories.
///
/// Paths are relative to the pool root. Implementations normalize them and
/// treat absolute or escaping paths as non-existent. Failures of the
/// underlying store are reported as "not there" rather than as errors, so a
/// single broken pool never aborts a query across several pools.
///
/// Directory enumeration comes in two shapes: the generic [`entries`] and
/// the typed [`files`]/[`directories`]. Each has a default written in terms
/// of the other, so an implementation must override at least one side,
/// whichever its store produces more cheaply.
///
/// [`entries`]: ResourcePool::entries
/// [`files`]: ResourcePool::files
/// [`directories`]: ResourcePool::directories
pub trait ResourcePool: Send + Sync + fmt::Debug {
    /// What `path` points at.
    fn resource_type(&self, path: &Path) -> ResourceType;

    /// Open a file for reading. `None` for directories and missing paths.
    fn open(&self, path: &Path) -> Option<Content>;

    /// Immediate children of a directory. Empty for anything else.
    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        let mut entries: Vec<DirEntry> = self
            .directories(dir)
            .into_iter()
            .map(DirEntry::directory)
            .collect();
        entries.extend(self.files(dir).into_iter().map(DirEntry::file));
        entries
    }

    /// Names of the files directly inside `dir`.
    fn files(&self, dir: &Path) -> Vec<String> {
        self.entries(dir)
            .into_iter()
            .filter(DirEntry::is_file)
            .map(|e| e.name)
            .collect()
    }

    /// Names of the directories directly inside `dir`.
    fn directories(&self, dir: &Path) -> Vec<String> {
        self.entries(dir)
            .into_iter()
            .filter(DirEntry::is_dir)
            .map(|e| e.name)
            .collect()
    }

    /// Names of every child of `dir`, in the pool's own casing.
    fn list(&self, dir: &Path) -> Vec<String> {
        self.entries(dir).into_iter().map(|e| e.name).collect()
    }

    /// Host filesystem path backing `path`, for pools that have one.
    ///
    /// Tools that must hand a real file to an external library use this.
    /// Returns `None` for virtual pools.
    fn real_path(&self, _path: &Path) -> Option<std::path::PathBuf> {
        None
    }
}

/// A file or directory inside a pool.
#[derive(Clone)]
pub struct Resource<'p> {
    pool: &'p dyn ResourcePool,
    path: Path,
    kind: ResourceType,
}

impl<'p> Resource<'p> {
    /// The root directory of `pool`.
    pub fn root(pool: &'p dyn ResourcePool) -> Self {
        Self {
            pool,
            path: Path::empty().as_directory(),
            kind: ResourceType::Directory,
        }
    }

    fn child(&self, name: &str, kind: ResourceType) -> Option<Resource<'p>> {
        let mut name = Path::parse(name);
        if kind.is_directory() {
            name = name.as_directory();
        }
        let path = self.path.join(&name).ok()?;
        Some(Resource {
            pool: self.pool,
            path,
            kind,
        })
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Normalized path relative to the pool root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or("")
    }

    pub fn pool(&self) -> &'p dyn ResourcePool {
        self.pool
    }

    /// The containing directory. `None` for the root.
    pub fn parent(&self) -> Option<Resource<'p>> {
        if self.path.is_empty() {
            return None;
        }
        Some(Resource {
            pool: self.pool,
            path: self.path.parent()?,
            kind: ResourceType::Directory,
        })
    }

    /// Files directly inside this directory.
    pub fn files(&self) -> Vec<Resource<'p>> {
        if !self.is_directory() {
            return Vec::new();
        }
        self.pool
            .files(&self.path)
            .iter()
            .filter_map(|name| self.child(name, ResourceType::File))
            .collect()
    }

    /// Directories directly inside this directory.
    pub fn directories(&self) -> Vec<Resource<'p>> {
        if !self.is_directory() {
            return Vec::new();
        }
        self.pool
            .directories(&self.path)
            .iter()
            .filter_map(|name| self.child(name, ResourceType::Directory))
            .collect()
    }

    /// Every child of this directory.
    pub fn children(&self) -> Vec<Resource<'p>> {
        if !self.is_directory() {
            return Vec::new();
        }
        self.pool
            .entries(&self.path)
            .iter()
            .filter_map(|entry| self.child(&entry.name, entry.kind))
            .collect()
    }

    /// Open the file's bytes. `None` for directories.
    pub fn open_content(&self) -> Option<Content> {
        if !self.is_file() {
            return None;
        }
        self.pool.open(&self.path)
    }

    /// Look up a descendant by a relative path, ignoring case.
    ///
    /// Each segment is matched against the children of the directory
    /// reached so far, preferring an exact spelling over a case-folded one,
    /// so the returned resource carries the pool's own casing. A missed
    /// segment is `Ok(None)`. An absolute path or one whose `..` climbs out
    /// of this resource is an error.
    pub fn find(&self, path: &str) -> VfsResult<Option<Resource<'p>>> {
        let query = Path::parse(path);
        if !query.is_relative() {
            return Err(VfsError::AbsolutePath(path.to_string()));
        }
        if !query.stays_inbound() {
            return Err(VfsError::EscapingPath(path.to_string()));
        }
        let query = query.normalize();

        let Some((last, walk)) = query.segments().split_last() else {
            return Ok(Some(self.clone()));
        };
        if !self.is_directory() {
            return Ok(None);
        }

        let mut current = self.clone();
        for segment in walk {
            match pick(current.directories(), segment) {
                Some(dir) => current = dir,
                None => return Ok(None),
            }
        }

        if query.is_directory() {
            return Ok(pick(current.directories(), last));
        }
        Ok(pick(current.files(), last).or_else(|| pick(current.directories(), last)))
    }

    /// [`find`](Resource::find), then [`open_content`](Resource::open_content).
    pub fn find_and_open(&self, path: &str) -> VfsResult<Option<Content>> {
        Ok(self.find(path)?.and_then(|resource| resource.open_content()))
    }
}

/// The candidate named exactly `name`, else the first case-folded match.
fn pick<'p>(candidates: Vec<Resource<'p>>, name: &str) -> Option<Resource<'p>> {
    let mut folded = None;
    for candidate in candidates {
        if candidate.name() == name {
            return Some(candidate);
        }
        if folded.is_none() && names_match(candidate.name(), name, false) {
            folded = Some(candidate);
        }
    }
    folded
}

impl PartialEq for Resource<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(self.pool, other.pool) && self.path == other.path
    }
}

impl Eq for Resource<'_> {}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path.to_posix_string())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Tree navigation available on every pool.
pub trait ResourcePoolExt {
    /// The pool's root directory: parent-less, path `""`.
    fn root(&self) -> Resource<'_>;

    /// Case-insensitive lookup from the root. See [`Resource::find`].
    fn find(&self, path: &str) -> VfsResult<Option<Resource<'_>>> {
        self.root().find(path)
    }

    /// Case-insensitive lookup from the root, then open.
    fn find_and_open(&self, path: &str) -> VfsResult<Option<Content>> {
        self.root().find_and_open(path)
    }
}

impl<P: ResourcePool> ResourcePoolExt for P {
    fn root(&self) -> Resource<'_> {
        Resource::root(self)
    }
}

impl ResourcePoolExt for dyn ResourcePool + '_ {
    fn root(&self) -> Resource<'_> {
        Resource::root(self)
    }
}
