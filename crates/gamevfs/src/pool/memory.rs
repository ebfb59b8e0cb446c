//! In-memory pool built programmatically.
//!
//! Used for tests and for assets generated at runtime. Nodes live in an
//! arena and refer to each other by index.

use std::io::Cursor;
use std::sync::Arc;

use gamevfs_path::{Path, names_match};

use super::pool_key;
use crate::error::{VfsError, VfsResult};
use crate::resource::{Content, DirEntry, ResourcePool, ResourceType};

const ROOT: usize = 0;

#[derive(Debug, Clone)]
enum NodeKind {
    Directory,
    File(Arc<[u8]>),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: NodeKind,
    children: Vec<usize>,
}

impl Node {
    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }
}

/// A pool whose tree is held entirely in memory.
///
/// Creation matches existing directories case-insensitively, so the first
/// spelling of a directory name sticks. Queries are exact-case.
#[derive(Debug, Clone)]
pub struct InMemoryPool {
    nodes: Vec<Node>,
}

impl Default for InMemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPool {
    /// Create a pool holding only the root directory.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: String::new(),
                kind: NodeKind::Directory,
                children: Vec::new(),
            }],
        }
    }

    /// Builder form of [`create_file`](Self::create_file).
    pub fn with_file(mut self, path: impl Into<Path>, bytes: impl AsRef<[u8]>) -> VfsResult<Self> {
        self.create_file(path, bytes)?;
        Ok(self)
    }

    /// Add a file, creating any missing ancestor directories.
    ///
    /// Fails with `AlreadyExists` when the final name is already taken at
    /// that level, ignoring case.
    pub fn create_file(&mut self, path: impl Into<Path>, bytes: impl AsRef<[u8]>) -> VfsResult<()> {
        let path = path.into();
        let (parent, name) = self.prepare(&path)?;
        if self.child_folded(parent, &name).is_some() {
            return Err(VfsError::AlreadyExists(path.to_posix_string()));
        }
        self.push(parent, name, NodeKind::File(Arc::from(bytes.as_ref())));
        Ok(())
    }

    /// Add a directory and its ancestors. Existing directories are left alone.
    pub fn create_directory(&mut self, path: impl Into<Path>) -> VfsResult<()> {
        let path = path.into();
        let (parent, name) = self.prepare(&path)?;
        match self.child_folded(parent, &name) {
            Some(existing) if self.nodes[existing].is_directory() => Ok(()),
            Some(_) => Err(VfsError::AlreadyExists(path.to_posix_string())),
            None => {
                self.push(parent, name, NodeKind::Directory);
                Ok(())
            }
        }
    }

    /// Validate `path` and make sure its parent directory exists.
    /// Returns the parent's index and the final segment.
    fn prepare(&mut self, path: &Path) -> VfsResult<(usize, String)> {
        let text = path.to_posix_string();
        if !path.is_relative() {
            return Err(VfsError::AbsolutePath(text));
        }
        if !path.stays_inbound() {
            return Err(VfsError::EscapingPath(text));
        }
        let normalized = path.normalize();
        let Some((name, ancestors)) = normalized.segments().split_last() else {
            return Err(VfsError::InvalidOperation(format!(
                "cannot create the pool root: '{text}'"
            )));
        };

        let mut current = ROOT;
        for segment in ancestors {
            current = match self.child_folded(current, segment) {
                Some(index) if self.nodes[index].is_directory() => index,
                Some(_) => return Err(VfsError::AlreadyExists(text)),
                None => self.push(current, segment.clone(), NodeKind::Directory),
            };
        }
        Ok((current, name.clone()))
    }

    fn push(&mut self, parent: usize, name: String, kind: NodeKind) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            name,
            kind,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        index
    }

    fn child_folded(&self, parent: usize, name: &str) -> Option<usize> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&i| names_match(&self.nodes[i].name, name, false))
    }

    fn lookup(&self, path: &Path) -> Option<&Node> {
        let key = pool_key(path)?;
        let mut current = ROOT;
        for segment in key.segments() {
            current = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&i| self.nodes[i].name == *segment)?;
        }
        Some(&self.nodes[current])
    }
}

impl ResourcePool for InMemoryPool {
    fn resource_type(&self, path: &Path) -> ResourceType {
        match self.lookup(path) {
            Some(node) if node.is_directory() => ResourceType::Directory,
            Some(_) => ResourceType::File,
            None => ResourceType::NonExistent,
        }
    }

    fn open(&self, path: &Path) -> Option<Content> {
        match &self.lookup(path)?.kind {
            NodeKind::File(bytes) => Some(Box::new(Cursor::new(Arc::clone(bytes)))),
            NodeKind::Directory => None,
        }
    }

    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        let Some(node) = self.lookup(dir) else {
            return Vec::new();
        };
        node.children
            .iter()
            .map(|&i| {
                let child = &self.nodes[i];
                if child.is_directory() {
                    DirEntry::directory(&child.name)
                } else {
                    DirEntry::file(&child.name)
                }
            })
            .collect()
    }
}
