//! Host filesystem pool.
//!
//! Exposes a directory on disk as a pool. OS errors never escape: a path
//! that cannot be stat'ed or read is simply not there.

use std::fs::{self, File, Metadata};
use std::io::BufReader;
use std::path::PathBuf;

use gamevfs_path::{Path, PathKind};

use super::pool_key;
use crate::resource::{Content, DirEntry, ResourcePool, ResourceType};

/// A pool rooted at a host directory.
///
/// All queries are relative to `base`. If `base` is `/srv/game/assets`,
/// then `open("ui/hud.png")` reads `/srv/game/assets/ui/hud.png`.
#[derive(Debug, Clone)]
pub struct FilesystemPool {
    base: PathBuf,
}

impl FilesystemPool {
    /// Create a pool over `base`, absolutized against the current directory
    /// once, here.
    ///
    /// The directory does not need to exist yet; a missing base behaves as
    /// an empty pool.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let base = std::path::absolute(&base).unwrap_or(base);
        tracing::debug!(base = %base.display(), "filesystem pool");
        Self { base }
    }

    /// The absolute base directory.
    pub fn base(&self) -> &std::path::Path {
        &self.base
    }

    fn metadata(&self, path: &Path) -> Option<Metadata> {
        fs::metadata(self.real_path(path)?).ok()
    }
}

fn type_of(meta: &Metadata) -> ResourceType {
    if meta.is_dir() {
        ResourceType::Directory
    } else if meta.is_file() {
        ResourceType::File
    } else {
        ResourceType::NonExistent
    }
}

impl ResourcePool for FilesystemPool {
    fn real_path(&self, path: &Path) -> Option<PathBuf> {
        let key = pool_key(path)?;
        let mut real = self.base.clone();
        real.extend(key.segments());
        Some(real)
    }

    fn resource_type(&self, path: &Path) -> ResourceType {
        self.metadata(path)
            .map_or(ResourceType::NonExistent, |meta| type_of(&meta))
    }

    fn open(&self, path: &Path) -> Option<Content> {
        let real = self.real_path(path)?;
        if !fs::metadata(&real).ok()?.is_file() {
            return None;
        }
        let file = File::open(real).ok()?;
        Some(Box::new(BufReader::new(file)))
    }

    fn entries(&self, dir: &Path) -> Vec<DirEntry> {
        let Some(real) = self.real_path(dir) else {
            return Vec::new();
        };
        let Ok(read_dir) = fs::read_dir(real) else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // Names that do not parse back as one plain segment are unreachable.
            if !is_addressable(&name) {
                continue;
            }
            // fs::metadata follows symlinks, so a link is typed by its target.
            let Ok(meta) = fs::metadata(entry.path()) else {
                continue;
            };
            match type_of(&meta) {
                ResourceType::Directory => entries.push(DirEntry::directory(name)),
                ResourceType::File => entries.push(DirEntry::file(name)),
                ResourceType::NonExistent => {}
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

/// Whether a host name reads back as itself: no separators, no drive
/// suffix, no surrounding whitespace, and not `.`, `..` or `~`.
fn is_addressable(name: &str) -> bool {
    let path = Path::parse(name);
    path.kind() == PathKind::Relative
        && path.segments().len() == 1
        && path.file_name() == Some(name)
}
