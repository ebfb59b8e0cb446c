//! Archive-backed pools.
//!
//! An archive is a single file holding a flat table of entries followed by
//! their bytes (see [`format`]). Two pools read it:
//!
//! - [`ArchivePool`] parses the table once and builds a directory tree.
//! - [`IndexedArchivePool`] keeps the raw table and scans it per query.
//!
//! Both are constructed from a location string `archive-file[|base]`, where
//! the optional base scopes the pool to a directory inside the archive.

pub mod format;

mod eager;
mod indexed;

pub use eager::ArchivePool;
pub use format::{ARCHIVE_MAGIC, ARCHIVE_VERSION, ArchiveBuilder, ArchiveEntry, ArchiveTable, read_table};
pub use indexed::IndexedArchivePool;

use gamevfs_path::Path;

use crate::error::{VfsError, VfsResult};

/// Separates the archive file from the in-archive base in a location.
pub const ARCHIVE_BASE_DELIMITER: char = '|';

/// Split `data.pak|textures/ui` into the file and the base, if any.
pub fn split_location(location: &str) -> (&str, Option<&str>) {
    match location.split_once(ARCHIVE_BASE_DELIMITER) {
        Some((file, base)) => (file, Some(base)),
        None => (location, None),
    }
}

/// Validate an in-archive base and return it normalized.
pub(crate) fn scope_base(base: &str) -> VfsResult<Path> {
    let path = Path::parse(base);
    if !path.is_relative() {
        return Err(VfsError::AbsolutePath(base.to_string()));
    }
    if !path.stays_inbound() {
        return Err(VfsError::EscapingPath(base.to_string()));
    }
    Ok(path.normalize())
}
