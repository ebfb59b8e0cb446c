//! Error type for pool construction and tree lookups.
//!
//! Probing for a missing path is not an error anywhere in this crate: it
//! shows up as [`ResourceType::NonExistent`](crate::ResourceType), `None` or
//! an empty listing. `VfsError` is reserved for malformed input, broken
//! archives and configuration problems.

use gamevfs_path::PathError;
use thiserror::Error;

/// Result type for fallible gamevfs operations.
pub type VfsResult<T> = Result<T, VfsError>;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("absolute path not allowed here: {0}")]
    AbsolutePath(String),
    #[error("path escapes its base: {0}")]
    EscapingPath(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad archive magic: expected {expected:?}, found {found:?}")]
    BadArchiveMagic { expected: [u8; 4], found: [u8; 4] },
    #[error("unsupported archive version: {0}")]
    UnsupportedArchiveVersion(u32),
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
