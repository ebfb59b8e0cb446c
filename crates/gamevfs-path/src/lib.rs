//! gamevfs-path: path algebra for the gamevfs asset filesystem.
//!
//! Asset paths come from humans and from tools, so they arrive with mixed
//! separators, `.`/`..` navigation and inconsistent case. This crate parses
//! them into a [`Path`] value that can be normalized, combined and compared
//! without touching the platform's path rules.
//!
//! Provides:
//! - **Path**: immutable segment list plus a [`PathKind`] and a directory flag
//! - **PathContext**: the working directory used to absolutize relative paths
//! - **PathError**: the two programmer errors path algebra can raise
//!
//! ```
//! use gamevfs_path::{Path, PathKind};
//!
//! let path = Path::parse(r"textures\.\ui/../Hero.PNG");
//! let normalized = path.normalize();
//! assert_eq!(normalized.to_posix_string(), "textures/Hero.PNG");
//! assert_eq!(normalized.kind(), PathKind::Relative);
//! ```
//!
//! This crate is a leaf dependency: no logging, no filesystem access besides
//! reading the process working directory in [`PathContext::process`].

mod context;
mod path;

pub use context::PathContext;
pub use path::{Path, PathKind, fold_case, names_match};

use thiserror::Error;

/// Errors from path algebra.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("paths do not share a root: {0} and {1}")]
    DifferentRoots(String, String),
}
