//! The `Path` value type.
//!
//! A path is an ordered list of segments plus two facts about the text it
//! came from: where it is anchored ([`PathKind`]) and whether it names a
//! directory. Segments never contain a separator; both `/` and `\` split.
//!
//! # Anchors
//!
//! `~` and any segment ending in `:` (`c:`, `pak:`) are anchors. Normalizing
//! a path restarts the segment list at the last anchor, so `a/b/c:/x`
//! normalizes to `c:/x`. A `..` right after an anchor is kept rather than
//! popping the anchor.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::PathError;
use crate::context::PathContext;

/// Where a path is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathKind {
    /// `a/b`, `~/x`, `../y`
    #[default]
    Relative,
    /// `/abc`
    Root,
    /// `c:/x`, `scheme://x`
    Drive,
}

/// An immutable, platform-independent path.
///
/// Equality and hashing are structural and case-sensitive. Use
/// [`Path::equals`] for the absolutizing, optionally case-insensitive
/// comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<String>,
    kind: PathKind,
    is_directory: bool,
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn is_drive(segment: &str) -> bool {
    segment.ends_with(':')
}

fn is_anchor(segment: &str) -> bool {
    segment == "~" || is_drive(segment)
}

/// Case-fold a name for comparisons and grouping keys.
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

/// Compare two names, optionally ignoring case.
pub fn names_match(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a == b || fold_case(a) == fold_case(b)
    }
}

impl Path {
    /// The empty relative path ("this directory" when not a directory).
    pub fn empty() -> Self {
        Self::default()
    }

    /// The bare root path, `/`.
    pub fn root_path() -> Self {
        Self {
            segments: Vec::new(),
            kind: PathKind::Root,
            is_directory: true,
        }
    }

    /// Parse text into a path.
    ///
    /// Whitespace around the text and around every segment is trimmed, and
    /// segments left empty are dropped, so doubled separators collapse.
    /// Parsing never fails; see [`Path::normalize`] for `.`/`..` handling.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }

        let segments: Vec<String> = text
            .split(is_separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        let kind = if text.starts_with(is_separator) {
            PathKind::Root
        } else if segments.iter().any(|s| is_drive(s)) {
            PathKind::Drive
        } else {
            PathKind::Relative
        };

        let is_directory = text.ends_with(is_separator)
            || segments
                .last()
                .is_some_and(|s| s == "." || s == ".." || is_anchor(s));

        Self {
            segments,
            kind,
            is_directory,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_relative(&self) -> bool {
        self.kind == PathKind::Relative
    }

    /// True when there are no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Remove `.` segments and resolvable `..` segments.
    ///
    /// A `..` is kept when nothing precedes it, when it follows another
    /// `..`, or when it follows an anchor. An anchor restarts the list and
    /// decides the kind: a drive makes the path [`PathKind::Drive`], `~`
    /// makes it [`PathKind::Relative`]. Idempotent.
    pub fn normalize(&self) -> Path {
        let mut kind = self.kind;
        let mut segments: Vec<String> = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment.as_str() {
                "." => {}
                ".." => match segments.last() {
                    Some(prev) if prev != ".." && !is_anchor(prev) => {
                        segments.pop();
                    }
                    _ => segments.push("..".to_string()),
                },
                s if is_anchor(s) => {
                    segments.clear();
                    segments.push(s.to_string());
                    kind = if is_drive(s) {
                        PathKind::Drive
                    } else {
                        PathKind::Relative
                    };
                }
                s => segments.push(s.to_string()),
            }
        }

        Path {
            segments,
            kind,
            is_directory: self.is_directory,
        }
    }

    /// Append `other` to this path and normalize.
    pub fn join(&self, other: &Path) -> Result<Path, PathError> {
        Path::combine([self, other])
    }

    /// Concatenate paths left to right and normalize the result.
    ///
    /// Every part after the first must be relative. The directory flag of
    /// the last part carries over to the result.
    pub fn combine<'a>(parts: impl IntoIterator<Item = &'a Path>) -> Result<Path, PathError> {
        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return Ok(Path::default());
        };

        let mut combined = first.clone();
        for part in parts {
            if part.kind != PathKind::Relative {
                return Err(PathError::InvalidOperation(format!(
                    "cannot combine non-relative path '{}'",
                    part
                )));
            }
            combined.segments.extend(part.segments.iter().cloned());
            combined.is_directory = part.is_directory;
        }

        Ok(combined.normalize())
    }

    /// False when a `..` climbs above the path's starting point.
    ///
    /// Drive paths may climb one level, as `c:/..` is still `c:/`.
    pub fn stays_inbound(&self) -> bool {
        let normalized = self.normalize();
        let base: i64 = if normalized.kind == PathKind::Drive { 1 } else { 0 };

        let mut depth = base;
        for segment in &normalized.segments {
            match segment.as_str() {
                ".." => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                s if is_anchor(s) => depth = base,
                _ => depth += 1,
            }
        }
        true
    }

    /// The anchor of the normalized path: `/`, the drive, or the empty path.
    pub fn root(&self) -> Path {
        let normalized = self.normalize();
        match normalized.kind {
            PathKind::Root => Path::root_path(),
            PathKind::Drive => Path {
                segments: normalized
                    .segments
                    .into_iter()
                    .take(1)
                    .filter(|s| is_drive(s))
                    .collect(),
                kind: PathKind::Drive,
                is_directory: true,
            },
            PathKind::Relative => Path::default(),
        }
    }

    /// Absolutize against the process working directory.
    pub fn absolute(&self) -> Path {
        self.absolute_in(&PathContext::process())
    }

    /// Absolutize against an explicit working directory.
    ///
    /// Relative paths are appended to the context's directory; anything
    /// else is only normalized.
    pub fn absolute_in(&self, ctx: &PathContext) -> Path {
        match self.kind {
            PathKind::Relative => {
                let mut combined = ctx.cwd().clone();
                combined.segments.extend(self.segments.iter().cloned());
                combined.is_directory = self.is_directory;
                combined.normalize()
            }
            PathKind::Root | PathKind::Drive => self.normalize(),
        }
    }

    /// Express this path relative to `base`, using the process working
    /// directory for relative operands.
    pub fn relative_to(&self, base: &Path, case_sensitive: bool) -> Result<Path, PathError> {
        self.relative_to_in(base, case_sensitive, &PathContext::process())
    }

    /// Express this path relative to `base`.
    ///
    /// Both operands are absolutized and must share a root. `base` is
    /// always treated as a directory.
    pub fn relative_to_in(
        &self,
        base: &Path,
        case_sensitive: bool,
        ctx: &PathContext,
    ) -> Result<Path, PathError> {
        let this = self.absolute_in(ctx);
        let base = base.absolute_in(ctx);

        let (this_root, base_root) = (this.root(), base.root());
        if this_root.kind != base_root.kind || !this_root.segments_equal(&base_root, case_sensitive) {
            return Err(PathError::DifferentRoots(this.to_string(), base.to_string()));
        }

        let common = this
            .segments
            .iter()
            .zip(&base.segments)
            .take_while(|(a, b)| names_match(a, b, case_sensitive))
            .count();

        let mut segments: Vec<String> =
            std::iter::repeat_n("..".to_string(), base.segments.len() - common).collect();
        segments.extend(this.segments[common..].iter().cloned());

        Ok(Path {
            segments,
            kind: PathKind::Relative,
            is_directory: this.is_directory,
        })
    }

    /// Compare against the process working directory.
    pub fn equals(&self, other: &Path, case_sensitive: bool) -> bool {
        self.equals_in(other, case_sensitive, &PathContext::process())
    }

    /// Compare two paths after absolutizing both. The directory flag is
    /// ignored.
    pub fn equals_in(&self, other: &Path, case_sensitive: bool, ctx: &PathContext) -> bool {
        let a = self.absolute_in(ctx);
        let b = other.absolute_in(ctx);
        a.kind == b.kind && a.segments_equal(&b, case_sensitive)
    }

    fn segments_equal(&self, other: &Path, case_sensitive: bool) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| names_match(a, b, case_sensitive))
    }

    /// The last segment, unless it is navigation or an anchor.
    pub fn file_name(&self) -> Option<&str> {
        self.segments
            .last()
            .map(String::as_str)
            .filter(|s| *s != "." && *s != ".." && !is_anchor(s))
    }

    /// The text after the last `.` of the file name, if the name has a stem.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// The normalized containing directory.
    ///
    /// `None` for the empty path and for paths ending in `..` or an anchor.
    pub fn parent(&self) -> Option<Path> {
        let mut normalized = self.normalize();
        normalized.file_name()?;
        normalized.segments.pop();
        normalized.is_directory = true;
        Some(normalized)
    }

    /// The same segments read as a relative path.
    ///
    /// Used to reinterpret `/a/b` as `a/b` below some other root.
    pub fn to_relative(&self) -> Path {
        Path {
            kind: PathKind::Relative,
            ..self.clone()
        }
    }

    /// The same path flagged as a directory.
    pub fn as_directory(&self) -> Path {
        Path {
            is_directory: true,
            ..self.clone()
        }
    }

    /// The same path with every segment case-folded.
    pub fn to_lowercase(&self) -> Path {
        Path {
            segments: self.segments.iter().map(|s| fold_case(s)).collect(),
            ..self.clone()
        }
    }

    /// Render with `/`.
    pub fn to_posix_string(&self) -> String {
        self.render('/')
    }

    /// Render with the host's separator.
    pub fn to_platform_string(&self) -> String {
        self.render(std::path::MAIN_SEPARATOR)
    }

    fn render(&self, separator: char) -> String {
        let mut out = String::new();
        if self.kind == PathKind::Root {
            out.push(separator);
        }
        if self.segments.is_empty() {
            // "this directory" needs a spelling that parses back as a directory
            if self.kind == PathKind::Relative && self.is_directory {
                out.push('.');
            }
            return out;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.push_str(segment);
        }
        if self.is_directory {
            out.push(separator);
        }
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_posix_string())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}
