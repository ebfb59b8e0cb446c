//! On-disk archive layout, reader and writer.
//!
//! All integers are little-endian.
//!
//! ```text
//! magic    "GPAK"
//! version  u32 (= 1)
//! count    u32
//! count × entry:
//!     path_len u16
//!     path     path_len bytes of UTF-8, '/'-separated, relative
//!     offset   u64
//!     length   u64
//! data
//! ```
//!
//! Entry offsets are relative to the first byte after the table.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use gamevfs_path::Path;

use crate::error::{VfsError, VfsResult};
use crate::resource::Content;

pub const ARCHIVE_MAGIC: [u8; 4] = *b"GPAK";
pub const ARCHIVE_VERSION: u32 = 1;

/// One file stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized relative path, as spelled in the table.
    pub path: Path,
    /// Offset from the start of the data section.
    pub offset: u64,
    pub length: u64,
}

/// A parsed entry table.
#[derive(Debug, Clone)]
pub struct ArchiveTable {
    pub entries: Vec<ArchiveEntry>,
    /// Absolute offset of the data section.
    pub data_offset: u64,
}

fn corrupt(what: impl Into<String>) -> VfsError {
    VfsError::CorruptArchive(what.into())
}

fn read_array<const N: usize>(reader: &mut impl Read, what: &str) -> VfsResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => corrupt(format!("truncated {what}")),
        _ => VfsError::Io(e),
    })?;
    Ok(buf)
}

/// Read and validate the header and entry table.
///
/// Every entry must name a relative, non-escaping, non-empty path and its
/// byte range must lie inside the data section.
pub fn read_table<R: Read + Seek>(reader: &mut R) -> VfsResult<ArchiveTable> {
    let magic: [u8; 4] = read_array(reader, "header")?;
    if magic != ARCHIVE_MAGIC {
        return Err(VfsError::BadArchiveMagic {
            expected: ARCHIVE_MAGIC,
            found: magic,
        });
    }
    let version = u32::from_le_bytes(read_array(reader, "header")?);
    if version != ARCHIVE_VERSION {
        return Err(VfsError::UnsupportedArchiveVersion(version));
    }
    let count = u32::from_le_bytes(read_array(reader, "header")?);

    let mut entries = Vec::new();
    for index in 0..count {
        let path_len = u16::from_le_bytes(read_array(reader, "entry table")?);
        let mut raw = vec![0u8; usize::from(path_len)];
        reader.read_exact(&mut raw).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => corrupt("truncated entry table"),
            _ => VfsError::Io(e),
        })?;
        let text = String::from_utf8(raw)
            .map_err(|_| corrupt(format!("entry {index}: path is not UTF-8")))?;
        let offset = u64::from_le_bytes(read_array(reader, "entry table")?);
        let length = u64::from_le_bytes(read_array(reader, "entry table")?);

        let path = Path::parse(&text);
        if !path.is_relative() || !path.stays_inbound() {
            return Err(corrupt(format!("entry {index}: bad path '{text}'")));
        }
        let path = path.normalize();
        if path.is_empty() {
            return Err(corrupt(format!("entry {index}: empty path")));
        }
        entries.push(ArchiveEntry {
            path,
            offset,
            length,
        });
    }

    let data_offset = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    let data_len = end.saturating_sub(data_offset);
    for entry in &entries {
        let in_range = entry
            .offset
            .checked_add(entry.length)
            .is_some_and(|stop| stop <= data_len);
        if !in_range {
            return Err(corrupt(format!(
                "entry '{}' lies outside the data section",
                entry.path
            )));
        }
    }

    Ok(ArchiveTable {
        entries,
        data_offset,
    })
}

/// Open an archive file and read its table.
pub(crate) fn load(file: &std::path::Path) -> VfsResult<(PathBuf, ArchiveTable)> {
    let file = std::path::absolute(file)?;
    let mut reader = BufReader::new(File::open(&file)?);
    let table = read_table(&mut reader)?;
    tracing::debug!(
        archive = %file.display(),
        entries = table.entries.len(),
        "read archive table"
    );
    Ok((file, table))
}

/// Open one entry's bytes through a fresh handle on the archive file.
pub(crate) fn open_entry(file: &std::path::Path, start: u64, length: u64) -> Option<Content> {
    let reader = BufReader::new(File::open(file).ok()?);
    let stream = SubStream::new(reader, start, length).ok()?;
    Some(Box::new(stream))
}

/// A window `[start, start + len)` onto a seekable stream.
#[derive(Debug)]
pub struct SubStream<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R: Seek> SubStream<R> {
    pub fn new(mut inner: R, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            len,
            pos: 0,
        })
    }
}

impl<R: Read> Read for SubStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        let max = usize::try_from(remaining).unwrap_or(usize::MAX).min(buf.len());
        if max == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..max])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for SubStream<R> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let base = match target {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let Some(pos) = base else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of entry",
            ));
        };
        self.inner.seek(SeekFrom::Start(self.start.saturating_add(pos)))?;
        self.pos = pos;
        Ok(pos)
    }
}

/// Writes archives in the format [`read_table`] accepts.
///
/// Entries are written in insertion order. Duplicates are written as given;
/// readers keep the first.
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file. The path must be relative, non-escaping and non-empty.
    pub fn add_file(&mut self, path: impl Into<Path>, bytes: impl Into<Vec<u8>>) -> VfsResult<()> {
        let path = path.into();
        let text = path.to_posix_string();
        if !path.is_relative() {
            return Err(VfsError::AbsolutePath(text));
        }
        if !path.stays_inbound() {
            return Err(VfsError::EscapingPath(text));
        }
        let normalized = path.normalize();
        if normalized.is_empty() {
            return Err(VfsError::InvalidOperation(format!(
                "archive entry needs a file name: '{text}'"
            )));
        }
        let name = normalized.segments().join("/");
        if u16::try_from(name.len()).is_err() {
            return Err(VfsError::InvalidOperation(format!(
                "archive entry path too long: {} bytes",
                name.len()
            )));
        }
        self.files.push((name, bytes.into()));
        Ok(())
    }

    /// Builder form of [`add_file`](Self::add_file).
    pub fn with_file(mut self, path: impl Into<Path>, bytes: impl Into<Vec<u8>>) -> VfsResult<Self> {
        self.add_file(path, bytes)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Encode the whole archive in memory.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&ARCHIVE_MAGIC);
        out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.files.len() as u32).to_le_bytes());

        let mut offset = 0u64;
        for (name, bytes) in &self.files {
            // add_file checked that the name fits.
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            offset += bytes.len() as u64;
        }
        for (_, bytes) in &self.files {
            out.extend_from_slice(bytes);
        }
        out
    }

    pub fn write_to(&self, writer: &mut impl Write) -> VfsResult<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Write the archive to a host file, replacing it if present.
    pub fn write_file(&self, path: impl AsRef<std::path::Path>) -> VfsResult<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}
