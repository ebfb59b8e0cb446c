//! gamevfs command line: argument parsing and command execution.
//!
//! Kept separate from `main.rs` so the commands can be exercised in tests
//! with an in-process writer instead of stdout.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use gamevfs::{
    ArchiveBuilder, FilesystemPool, PoolConfig, Resource, ResourcePoolExt, ResourceType,
    VfsConfig, VirtualFileSystem,
};

/// What to do once the pool stack is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Type(String),
    Ls(String),
    Cat(String),
    Pack { dir: PathBuf, out: PathBuf },
    Help,
    Version,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub config: Option<PathBuf>,
    /// Extra pool locations registered after the configured pools.
    pub pools: Vec<String>,
    pub command: Command,
}

/// Whether the queried path was there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Found,
    Missing,
}

/// Parse arguments, excluding the program name.
pub fn parse_args(args: &[String]) -> Result<Options> {
    let mut config = None;
    let mut pools = Vec::new();
    let mut rest = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Ok(Options {
                    config,
                    pools,
                    command: Command::Help,
                });
            }
            "-V" | "--version" => {
                return Ok(Options {
                    config,
                    pools,
                    command: Command::Version,
                });
            }
            "--config" => {
                let path = iter.next().context("--config requires a file argument")?;
                config = Some(PathBuf::from(path));
            }
            "--pool" => {
                let location = iter.next().context("--pool requires a location argument")?;
                pools.push(location.clone());
            }
            other if other.starts_with("--config=") => {
                config = Some(PathBuf::from(&other["--config=".len()..]));
            }
            other if other.starts_with("--pool=") => {
                pools.push(other["--pool=".len()..].to_string());
            }
            other if other.starts_with('-') && other.len() > 1 => {
                bail!("unknown option: {other}");
            }
            other => rest.push(other.to_string()),
        }
    }

    let mut rest = rest.into_iter();
    let command = match rest.next().as_deref() {
        Some("type") => Command::Type(rest.next().context("type requires a path")?),
        Some("ls") => Command::Ls(rest.next().unwrap_or_default()),
        Some("cat") => Command::Cat(rest.next().context("cat requires a path")?),
        Some("pack") => {
            let dir = rest.next().context("pack requires a source directory")?;
            let out = rest.next().context("pack requires an output file")?;
            Command::Pack {
                dir: dir.into(),
                out: out.into(),
            }
        }
        Some(unknown) => bail!("unknown command: {unknown}"),
        None => Command::Help,
    };
    if let Some(extra) = rest.next() {
        bail!("unexpected argument: {extra}");
    }

    Ok(Options {
        config,
        pools,
        command,
    })
}

/// The configured pools followed by the `--pool` locations.
///
/// Without `--config` the default config file is read if it exists.
pub fn build_vfs(options: &Options) -> Result<VirtualFileSystem> {
    let config = match &options.config {
        Some(path) => VfsConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VfsConfig::load().context("failed to load default config")?,
    };

    let mut vfs = config.build().context("failed to build configured pools")?;
    for location in &options.pools {
        let pool = PoolConfig::from_location(location)
            .build(None)
            .with_context(|| format!("failed to open pool {location}"))?;
        vfs.add_shared_pool(pool);
    }
    Ok(vfs)
}

/// Run a query command against `vfs`, writing results to `out`.
pub fn run_query(vfs: &VirtualFileSystem, command: &Command, out: &mut impl Write) -> Result<Status> {
    match command {
        Command::Type(path) => {
            let kind = vfs.resource_type(path);
            writeln!(out, "{kind}")?;
            Ok(found(kind.exists()))
        }
        Command::Ls(path) => {
            if vfs.resource_type(path) != ResourceType::Directory {
                return Ok(Status::Missing);
            }
            for name in vfs.list_directory(path) {
                writeln!(out, "{name}")?;
            }
            Ok(Status::Found)
        }
        Command::Cat(path) => match vfs.read_file(path) {
            Some(bytes) => {
                out.write_all(&bytes)?;
                Ok(Status::Found)
            }
            None => Ok(Status::Missing),
        },
        Command::Pack { .. } | Command::Help | Command::Version => {
            bail!("not a query command: {command:?}")
        }
    }
}

fn found(exists: bool) -> Status {
    if exists { Status::Found } else { Status::Missing }
}

/// Pack every file under `dir` into an archive at `out`.
///
/// Returns the number of files written.
pub fn pack(dir: &std::path::Path, out: &std::path::Path) -> Result<usize> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    let pool = FilesystemPool::new(dir);

    let mut builder = ArchiveBuilder::new();
    collect(&pool.root(), &mut builder)?;
    builder
        .write_file(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    tracing::debug!(files = builder.len(), out = %out.display(), "packed archive");
    Ok(builder.len())
}

fn collect(dir: &Resource<'_>, builder: &mut ArchiveBuilder) -> Result<()> {
    for file in dir.files() {
        let mut content = file
            .open_content()
            .with_context(|| format!("failed to open {}", file.path()))?;
        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", file.path()))?;
        builder.add_file(file.path().clone(), bytes)?;
    }
    for child in dir.directories() {
        collect(&child, builder)?;
    }
    Ok(())
}

pub fn print_help() {
    println!(
        r#"gamevfs v{}

Usage:
  gamevfs [OPTIONS] <command>

Commands:
  type <path>                  Print file, directory or non-existent
  ls [path]                    List a directory (union of all pools)
  cat <path>                   Write a file's bytes to stdout
  pack <dir> <out.pak>         Pack a directory into an archive

Options:
  --config=<file>              Pool config (default: <config dir>/gamevfs/vfs.toml)
  --pool=<location>            Add a pool: a directory, a .pak file, or file|base
  -h, --help                   Show this help
  -V, --version                Show version

Paths are matched ignoring case; pools are searched in order.
Exit status is 1 when the queried path does not exist.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
