//! gamevfs CLI entry point.
//!
//! Usage:
//!   gamevfs type <path>              # file, directory or non-existent
//!   gamevfs ls [path]                # merged directory listing
//!   gamevfs cat <path>               # file bytes to stdout
//!   gamevfs pack <dir> <out.pak>     # build an archive
//!   gamevfs --pool=<loc> ...         # add pools beyond the config file

use std::env;
use std::io;
use std::process::ExitCode;

use anyhow::Result;
use gamevfs_cli::{Command, Status};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = gamevfs_cli::parse_args(&args)?;

    match &options.command {
        Command::Help => {
            gamevfs_cli::print_help();
            Ok(ExitCode::SUCCESS)
        }

        Command::Version => {
            println!("gamevfs {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Command::Pack { dir, out } => {
            let count = gamevfs_cli::pack(dir, out)?;
            println!("packed {count} files into {}", out.display());
            Ok(ExitCode::SUCCESS)
        }

        query => {
            let vfs = gamevfs_cli::build_vfs(&options)?;
            let mut stdout = io::stdout().lock();
            match gamevfs_cli::run_query(&vfs, query, &mut stdout)? {
                Status::Found => Ok(ExitCode::SUCCESS),
                Status::Missing => Ok(ExitCode::FAILURE),
            }
        }
    }
}
