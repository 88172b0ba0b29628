//! sysmod-rs-meminfo: memory statistics module binary.
//!
//! Without flags it speaks the orchestrator module protocol: one JSON request
//! on stdin, one JSON response on stdout.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process;
use sysmod_rs_core::{logging, GlobalConfig};
use sysmod_rs_meminfo::{handler, manual, Settings};

/// Command-line arguments for the meminfo module.
#[derive(Parser)]
#[command(name = "sysmod-rs-meminfo")]
#[command(about = "Memory statistics module for sysmod-rs")]
#[command(version)]
#[command(author)]
struct Args {
    /// Read memory statistics from this file instead of /proc/meminfo
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Check that the source is readable and complete, then exit
    #[arg(long, conflicts_with_all = ["dump", "manual"])]
    check: bool,

    /// Print all fields in kB as JSON and exit (exits 1 if MemFree is unknown)
    #[arg(long, conflicts_with = "manual")]
    dump: bool,

    /// Print the module documentation and exit
    #[arg(long)]
    manual: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loaded = GlobalConfig::load();
    let log_level = loaded
        .as_ref()
        .map_or_else(|_| GlobalConfig::default().log_level, |c| c.log_level.clone());
    logging::init(&log_level);

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration: {}", e);
        GlobalConfig::default()
    });

    let mut settings = Settings::from_config(&config);
    if let Some(source) = args.source {
        settings = settings.with_source(source);
    }

    if args.manual {
        print!("{}", manual::render());
        return Ok(());
    }

    if args.check {
        process::exit(handler::check(&settings).emit());
    }

    if args.dump {
        process::exit(handler::dump(&settings)?.emit());
    }

    if let Err(e) = sysmod_rs_meminfo::run(io::stdin().lock(), io::stdout().lock(), &settings) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    Ok(())
}
