//! Command-line surface.

use clap::{Parser, Subcommand};
use lookout_core::Platform;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lookout")]
#[command(about = "Watch social platforms for posts with buying intent")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the XDG config location)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan on start (if configured), then on every interval until Ctrl-C
    Run,

    /// Scan once now
    Scan {
        /// Restrict the scan to these platforms (repeatable)
        #[arg(long = "platform", value_name = "ID", value_parser = parse_platform)]
        platforms: Vec<Platform>,
    },

    /// List loaded platform definitions
    Platforms,

    /// Show recently stored leads
    Leads {
        /// Maximum number of leads to print
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

fn parse_platform(raw: &str) -> Result<Platform, String> {
    raw.parse().map_err(|e: lookout_core::LookoutError| e.to_string())
}
