//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pkgfetch - fetch and verify signed multi-part packages
#[derive(Parser)]
#[command(name = "pkgfetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch and verify signed multi-part packages")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a package manifest and all of its parts
    Fetch {
        /// Manifest URL (overrides config)
        #[arg(long, value_name = "URL")]
        manifest_url: Option<String>,

        /// Manifest signature (overrides config)
        #[arg(long, value_name = "SIGNATURE", conflicts_with = "signature_file")]
        signature: Option<String>,

        /// Read the manifest signature from a file
        #[arg(long, value_name = "PATH")]
        signature_file: Option<PathBuf>,

        /// Destination directory (overrides config)
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
    },
}
