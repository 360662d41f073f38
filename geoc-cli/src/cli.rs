use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "geocli",
    about = "Build and check the geoc WASM host",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the guest with zig, the host with wasm-pack, and assemble dist/
    Build {
        /// Optimised build for both guest and host
        #[arg(long)]
        release: bool,
    },
    /// Validate and print the resolved host configuration
    Config {
        /// Read a standalone host config instead of geoc.toml's [host] table
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Report which build tools are available
    Doctor,
}
