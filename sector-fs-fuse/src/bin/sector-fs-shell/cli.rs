use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Disk image
    #[arg(long, short, default_value = "DISK")]
    pub disk: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh disk image holding an empty root directory
    Format,

    /// Create a fixed-size file
    Create { path: String, size: usize },

    /// Create an empty directory
    Mkdir { path: String },

    /// Copy a host file into the disk
    Cp { host: PathBuf, path: String },

    /// Print a file to stdout
    Cat { path: String },

    /// Remove a file or directory (children of a directory are not removed)
    Rm { path: String },

    /// Copy a file, even a removed one, out to the host
    Recover { path: String, host: PathBuf },

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,

        /// List the whole tree
        #[arg(long, short)]
        recursive: bool,
    },

    /// Dump the bitmap and the root directory
    Print,
}
