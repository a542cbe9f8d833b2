//! Command-line argument definitions for the Scena CLI.
//!
//! This module defines the [`Args`] structure parsed from the command
//! line using [`clap`]. Arguments select the operation, input/output
//! paths, configuration file, and logging verbosity.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Scena composition toolkit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

/// The operations the CLI exposes.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a composition document and write the regenerated text
    Convert {
        /// Path to the input composition file
        input: String,

        /// Path to the output composition file
        #[arg(short, long, default_value = "out.scn")]
        output: String,

        /// Fail on critical diagnostics instead of reporting them
        #[arg(long)]
        strict: bool,
    },

    /// Validate a composition document and report diagnostics
    Validate {
        /// Path to the input composition file
        input: String,
    },

    /// Enhance a composition document (transition repair + richness
    /// augmentation) and write the regenerated text
    Enhance {
        /// Path to the input composition file
        input: String,

        /// Path to the output composition file
        #[arg(short, long, default_value = "out.scn")]
        output: String,

        /// Project domain hint for data augmentation (e.g. "chart")
        #[arg(long)]
        hint: Option<String>,

        /// Fail on critical diagnostics instead of reporting them
        #[arg(long)]
        strict: bool,
    },
}
