//! Command-line argument parsing
//!
//! One mode flag: `--ingest` runs ingestion once and exits; without it the
//! binary enters the interactive ask loop.

use clap::Parser;
use std::path::PathBuf;

/// Ask questions about your Gmail inbox using retrieval-augmented generation
#[derive(Parser, Debug)]
#[command(name = "inboxqa")]
#[command(version)]
#[command(about = "Chat with your inbox: ingest emails into a vector index, then ask questions")]
pub struct Args {
    /// Fetch emails and store them in the vector index, then exit
    #[arg(long)]
    pub ingest: bool,

    /// Gmail search query used during ingestion (overrides the config file)
    #[arg(long)]
    pub mail_query: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter directive for this verbosity
    pub fn filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "inboxqa=info",
            Verbosity::Verbose => "inboxqa=debug",
            Verbosity::VeryVerbose => "trace",
        }
    }
}
