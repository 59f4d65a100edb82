//! Command line argument parsing for the index-compat CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::generator::GeneratorConfig;
use crate::verifier::VerifierConfig;

/// index-compat - Round-trip compatibility checks for segment index state
#[derive(Parser, Debug, Clone)]
#[command(name = "index-compat")]
#[command(about = "Verify that the text and binary index state encodings stay compatible")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct IndexCompatArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl IndexCompatArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a fixture and write it to a corpus directory
    #[command(name = "write-corpus")]
    WriteCorpus(WriteCorpusArgs),

    /// Read a corpus directory and check both encodings agree
    #[command(name = "read-corpus")]
    ReadCorpus(ReadCorpusArgs),

    /// Round-trip generated states through both codecs
    #[command(name = "self-check")]
    SelfCheck(SelfCheckArgs),

    /// Print the cross-version checks described by a manifest
    Plan(PlanArgs),
}

/// Options shared by commands that generate index states.
#[derive(Parser, Debug, Clone)]
pub struct GeneratorArgs {
    /// Seed for the state generator (random when omitted)
    #[arg(long, env = "INDEX_COMPAT_SEED")]
    pub seed: Option<u64>,

    /// Maximum number of index samples per state
    #[arg(long, default_value = "10000")]
    pub max_entries: usize,
}

impl GeneratorArgs {
    /// Build the verifier configuration these options describe.
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            seed: self.seed,
            generator: GeneratorConfig {
                max_entries: self.max_entries,
                ..Default::default()
            },
        }
    }
}

/// Arguments for writing a corpus
#[derive(Parser, Debug, Clone)]
pub struct WriteCorpusArgs {
    /// Corpus directory (created if missing)
    #[arg(value_name = "DIR")]
    pub corpus_dir: PathBuf,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

/// Arguments for reading a corpus
#[derive(Parser, Debug, Clone)]
pub struct ReadCorpusArgs {
    /// Corpus directory
    #[arg(value_name = "DIR")]
    pub corpus_dir: PathBuf,
}

/// Arguments for the self check
#[derive(Parser, Debug, Clone)]
pub struct SelfCheckArgs {
    /// Number of generated states to check
    #[arg(short = 'n', long, default_value = "100")]
    pub iterations: usize,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

/// Arguments for planning cross-version checks
#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    /// Compatibility manifest (JSON)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Only list checks expected to fail
    #[arg(long)]
    pub incompatible_only: bool,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
