//! Argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assay")]
#[command(about = "assay - ingest equity research reports into a knowledge graph and ask questions against it")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to ./assay.toml when present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a report file and wait for processing to finish
    Ingest {
        /// Path to the report file
        file: PathBuf,

        /// Return immediately after registering the upload
        #[arg(long)]
        no_wait: bool,
    },

    /// Show one report's processing status
    Status {
        /// Report id
        id: String,
    },

    /// List all reports
    List,

    /// Re-run a failed report from the beginning
    Retry {
        /// Report id
        id: String,

        /// Path to the original report file
        file: PathBuf,
    },

    /// Remove a report and its graph and vector data
    Remove {
        /// Report id
        id: String,
    },

    /// Ask a question against the ingested reports
    Ask {
        /// The question
        question: String,

        /// Generation provider to use for this question
        #[arg(long)]
        provider: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a summary of the knowledge graph
    Graph {
        /// Restrict to one report
        #[arg(long)]
        report: Option<String>,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}
