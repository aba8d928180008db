//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// KnowFlow CLI - tear documents into knowledge, batch by batch.
#[derive(Debug, Parser)]
#[command(name = "knowflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a source file: create its sidecar, ready for batching
    Ingest {
        /// The text, markdown, or image file to ingest
        file: PathBuf,
    },

    /// Run one extraction batch against an ingested document
    Batch {
        /// The source file or its .zsd sidecar
        file: PathBuf,

        /// Override the configured worker count (1 or 2)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show a document's progress and knowledge tree summary
    Status {
        /// The source file or its .zsd sidecar
        file: PathBuf,
    },

    /// Show the learning context carried between batches
    Context {
        /// The source file or its .zsd sidecar
        file: PathBuf,
    },

    /// Generate practice questions from selected knowledge points
    Questions {
        /// The source file or its .zsd sidecar
        file: PathBuf,

        /// Question types (choice, fill, calculation, short_answer, proof)
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<String>,

        /// Questions per type (defaults from config)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Difficulty 1-3 (defaults from config)
        #[arg(short, long)]
        difficulty: Option<u8>,
    },
}
