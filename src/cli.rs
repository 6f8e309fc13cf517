// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// semdex - Semantic document search
///
/// Embeds (title, text, link) records into a local vector index and ranks
/// them against natural-language queries by cosine similarity.
#[derive(Parser, Debug)]
#[command(name = "semdex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Path to the SQLite store (default: .semdex/store.sqlite)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load records into an index (skipped if the index already exists)
    Index {
        /// Records file (JSON array or JSON Lines with Title/Text/Link)
        #[arg(short, long)]
        file: PathBuf,

        /// Index name (default: from config, else "sample")
        #[arg(short, long)]
        index: Option<String>,

        /// Delete the index first and load from scratch
        #[arg(long, conflicts_with = "force")]
        rebuild: bool,

        /// Load even if the index already exists, overwriting by key
        #[arg(long)]
        force: bool,
    },

    /// Search an index with a natural-language query
    #[command(visible_alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Index name (default: from config, else "sample")
        #[arg(short, long)]
        index: Option<String>,

        /// Maximum number of results (default: from config, else 5)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        /// Append Similarity/Title/Link blocks to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show whether an index exists and what it holds
    Status {
        /// Index name (default: from config, else "sample")
        #[arg(short, long)]
        index: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
