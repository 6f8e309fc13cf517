// SPDX-License-Identifier: MIT OR Apache-2.0

//! semdex - Semantic document search tool
//!
//! Loads (title, text, link) records into a local vector index using
//! OpenAI-compatible embeddings and answers natural-language queries by
//! normalized cosine similarity.

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing with SEMDEX_LOG env var (e.g., SEMDEX_LOG=debug semdex search "query")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SEMDEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let ctx = commands::AppContext::new(cli.format, cli.store)?;

    match cli.command {
        Commands::Index {
            file,
            index,
            rebuild,
            force,
        } => {
            commands::index(&ctx, &file, index.as_deref(), rebuild, force)?;
        }
        Commands::Search {
            query,
            index,
            top_k,
            output,
        } => {
            commands::search(&ctx, &query, index.as_deref(), top_k, output.as_deref())?;
        }
        Commands::Status { index } => {
            commands::status(&ctx, index.as_deref())?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "semdex", &mut std::io::stdout());
        }
    }

    Ok(())
}
