// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations for the semdex binary

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semdex::config::{Config, ConfigOutputFormat};
use semdex::embedding::{create_provider, ChunkConfig, ChunkedEmbedder, EmbeddingProviderConfig};
use semdex::indexer::IndexManager;
use semdex::output::{
    append_results, colorize_dim, colorize_link, colorize_score, colorize_title, preview,
    use_colors,
};
use semdex::records::load_records;
use semdex::search::SearchEngine;
use semdex::store::{SqliteStore, VectorStore};

use crate::cli::OutputFormat;

/// Shared state resolved from config and global flags.
pub struct AppContext {
    pub config: Config,
    pub format: OutputFormat,
    store_path: PathBuf,
}

impl AppContext {
    pub fn new(format: Option<OutputFormat>, store: Option<PathBuf>) -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let format = format.unwrap_or_else(|| match config.output_format() {
            Some(ConfigOutputFormat::Json) => OutputFormat::Json,
            _ => OutputFormat::Text,
        });
        let store_path = store.unwrap_or_else(|| config.store.path());
        Ok(Self {
            config,
            format,
            store_path,
        })
    }

    fn open_store(&self) -> Result<Arc<SqliteStore>> {
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory: {}", parent.display())
                })?;
            }
        }
        let store = SqliteStore::open(&self.store_path)
            .with_context(|| format!("Failed to open store: {}", self.store_path.display()))?;
        Ok(Arc::new(store))
    }

    fn embedder(&self) -> Result<ChunkedEmbedder> {
        let embeddings = self.config.embeddings();
        let provider = create_provider(&EmbeddingProviderConfig::from_config(embeddings))
            .context("Failed to set up embedding provider")?;
        let embedder = ChunkedEmbedder::new(provider, ChunkConfig::new(embeddings.max_tokens())?)?
            .with_empty_text_policy(embeddings.empty_text());
        Ok(embedder)
    }
}

/// Load records into an index.
pub fn index(ctx: &AppContext, file: &Path, index: Option<&str>, rebuild: bool, force: bool) -> Result<()> {
    let name = ctx.config.merge_index_name(index);
    let records = load_records(file)?;

    let manager = IndexManager::new(
        ctx.open_store()?,
        ctx.embedder()?,
        ctx.config.embeddings().dimension(),
    )
    .with_key_strategy(ctx.config.index().key_strategy())
    .with_concurrency(ctx.config.embeddings().concurrency())
    .with_progress(ctx.format == OutputFormat::Text);

    let result = if rebuild {
        manager.rebuild(&name, &records)
    } else if force {
        manager.bulk_load(&name, &records)
    } else {
        manager.load_if_absent(&name, &records)
    };
    let report = result.with_context(|| format!("Failed to load records into index '{}'", name))?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let use_color = use_colors();
            if report.skipped > 0 {
                println!(
                    "Index '{}' already exists; skipped {} records (use --force or --rebuild)",
                    name, report.skipped
                );
                return Ok(());
            }
            let mark = if use_color {
                "✓".green().to_string()
            } else {
                "✓".to_string()
            };
            println!(
                "{} Indexed {} records into '{}' in {} ms",
                mark, report.indexed, name, report.duration_ms
            );
            for failure in &report.failed {
                println!(
                    "  {} {}: {}",
                    if use_color { "✗".red().to_string() } else { "✗".to_string() },
                    failure.id,
                    colorize_dim(&failure.reason, use_color)
                );
            }
        }
    }

    Ok(())
}

/// Search an index and print (and optionally append) the ranked results.
pub fn search(
    ctx: &AppContext,
    query: &str,
    index: Option<&str>,
    top_k: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let name = ctx.config.merge_index_name(index);
    let top_k = ctx.config.merge_top_k(top_k);

    let engine = SearchEngine::new(ctx.open_store()?, ctx.embedder()?);
    let results = engine
        .search(query, &name, top_k)
        .with_context(|| format!("Failed to search index '{}'", name))?;

    if let Some(path) = output {
        append_results(path, &results)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
    }

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            let use_color = use_colors();
            if results.is_empty() {
                println!("No results found for: {}", query);
                return Ok(());
            }
            println!("\nFound {} results for: {}\n", results.len(), query);
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{}. {}  {}",
                    rank + 1,
                    colorize_title(&result.title, use_color),
                    colorize_score(result.score, use_color)
                );
                println!("   {}", colorize_link(&result.link, use_color));
                if !result.text.is_empty() {
                    println!("   {}", colorize_dim(&preview(&result.text, 120), use_color));
                }
                println!();
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct StatusOutput {
    index: String,
    exists: bool,
    store: String,
    #[serde(flatten)]
    info: Option<semdex::store::IndexInfo>,
}

/// Report whether an index exists and what it holds.
pub fn status(ctx: &AppContext, index: Option<&str>) -> Result<()> {
    let name = ctx.config.merge_index_name(index);
    let store = ctx.open_store()?;
    let info = store
        .index_info(&name)
        .with_context(|| format!("Failed to read index '{}'", name))?;

    match ctx.format {
        OutputFormat::Json => {
            let status = StatusOutput {
                index: name,
                exists: info.is_some(),
                store: ctx.store_path.display().to_string(),
                info,
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => match info {
            None => println!("Index '{}' does not exist", name),
            Some(info) => {
                println!("Index:      {}", info.name);
                println!("Store:      {}", ctx.store_path.display());
                println!("Documents:  {}", info.document_count);
                if info.pending_count > 0 {
                    println!("Pending:    {}", info.pending_count);
                }
                println!("Dimension:  {}", info.dims);
            }
        },
    }

    Ok(())
}
