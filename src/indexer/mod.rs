// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index lifecycle and bulk loading.
//!
//! [`IndexManager`] creates the document index on demand, embeds records on a
//! bounded worker pool and writes them in one bulk request.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::embedding::ChunkedEmbedder;
use crate::errors::{Result, SearchError, StoreError};
use crate::records::RawRecord;
use crate::store::{Document, DocumentFailure, IndexSchema, VectorStore};

/// How document keys are derived from input records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// 0-based position in the input; reloading overwrites by position.
    #[default]
    Position,
    /// blake3 of title, text and link; stable under reordering.
    ContentHash,
}

impl KeyStrategy {
    pub fn key(&self, position: usize, record: &RawRecord) -> String {
        match self {
            KeyStrategy::Position => position.to_string(),
            KeyStrategy::ContentHash => {
                let mut hasher = blake3::Hasher::new();
                for field in [&record.title, &record.text, &record.link] {
                    hasher.update(&(field.len() as u64).to_le_bytes());
                    hasher.update(field.as_bytes());
                }
                hasher.finalize().to_hex().to_string()
            }
        }
    }
}

/// Outcome of a load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub index: String,
    /// Whether this call created the index.
    pub created: bool,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: Vec<DocumentFailure>,
    pub duration_ms: u64,
}

/// Owns index creation and loading for one store.
pub struct IndexManager<S: VectorStore> {
    store: Arc<S>,
    embedder: ChunkedEmbedder,
    dims: usize,
    key_strategy: KeyStrategy,
    concurrency: usize,
    show_progress: bool,
}

impl<S: VectorStore> IndexManager<S> {
    /// `dims` is the vector dimension declared when an index is created.
    pub fn new(store: Arc<S>, embedder: ChunkedEmbedder, dims: usize) -> Self {
        Self {
            store,
            embedder,
            dims,
            key_strategy: KeyStrategy::default(),
            concurrency: 1,
            show_progress: false,
        }
    }

    pub fn with_key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }

    /// Number of records embedded at once during a load (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates the index if absent. Returns `true` when it was created.
    ///
    /// An existing index is left untouched, whatever its schema.
    pub fn ensure_index(&self, name: &str) -> Result<bool> {
        if self.store.index_exists(name)? {
            tracing::debug!(index = name, "index already exists");
            return Ok(false);
        }

        match self
            .store
            .create_index(name, &IndexSchema::documents(self.dims))
        {
            Ok(()) => {
                tracing::info!(index = name, dims = self.dims, "created index");
                Ok(true)
            }
            // lost a creation race; the other writer's index stands
            Err(StoreError::IndexExists(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Embeds every record and writes the batch, then refreshes the index.
    ///
    /// A record rejected as invalid input is reported in `failed` and the
    /// rest proceed. A provider error aborts before anything is written.
    /// The index is created first, so a failed load can leave it empty.
    pub fn bulk_load(&self, name: &str, records: &[RawRecord]) -> Result<LoadReport> {
        let start = Instant::now();
        let created = self.ensure_index(name)?;

        let mut failed = Vec::new();
        let mut seen = HashSet::with_capacity(records.len());
        let mut keyed = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let id = self.key_strategy.key(position, record);
            if seen.insert(id.clone()) {
                keyed.push((id, record));
            } else {
                tracing::warn!(index = name, id = %id, "skipping record with duplicate key");
                failed.push(DocumentFailure {
                    id,
                    reason: "duplicate key in load batch".to_string(),
                });
            }
        }

        let embedded = self.embed_records(&keyed)?;

        let mut documents = Vec::with_capacity(embedded.len());
        for ((id, record), outcome) in keyed.into_iter().zip(embedded) {
            match outcome {
                Ok(embedding) => documents.push(Document {
                    id,
                    title: record.title.clone(),
                    text: record.text.clone(),
                    link: record.link.clone(),
                    embedding,
                }),
                Err(reason) => {
                    tracing::warn!(index = name, id = %id, "skipping record: {}", reason);
                    failed.push(DocumentFailure { id, reason });
                }
            }
        }

        let mut indexed = 0;
        if !documents.is_empty() {
            let report = self.store.bulk_index(name, &documents)?;
            for failure in &report.failed {
                tracing::warn!(index = name, id = %failure.id, "store rejected document: {}", failure.reason);
            }
            indexed = report.indexed;
            failed.extend(report.failed);
        }
        self.store.refresh(name)?;

        let report = LoadReport {
            index: name.to_string(),
            created,
            indexed,
            skipped: 0,
            failed,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            index = name,
            indexed = report.indexed,
            failed = report.failed.len(),
            duration_ms = report.duration_ms,
            "bulk load finished"
        );
        Ok(report)
    }

    /// Loads only when the index does not exist yet.
    ///
    /// An existing index is reported as fully skipped and no embeddings are
    /// requested.
    pub fn load_if_absent(&self, name: &str, records: &[RawRecord]) -> Result<LoadReport> {
        if self.store.index_exists(name)? {
            tracing::info!(index = name, "index exists, skipping load");
            return Ok(LoadReport {
                index: name.to_string(),
                skipped: records.len(),
                ..LoadReport::default()
            });
        }
        self.bulk_load(name, records)
    }

    /// Deletes the index if present, then loads `records` into a fresh one.
    pub fn rebuild(&self, name: &str, records: &[RawRecord]) -> Result<LoadReport> {
        if self.store.index_exists(name)? {
            self.store.delete_index(name)?;
            tracing::info!(index = name, "deleted index for rebuild");
        }
        self.bulk_load(name, records)
    }

    /// Embeds records in input order. Invalid input is kept per record as a
    /// failure reason; the first other error stops the batch so no further
    /// provider calls are made.
    fn embed_records(
        &self,
        keyed: &[(String, &RawRecord)],
    ) -> Result<Vec<std::result::Result<Vec<f32>, String>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()
            .map_err(|e| SearchError::Configuration(format!("embedding pool: {}", e)))?;

        let pb = self.progress_bar(keyed.len());
        let results = pool.install(|| {
            keyed
                .par_iter()
                .map(|(_, record)| {
                    let outcome = match self.embedder.embed(&record.text) {
                        Ok(vector) => Ok(Ok(vector)),
                        Err(e) if e.is_invalid_input() => Ok(Err(e.to_string())),
                        Err(e) => Err(e),
                    };
                    pb.inc(1);
                    outcome
                })
                .collect::<Result<Vec<_>>>()
        });
        pb.finish_and_clear();

        results
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}/{len} records | Embedding")
        {
            pb.set_style(style.progress_chars("##."));
        }
        pb
    }
}
