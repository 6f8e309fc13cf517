// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic search over an indexed document collection.

use serde::Serialize;
use std::sync::Arc;

use crate::embedding::ChunkedEmbedder;
use crate::errors::{Result, SearchError, StoreError};
use crate::store::{ScoreExpression, ScoredQuery, VectorStore};

/// A ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    /// Normalized cosine similarity in `[0, 1]`.
    pub score: f32,
    pub title: String,
    pub link: String,
    pub text: String,
}

/// Embeds queries and ranks stored documents against them.
pub struct SearchEngine<S: VectorStore> {
    store: Arc<S>,
    embedder: ChunkedEmbedder,
}

impl<S: VectorStore> SearchEngine<S> {
    pub fn new(store: Arc<S>, embedder: ChunkedEmbedder) -> Self {
        Self { store, embedder }
    }

    /// Returns at most `top_k` documents of `index` by descending score.
    ///
    /// Equal scores are ordered by ascending document id, numerically for
    /// integer ids.
    pub fn search(&self, query: &str, index: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(SearchError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !self.store.index_exists(index)? {
            return Err(StoreError::IndexNotFound(index.to_string()).into());
        }

        let query_vector = self.embedder.embed(query)?;
        tracing::debug!(index, top_k, dims = query_vector.len(), "running scored query");

        let hits = self.store.scored_query(
            index,
            &ScoredQuery {
                expression: ScoreExpression::NormalizedCosine,
                query_vector,
                top_k,
            },
        )?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                id: hit.document.id,
                score: hit.score,
                title: hit.document.title,
                link: hit.document.link,
                text: hit.document.text,
            })
            .collect())
    }
}
