// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by the embedding, indexing and search layers.
//!
//! Library code returns these typed errors; the binary wraps them in
//! `anyhow` with context before reporting.

use thiserror::Error;

/// Failure talking to an embedding provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, body).
    #[error("embedding request failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status.
    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response could not be mapped onto a vector.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    /// Segment vectors of one text disagree on length.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// External embedding command failed.
    #[error("embedding command failed: {0}")]
    Command(String),
}

/// Failure inside the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index '{0}' does not exist")]
    IndexNotFound(String),

    #[error("index '{0}' already exists")]
    IndexExists(String),

    /// Vector length disagrees with the index's declared dimension.
    #[error("vector has {actual} dimensions, index declares {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index schema has no dense vector field.
    #[error("invalid index schema: {0}")]
    InvalidSchema(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level error surfaced by [`ChunkedEmbedder`](crate::embedding::ChunkedEmbedder),
/// [`IndexManager`](crate::indexer::IndexManager) and
/// [`SearchEngine`](crate::search::SearchEngine).
#[derive(Debug, Error)]
pub enum SearchError {
    /// Missing credentials or unusable settings; raised before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SearchError {
    /// True for errors tied to a single input rather than a broken collaborator.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SearchError::InvalidInput(_))
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert_into_search_errors() {
        let err: SearchError = StoreError::IndexNotFound("sample".to_string()).into();
        assert!(matches!(err, SearchError::Store(StoreError::IndexNotFound(_))));
        assert_eq!(err.to_string(), "index 'sample' does not exist");
    }

    #[test]
    fn invalid_input_is_classified() {
        assert!(SearchError::InvalidInput("empty".into()).is_invalid_input());
        assert!(!SearchError::Configuration("key".into()).is_invalid_input());
    }
}
