// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store boundary.
//!
//! The indexer and search engine only talk to storage through
//! [`VectorStore`]. Responses are parsed into the typed records below once,
//! at the boundary.

pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::errors::StoreError;

pub use sqlite::SqliteStore;

/// Output dimension of OpenAI's text-embedding-ada-002.
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Name of the dense vector field in the document schema.
pub const EMBEDDING_FIELD: &str = "embedding";

/// Field type in an index schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text,
    DenseVector { dims: usize },
}

/// One named field of an index schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
}

/// Field name to type mapping, declared once when an index is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub fields: Vec<SchemaField>,
}

impl IndexSchema {
    /// The document schema: `title`, `text`, `link` as text plus a dense
    /// `embedding` vector of `dims` dimensions.
    pub fn documents(dims: usize) -> Self {
        let text = |name: &str| SchemaField {
            name: name.to_string(),
            field_type: FieldType::Text,
        };
        Self {
            fields: vec![
                text("title"),
                text("text"),
                text("link"),
                SchemaField {
                    name: EMBEDDING_FIELD.to_string(),
                    field_type: FieldType::DenseVector { dims },
                },
            ],
        }
    }

    /// Dimension of the first dense vector field, if any.
    pub fn vector_dims(&self) -> Option<usize> {
        self.fields.iter().find_map(|field| match field.field_type {
            FieldType::DenseVector { dims } => Some(dims),
            FieldType::Text => None,
        })
    }
}

/// A stored document with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store key, unique within an index.
    pub id: String,
    pub title: String,
    pub text: String,
    pub link: String,
    pub embedding: Vec<f32>,
}

/// Scoring function evaluated by the store for every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreExpression {
    /// `(cosineSimilarity(query, embedding) + 1.0) / 2.0`, in `[0, 1]`.
    #[default]
    NormalizedCosine,
}

impl ScoreExpression {
    pub fn score(&self, query: &[f32], embedding: &[f32]) -> f32 {
        match self {
            ScoreExpression::NormalizedCosine => {
                ((cosine_similarity(query, embedding) + 1.0) / 2.0).clamp(0.0, 1.0)
            }
        }
    }
}

/// A scored top-k query.
#[derive(Debug, Clone)]
pub struct ScoredQuery {
    pub expression: ScoreExpression,
    /// Query vector bound to the expression's `query` parameter.
    pub query_vector: Vec<f32>,
    pub top_k: usize,
}

/// One scored document returned by [`VectorStore::scored_query`].
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub score: f32,
    pub document: Document,
}

/// A document the store refused during a bulk write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of a bulk write; documents are applied independently.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub indexed: usize,
    pub failed: Vec<DocumentFailure>,
}

/// Summary of an index for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub dims: usize,
    pub document_count: u64,
    pub pending_count: u64,
    pub created_at: i64,
    pub last_refresh: Option<i64>,
}

/// Storage capability consumed by the indexer and search engine.
///
/// Writes are buffered until [`refresh`](VectorStore::refresh); reads only
/// see refreshed documents.
pub trait VectorStore: Send + Sync {
    fn index_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates an index. Fails with `IndexExists` if `name` is taken.
    fn create_index(&self, name: &str, schema: &IndexSchema) -> Result<(), StoreError>;

    /// Deletes an index and all of its documents.
    fn delete_index(&self, name: &str) -> Result<(), StoreError>;

    /// Writes (or wholesale replaces) one document.
    fn index_document(&self, name: &str, document: &Document) -> Result<(), StoreError>;

    /// Writes many documents; each succeeds or fails on its own.
    fn bulk_index(&self, name: &str, documents: &[Document]) -> Result<BulkReport, StoreError>;

    /// Makes all buffered writes visible to reads.
    fn refresh(&self, name: &str) -> Result<(), StoreError>;

    /// Scores every visible document and returns the `top_k` best, highest
    /// score first.
    fn scored_query(&self, name: &str, query: &ScoredQuery) -> Result<Vec<ScoredHit>, StoreError>;

    fn get_document(&self, name: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Number of visible documents.
    fn count(&self, name: &str) -> Result<u64, StoreError>;

    fn index_info(&self, name: &str) -> Result<Option<IndexInfo>, StoreError>;
}

/// Orders document keys for tie-breaking.
///
/// Integer keys compare numerically and sort before all other keys, which
/// compare lexicographically. Position keys therefore tie-break in input order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Computes cosine similarity between two vectors.
///
/// Mismatched lengths, empty or zero-magnitude vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
