// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns text into vectors for semantic search
//!
//! Providers map bounded-length text to vectors; the chunked embedder splits
//! long documents into provider-sized segments and averages the results.

pub mod chunker;
pub mod embedder;
pub mod provider;

pub use chunker::{ChunkConfig, TextChunker, TextSegment, DEFAULT_MAX_TOKENS};
pub use embedder::{mean_pool, ChunkedEmbedder, EmptyTextPolicy};
pub use provider::{
    create_provider, CommandProvider, DummyProvider, EmbeddingProvider, EmbeddingProviderConfig,
    OpenAiProvider,
};
