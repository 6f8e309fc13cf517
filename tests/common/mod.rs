// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use semdex::embedding::{ChunkConfig, ChunkedEmbedder, EmbeddingProvider};
use semdex::errors::ProviderError;
use semdex::records::RawRecord;

pub const VOCAB_DIMS: usize = 64;

/// Bag-of-words provider: each distinct word gets its own axis.
///
/// Words are lowercased and a trailing plural "s" is dropped, so "texts"
/// and "text" land on the same axis.
#[derive(Default)]
pub struct VocabProvider {
    vocab: Mutex<HashMap<String, usize>>,
}

impl VocabProvider {
    fn axis(&self, word: &str) -> usize {
        let mut vocab = self.vocab.lock().unwrap();
        let next = vocab.len();
        *vocab.entry(word.to_string()).or_insert(next) % VOCAB_DIMS
    }
}

fn normalize(word: &str) -> String {
    let word = word.to_lowercase();
    match word.strip_suffix('s') {
        Some(stem) if stem.len() >= 3 => stem.to_string(),
        _ => word,
    }
}

impl EmbeddingProvider for VocabProvider {
    fn model_id(&self) -> &str {
        "vocab"
    }

    fn create_embedding(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![0.0; VOCAB_DIMS];
        for word in input.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[self.axis(&normalize(word))] += 1.0;
        }
        Ok(vector)
    }
}

/// Counts calls before delegating to the wrapped provider.
pub struct CountingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for CountingProvider {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn create_embedding(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_embedding(input)
    }
}

pub fn embedder(provider: Arc<dyn EmbeddingProvider>) -> ChunkedEmbedder {
    ChunkedEmbedder::new(provider, ChunkConfig::new(8000).unwrap()).unwrap()
}

/// Annotator reference pages, TextMatcher last.
pub fn annotator_records() -> Vec<RawRecord> {
    vec![
        RawRecord::new(
            "Chunk2Doc",
            "Converts chunk annotations into document annotations.",
            "https://nlp.example.com/docs/annotators#chunk2doc",
        ),
        RawRecord::new(
            "ChunkEmbeddings",
            "Generates sentence embeddings for each chunk by averaging token embeddings.",
            "https://nlp.example.com/docs/annotators#chunkembeddings",
        ),
        RawRecord::new(
            "ChunkTokenizer",
            "Splits chunks into tokens for downstream annotators.",
            "https://nlp.example.com/docs/annotators#chunktokenizer",
        ),
        RawRecord::new(
            "TextMatcher",
            "Annotator to match exact phrases in the text of a document.",
            "https://nlp.example.com/docs/annotators#textmatcher",
        ),
    ]
}
