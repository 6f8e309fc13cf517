// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunk-and-average document embedding.
//!
//! Long texts are split into provider-sized segments, each segment is embedded
//! once, and the segment vectors are mean-pooled into a single vector per
//! document.

use serde::Deserialize;
use std::sync::Arc;

use super::chunker::{ChunkConfig, TextChunker};
use super::provider::EmbeddingProvider;
use crate::errors::{ProviderError, Result, SearchError};

/// What to do when asked to embed an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTextPolicy {
    /// Fail with `InvalidInput` without calling the provider.
    #[default]
    Reject,
    /// Send one empty segment and return the provider's vector as is.
    Embed,
}

/// Embeds arbitrarily long text under a per-call length limit.
#[derive(Clone)]
pub struct ChunkedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    empty_text: EmptyTextPolicy,
}

impl ChunkedEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: ChunkConfig) -> Result<Self> {
        let config = ChunkConfig::new(config.max_tokens)?;
        Ok(Self {
            provider,
            chunker: TextChunker::new(config),
            empty_text: EmptyTextPolicy::default(),
        })
    }

    /// Sets the empty-text policy.
    pub fn with_empty_text_policy(mut self, policy: EmptyTextPolicy) -> Self {
        self.empty_text = policy;
        self
    }

    /// Computes one document-level vector for `text`.
    ///
    /// Any provider failure aborts the whole call and discards segment
    /// vectors fetched so far.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let segments = self.chunker.split(text);

        if segments.is_empty() {
            return match self.empty_text {
                EmptyTextPolicy::Reject => Err(SearchError::InvalidInput(
                    "cannot embed empty text".to_string(),
                )),
                EmptyTextPolicy::Embed => Ok(self.embed_segment("")?),
            };
        }

        tracing::debug!(
            segments = segments.len(),
            model = self.provider.model_id(),
            "embedding text"
        );

        if segments.len() == 1 {
            return Ok(self.embed_segment(segments[0].text)?);
        }

        let mut vectors = Vec::with_capacity(segments.len());
        for segment in &segments {
            vectors.push(self.embed_segment(segment.text)?);
        }

        Ok(mean_pool(&vectors)?)
    }

    fn embed_segment(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let vector = self.provider.create_embedding(text)?;
        if vector.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "provider returned an empty vector".to_string(),
            ));
        }
        Ok(vector)
    }
}

/// Coordinate-wise arithmetic mean of equally sized vectors.
///
/// Sums are accumulated in `f64`, so the result does not depend on the order
/// the vectors arrive in beyond final `f32` rounding.
pub fn mean_pool(vectors: &[Vec<f32>]) -> std::result::Result<Vec<f32>, ProviderError> {
    let Some(first) = vectors.first() else {
        return Err(ProviderError::MalformedResponse(
            "no segment embeddings to pool".to_string(),
        ));
    };

    let dim = first.len();
    let mut sums = vec![0.0f64; dim];
    for vector in vectors {
        if vector.len() != dim {
            return Err(ProviderError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }

    let count = vectors.len() as f64;
    Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns queued vectors in order and records every input.
    struct ScriptedProvider {
        responses: Mutex<Vec<std::result::Result<Vec<f32>, ProviderError>>>,
        inputs: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<std::result::Result<Vec<f32>, ProviderError>>) -> Arc<Self> {
            let mut responses = responses;
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    impl EmbeddingProvider for ScriptedProvider {
        fn model_id(&self) -> &str {
            "scripted"
        }

        fn create_embedding(&self, input: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            self.inputs.lock().unwrap().push(input.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::Request("script exhausted".into())))
        }
    }

    fn embedder(provider: Arc<ScriptedProvider>, max_tokens: usize) -> ChunkedEmbedder {
        ChunkedEmbedder::new(provider, ChunkConfig::new(max_tokens).unwrap()).unwrap()
    }

    #[test]
    fn short_text_returns_provider_vector_unchanged() {
        let expected = vec![0.1_f32, 0.2, 0.3000001];
        let provider = ScriptedProvider::new(vec![Ok(expected.clone())]);
        let embedder = embedder(provider.clone(), 100);

        let vector = embedder.embed("Hello world").unwrap();
        assert_eq!(vector, expected);
        assert_eq!(provider.inputs(), vec!["Hello world".to_string()]);
    }

    #[test]
    fn long_text_is_mean_pooled_per_coordinate() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![1.0, 0.0, -3.0]),
            Ok(vec![3.0, 1.0, 0.0]),
            Ok(vec![2.0, 2.0, 0.0]),
        ]);
        let embedder = embedder(provider.clone(), 4);

        let vector = embedder.embed("aaaabbbbcc").unwrap();
        let expected = [2.0_f32, 1.0, -1.0];
        for (got, want) in vector.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6);
        }
        assert_eq!(provider.inputs(), vec!["aaaa", "bbbb", "cc"]);
    }

    #[test]
    fn empty_text_is_rejected_without_provider_calls() {
        let provider = ScriptedProvider::new(vec![Ok(vec![1.0])]);
        let embedder = embedder(provider.clone(), 10);

        let err = embedder.embed("").unwrap_err();
        assert!(err.is_invalid_input());
        assert!(provider.inputs().is_empty());
    }

    #[test]
    fn empty_text_can_be_embedded_as_one_segment() {
        let provider = ScriptedProvider::new(vec![Ok(vec![0.5, 0.5])]);
        let embedder =
            embedder(provider.clone(), 10).with_empty_text_policy(EmptyTextPolicy::Embed);

        assert_eq!(embedder.embed("").unwrap(), vec![0.5, 0.5]);
        assert_eq!(provider.inputs(), vec![String::new()]);
    }

    #[test]
    fn provider_failure_aborts_whole_call() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![1.0, 1.0]),
            Err(ProviderError::Status {
                status: 429,
                body: "rate limited".into(),
            }),
            Ok(vec![1.0, 1.0]),
        ]);
        let embedder = embedder(provider.clone(), 2);

        let err = embedder.embed("aabbcc").unwrap_err();
        assert!(matches!(
            err,
            SearchError::Provider(ProviderError::Status { status: 429, .. })
        ));
        // third segment never requested
        assert_eq!(provider.inputs().len(), 2);
    }

    #[test]
    fn mismatched_segment_lengths_are_rejected() {
        let provider = ScriptedProvider::new(vec![Ok(vec![1.0, 2.0]), Ok(vec![1.0])]);
        let embedder = embedder(provider, 1);

        let err = embedder.embed("ab").unwrap_err();
        assert!(matches!(
            err,
            SearchError::Provider(ProviderError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn empty_provider_vector_is_malformed() {
        let provider = ScriptedProvider::new(vec![Ok(Vec::new())]);
        let embedder = embedder(provider, 10);
        assert!(matches!(
            embedder.embed("text"),
            Err(SearchError::Provider(ProviderError::MalformedResponse(_)))
        ));
    }

    #[test]
    fn zero_max_tokens_is_a_configuration_error() {
        let provider = ScriptedProvider::new(Vec::new());
        let result = ChunkedEmbedder::new(provider, ChunkConfig { max_tokens: 0 });
        assert!(matches!(result, Err(SearchError::Configuration(_))));
    }

    #[test]
    fn mean_pool_is_order_insensitive() {
        let a = vec![0.1_f32, 0.7, -0.2];
        let b = vec![0.4_f32, -0.3, 0.9];
        let c = vec![-0.5_f32, 0.2, 0.3];

        let forward = mean_pool(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let reverse = mean_pool(&[c, b, a]).unwrap();
        assert_eq!(forward, reverse);
    }
}
