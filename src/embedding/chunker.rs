// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text chunker for embedding generation.
//!
//! Splits a document into contiguous, non-overlapping segments that each fit
//! under the embedding provider's per-call input limit. The limit is measured
//! in Unicode scalar values (chars), an approximation of provider tokens:
//! ASCII prose usually lands well under the real token count, while dense
//! non-Latin text can exceed it.

use crate::errors::{Result, SearchError};

/// Default per-segment limit, kept below the 8191-token ceiling of
/// OpenAI's ada-002 model.
pub const DEFAULT_MAX_TOKENS: usize = 8000;

/// Configuration for the text chunker.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum segment length, in chars.
    pub max_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ChunkConfig {
    /// Creates a new ChunkConfig with the given limit.
    pub fn new(max_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(SearchError::Configuration(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(Self { max_tokens })
    }
}

/// A contiguous slice of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegment<'a> {
    /// Char offset of the first char of this segment in the source text.
    pub char_offset: usize,
    /// The segment text, borrowed from the source.
    pub text: &'a str,
}

/// Splits text into bounded segments for embedding generation.
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    /// Creates a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Splits `content` into segments of at most `max_tokens` chars.
    ///
    /// Algorithm:
    /// ```text
    /// start = 0
    /// while start < total_chars:
    ///   end = min(start + max_tokens, total_chars)
    ///   emit content[start..end]
    ///   start = end
    /// ```
    ///
    /// Segments never overlap and always cut on char boundaries, so joining
    /// them in order reproduces `content` exactly. Empty input yields no
    /// segments.
    pub fn split<'a>(&self, content: &'a str) -> Vec<TextSegment<'a>> {
        if content.is_empty() {
            return Vec::new();
        }

        let max = self.config.max_tokens.max(1);
        let mut segments = Vec::new();
        let mut start_byte = 0_usize;
        let mut start_char = 0_usize;
        let mut count = 0_usize;

        for (idx, _) in content.char_indices() {
            if count == max {
                segments.push(TextSegment {
                    char_offset: start_char,
                    text: &content[start_byte..idx],
                });
                start_byte = idx;
                start_char += count;
                count = 0;
            }
            count += 1;
        }

        segments.push(TextSegment {
            char_offset: start_char,
            text: &content[start_byte..],
        });

        segments
    }
}
