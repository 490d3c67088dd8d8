//! Deterministic hash-based embedder.

// Hash bits are deliberately folded into indices and small floats.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use super::{ImageEmbedder, TextEmbedder};
use crate::Result;
use async_trait::async_trait;

/// Embedder that hashes words (or image byte chunks) into a fixed-size
/// normalized vector.
///
/// Texts sharing words get similar vectors; there is no semantic similarity
/// beyond that. Output is stable across runs and platforms.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Default dimensions.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    /// Maximum words hashed per text.
    const MAX_WORDS: usize = 1000;

    /// Bytes per hashed image chunk.
    const IMAGE_CHUNK: usize = 64;

    /// Creates an embedder with [`HashEmbedder::DEFAULT_DIMENSIONS`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dimensions: Self::DEFAULT_DIMENSIONS,
        }
    }

    /// Creates an embedder with custom dimensions (at least 1).
    #[must_use]
    pub const fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: if dimensions == 0 { 1 } else { dimensions },
        }
    }

    /// Embeds text synchronously.
    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace().take(Self::MAX_WORDS) {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if !word.is_empty() {
                self.distribute(&mut embedding, fnv1a(word.as_bytes()));
            }
        }
        normalize(&mut embedding);
        embedding
    }

    fn embed_bytes(&self, bytes: &[u8]) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for chunk in bytes.chunks(Self::IMAGE_CHUNK) {
            self.distribute(&mut embedding, fnv1a(chunk));
        }
        normalize(&mut embedding);
        embedding
    }

    fn distribute(&self, embedding: &mut [f32], hash: u64) {
        for j in 0..8 {
            let idx = (hash >> (j * 8)) as usize % self.dimensions;
            let value = ((hash >> (j * 4)) & 0xFF) as f32 / 255.0 - 0.5;
            embedding[idx] += value;
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

fn normalize(embedding: &mut [f32]) {
    let norm_sq: f32 = embedding.iter().map(|x| x * x).sum();
    if norm_sq <= 0.0 {
        return;
    }
    let inv_norm = norm_sq.sqrt().recip();
    for v in embedding.iter_mut() {
        *v *= inv_norm;
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

#[async_trait]
impl ImageEmbedder for HashEmbedder {
    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        if bytes.is_empty() {
            return Err(crate::Error::Validation("Image input is empty".to_string()));
        }
        Ok(self.embed_bytes(bytes))
    }

    async fn embed_text_for_image_search(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
