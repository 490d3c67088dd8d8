//! Embedding collaborators.
//!
//! The engine needs three embeddings: query text for script search, query
//! image bytes for image-to-image search, and query text projected into the
//! image space. Real models live behind these traits; [`HashEmbedder`] is a
//! deterministic stand-in for tests and the CLI.

mod hash;

pub use hash::HashEmbedder;

use crate::Result;
use async_trait::async_trait;

/// Text embedding generator.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Embeds query or document text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

/// Multimodal (image) embedding generator.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    /// Embeds raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be embedded.
    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>>;

    /// Embeds text into the image embedding space.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    async fn embed_text_for_image_search(&self, text: &str) -> Result<Vec<f32>>;
}

/// Computes cosine similarity between two embeddings.
///
/// Returns 0.0 for mismatched lengths, empty vectors or zero norms.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert!(cosine_similarity(&[], &[]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }
}
