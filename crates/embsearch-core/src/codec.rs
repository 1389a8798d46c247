//! Packed-vector codec and cosine similarity.
//!
//! Stored embeddings are contiguous little-endian 32-bit floats with no
//! header: `len(bytes) == 4 * len(vector)`.

use crate::errors::{EmbsearchResult, SearchError, StorageError};

/// Pack a float vector into its on-disk byte form.
pub fn pack(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Unpack an on-disk blob back into a float vector.
/// A blob whose length is not a multiple of 4 is corrupt.
pub fn unpack(bytes: &[u8]) -> EmbsearchResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(StorageError::CorruptEmbedding { len: bytes.len() }.into());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Cosine similarity between two equal-length vectors, accumulated in f64.
/// Zero-norm inputs yield 0.0. Unequal lengths are a hard error: the
/// caller must only compare embeddings produced by the same model.
pub fn cosine(a: &[f32], b: &[f32]) -> EmbsearchResult<f64> {
    if a.len() != b.len() {
        return Err(SearchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        }
        .into());
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a
        .iter()
        .map(|x| (*x as f64) * (*x as f64))
        .sum::<f64>()
        .sqrt();
    let norm_b: f64 = b
        .iter()
        .map(|x| (*x as f64) * (*x as f64))
        .sum::<f64>()
        .sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}
