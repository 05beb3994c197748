/// Cosine similarity between decoded embeddings.
use super::SimilarityError;
use super::result::{Embedding, EmbeddingValues};

/// Cosine similarity of two embeddings of the same encoding and dimension.
///
/// Quantized components are used as their integer values. Quantization
/// applies one scale to every component, and cosine similarity is invariant
/// under uniform scaling, so this matches comparing the dequantized floats.
pub fn cosine_similarity(u: &Embedding, v: &Embedding) -> Result<f64, SimilarityError> {
    match (&u.values, &v.values) {
        (EmbeddingValues::Float(a), EmbeddingValues::Float(b)) => cosine(a, b),
        (EmbeddingValues::Quantized(a), EmbeddingValues::Quantized(b)) => cosine(a, b),
        _ => Err(SimilarityError::TypeMismatch),
    }
}

fn cosine<T: Copy + Into<f64>>(u: &[T], v: &[T]) -> Result<f64, SimilarityError> {
    if u.len() != v.len() {
        return Err(SimilarityError::SizeMismatch {
            left: u.len(),
            right: v.len(),
        });
    }

    let (mut dot, mut norm_u, mut norm_v) = (0.0f64, 0.0f64, 0.0f64);
    for (&a, &b) in u.iter().zip(v) {
        let (a, b): (f64, f64) = (a.into(), b.into());
        dot += a * b;
        norm_u += a * a;
        norm_v += b * b;
    }

    if norm_u == 0.0 || norm_v == 0.0 {
        return Err(SimilarityError::ZeroNorm);
    }

    Ok(dot / (norm_u * norm_v).sqrt())
}
