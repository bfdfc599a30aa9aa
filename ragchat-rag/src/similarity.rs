//! Cosine similarity between embedding vectors.

use crate::error::{RagError, Result};

/// Compute the cosine similarity between two vectors.
///
/// Both vectors must be non-empty and of equal length; anything else is a
/// [`RagError::DimensionMismatch`], never a truncated or padded computation.
/// NaN or infinite components are a [`RagError::InvalidArgument`].
/// If either vector has zero magnitude the similarity is defined as `0.0`.
/// The result is clamped into `[-1, 1]`.
///
/// # Example
///
/// ```
/// use ragchat_rag::similarity::cosine_similarity;
///
/// let score = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
/// assert!((score - 1.0).abs() < 1e-6);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() || a.is_empty() {
        return Err(RagError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    if !is_finite(a) || !is_finite(b) {
        return Err(RagError::InvalidArgument("vectors must contain only finite values".into()));
    }

    // Accumulate in f64 so that `similarity(a, b)` and `similarity(b, a)`
    // agree to well within f32 precision.
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(score.clamp(-1.0, 1.0) as f32)
}

/// Whether every component of `v` is a finite number.
pub fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}
