//! Embedding similarity.

/// Cosine similarity of two vectors in `[-1, 1]`.
///
/// Returns `0.0` for mismatched lengths, empty input or a zero-magnitude side.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}
	let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}
	let denom = norm_a.sqrt() * norm_b.sqrt();
	if denom == 0.0 || !denom.is_finite() {
		return 0.0;
	}
	(dot / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_vectors_score_one() {
		let a = [0.3, -1.2, 4.0];
		assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
	}

	#[test]
	fn degenerate_input_scores_zero() {
		assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
		assert_eq!(cosine_similarity(&[], &[]), 0.0);
	}

	#[test]
	fn symmetric_and_signed() {
		let (a, b) = ([1.0, 2.0, 3.0], [-2.0, 0.5, 1.0]);
		assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
		assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
		assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
	}
}
