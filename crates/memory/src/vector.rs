//! Term-frequency vectors and cosine similarity.
//!
//! Text is reduced to a sparse bag of lowercase alphanumeric terms. Two
//! texts are as similar as the cosine of their term vectors: 1 when they
//! share every term in the same proportion, 0 when they share none.

use std::collections::HashMap;

/// Sparse term → weight vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: HashMap<String, f32>,
}

impl TermVector {
    /// Tokenize `text` into terms of two or more characters and count them.
    pub fn from_text(text: &str) -> Self {
        let mut weights = HashMap::new();
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
        {
            *weights.entry(term.to_lowercase()).or_insert(0.0) += 1.0;
        }
        Self { weights }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    fn norm(&self) -> f64 {
        self.weights
            .values()
            .map(|w| (*w as f64) * (*w as f64))
            .sum::<f64>()
            .sqrt()
    }
}

/// Cosine similarity between two term vectors.
///
/// Returns a value in [0, 1]. Returns 0.0 if either vector is empty.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Walk the smaller map.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .weights
        .iter()
        .filter_map(|(term, w)| large.weights.get(term).map(|v| (*w as f64) * (*v as f64)))
        .sum();

    let denom = a.norm() * b.norm();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}
