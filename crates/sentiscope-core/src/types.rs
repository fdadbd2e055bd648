//! Core types for feature vectors and prediction results

use std::fmt;

/// Discrete class id produced by a classifier
pub type Label = i64;

/// Sparse numeric feature vector
///
/// `indices` are strictly increasing and every index is `< dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Create an all-zero vector of the given dimension
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from unordered `(index, value)` pairs, summing duplicates and
    /// dropping zero entries and out-of-range indices.
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut pairs: Vec<(usize, f64)> = pairs.into_iter().filter(|(i, _)| *i < dim).collect();
        pairs.sort_by_key(|(i, _)| *i);

        let mut indices: Vec<usize> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (i, v) in pairs {
            match indices.last() {
                Some(&last) if last == i => {
                    if let Some(acc) = values.last_mut() {
                        *acc += v;
                    }
                }
                _ => {
                    indices.push(i);
                    values.push(v);
                }
            }
        }

        let mut vector = Self {
            dim,
            indices,
            values,
        };
        vector.prune_zeros();
        vector
    }

    fn prune_zeros(&mut self) {
        let mut k = 0;
        for j in 0..self.indices.len() {
            if self.values[j] != 0.0 {
                self.indices[k] = self.indices[j];
                self.values[k] = self.values[j];
                k += 1;
            }
        }
        self.indices.truncate(k);
        self.values.truncate(k);
    }

    /// Feature dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of active (non-zero) features
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Iterate over active `(index, value)` entries
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product against a dense weight row
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.iter()
            .map(|(i, v)| weights.get(i).copied().unwrap_or(0.0) * v)
            .sum()
    }

    /// Expand into a dense vector
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        for (i, v) in self.iter() {
            dense[i] = v;
        }
        dense
    }
}

/// Non-fatal annotation attached to an otherwise successful prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticWarning {
    /// Non-empty input produced an all-zero feature vector
    NoKnownTerms,
}

impl DiagnosticWarning {
    /// Human-readable message returned to callers
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoKnownTerms => {
                "input contains no terms known to the vectorizer; \
                 the preprocessor and trained vectorizer may be out of sync"
            }
        }
    }
}

impl fmt::Display for DiagnosticWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Predicted class id, always one of the classifier's classes
    pub label: Label,

    /// Maximum class probability, when the classifier is probabilistic
    pub confidence: Option<f64>,

    /// Advisory warning, never changes `label`
    pub diagnostic: Option<DiagnosticWarning>,

    /// Active feature count of the input vector
    pub active_features: usize,
}

impl PredictionResult {
    /// Create a result with only a label
    pub fn new(label: Label) -> Self {
        Self {
            label,
            confidence: None,
            diagnostic: None,
            active_features: 0,
        }
    }

    /// Attach a confidence value
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach a diagnostic warning
    pub fn with_diagnostic(mut self, diagnostic: DiagnosticWarning) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }

    /// Record the active feature count
    pub fn with_active_features(mut self, count: usize) -> Self {
        self.active_features = count;
        self
    }

    /// Check if confidence exceeds threshold
    pub fn exceeds_confidence(&self, threshold: f64) -> bool {
        self.confidence.is_some_and(|c| c > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_from_pairs_merges_and_sorts() {
        let v = SparseVector::from_pairs(5, vec![(3, 1.0), (1, 2.0), (3, 1.0), (9, 4.0)]);
        assert_eq!(v.dim(), 5);
        assert_eq!(v.nnz(), 2);
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![(1, 2.0), (3, 2.0)]);
    }

    #[test]
    fn test_sparse_drops_zero_entries() {
        let v = SparseVector::from_pairs(4, vec![(0, 1.0), (0, -1.0), (2, 0.0)]);
        assert_eq!(v.nnz(), 0);
        assert_eq!(v.to_dense(), vec![0.0; 4]);
    }

    #[test]
    fn test_sparse_dot() {
        let v = SparseVector::from_pairs(3, vec![(0, 2.0), (2, 1.0)]);
        assert_eq!(v.dot(&[0.5, 10.0, -1.0]), 0.0);
        assert_eq!(SparseVector::zeros(3).dot(&[1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_result_builder() {
        let result = PredictionResult::new(1)
            .with_confidence(0.995)
            .with_active_features(3);
        assert!(result.exceeds_confidence(0.99));
        assert_eq!(result.active_features, 3);
        assert!(result.diagnostic.is_none());
    }
}
