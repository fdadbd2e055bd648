//! Text-to-sentiment prediction pipeline
//!
//! normalize (optional) -> vectorize -> classify -> confidence.
//! Stateless per call; the handles it holds are never mutated.

use crate::model_loader::{check_compatible, ModelHandle, VectorizerHandle};
use sentiscope_core::{DiagnosticWarning, LoadError, PredictionError, PredictionResult};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Confidence above which a prediction is logged as high-confidence
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.99;

/// Loaded model + vectorizer pair that turns raw text into a sentiment label
#[derive(Debug, Clone)]
pub struct SentimentPipeline {
    model: ModelHandle,
    vectorizer: VectorizerHandle,
}

impl SentimentPipeline {
    /// Build a pipeline, rejecting handles with mismatched feature dimensions
    pub fn new(model: ModelHandle, vectorizer: VectorizerHandle) -> Result<Self, LoadError> {
        check_compatible(&model, &vectorizer)?;
        Ok(Self { model, vectorizer })
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn vectorizer(&self) -> &VectorizerHandle {
        &self.vectorizer
    }

    /// Predict the sentiment of raw text
    pub fn predict(&self, text: &str) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();

        let prepared: Cow<'_, str> = match self.vectorizer.normalizer() {
            Some(normalizer) => Cow::Owned(normalizer.normalize(text)),
            None => Cow::Borrowed(text),
        };

        let features = self.vectorizer.transform(&prepared);
        let active = features.nnz();
        debug!(
            active_features = active,
            dimension = features.dim(),
            "Vectorized input"
        );

        let label = self.model.predict(&features)?;
        let mut result = PredictionResult::new(label).with_active_features(active);

        if let Some(proba) = self.model.predict_proba(&features)? {
            let confidence = self.confidence(&proba)?;
            result = result.with_confidence(confidence);
        }

        if active == 0 && !text.trim().is_empty() {
            warn!(
                text = %truncate(text, 50),
                "No known vocabulary terms in input; vectorizer may not match the preprocessor"
            );
            result = result.with_diagnostic(DiagnosticWarning::NoKnownTerms);
        }

        if result.exceeds_confidence(HIGH_CONFIDENCE_THRESHOLD) {
            info!(
                label,
                confidence = result.confidence,
                "High-confidence prediction"
            );
        }

        debug!(
            label,
            latency_us = start.elapsed().as_micros() as u64,
            "Prediction complete"
        );

        Ok(result)
    }

    /// Maximum probability, after validating the distribution
    fn confidence(&self, proba: &[f64]) -> Result<f64, PredictionError> {
        if proba.is_empty() {
            return Err(PredictionError::EmptyDistribution);
        }

        let expected = self.model.classes().len();
        if proba.len() != expected {
            return Err(PredictionError::DistributionShape {
                expected,
                got: proba.len(),
            });
        }

        if let Some(&bad) = proba
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(PredictionError::InvalidProbability(bad));
        }

        Ok(proba.iter().copied().fold(0.0, f64::max))
    }
}

/// First `max_chars` characters of `text`, for logs
pub fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::vectorizer::{CountVectorizer, NormalizerSpec, VectorizerArtifact};
    use sentiscope_core::{Label, SparseVector};
    use std::sync::Arc;

    /// Classifier returning a fixed distribution regardless of input
    struct FixedClassifier {
        classes: Vec<Label>,
        proba: Option<Vec<f64>>,
        n_features: usize,
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn classes(&self) -> &[Label] {
            &self.classes
        }

        fn n_features(&self) -> usize {
            self.n_features
        }

        fn predict(&self, _x: &SparseVector) -> Result<Label, PredictionError> {
            Ok(self.classes[0])
        }

        fn predict_proba(&self, _x: &SparseVector) -> Result<Option<Vec<f64>>, PredictionError> {
            Ok(self.proba.clone())
        }
    }

    fn vectorizer(normalizer: Option<NormalizerSpec>) -> VectorizerHandle {
        let artifact = VectorizerArtifact {
            format_version: 1,
            name: None,
            vocabulary: [("love", 0), ("great", 1), ("hate", 2)]
                .into_iter()
                .map(|(t, i)| (t.to_string(), i))
                .collect(),
            lowercase: true,
            token_pattern: r"(?u)\b\w\w+\b".into(),
            ngram_range: (1, 1),
            binary: false,
            normalizer,
        };
        VectorizerHandle::new("bow", CountVectorizer::from_artifact(artifact).unwrap())
    }

    fn pipeline_with(proba: Option<Vec<f64>>) -> SentimentPipeline {
        let model = ModelHandle::new(
            "fixed",
            Arc::new(FixedClassifier {
                classes: vec![0, 1],
                proba,
                n_features: 3,
            }),
        );
        SentimentPipeline::new(model, vectorizer(None)).unwrap()
    }

    #[test]
    fn test_confidence_is_max_probability() {
        let result = pipeline_with(Some(vec![0.3, 0.7])).predict("love it").unwrap();
        assert_eq!(result.label, 0);
        assert_eq!(result.confidence, Some(0.7));
        assert_eq!(result.active_features, 1);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn test_label_only_classifier_has_no_confidence() {
        let result = pipeline_with(None).predict("great").unwrap();
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn test_empty_distribution_is_a_fault() {
        let err = pipeline_with(Some(vec![])).predict("love").unwrap_err();
        assert_eq!(err, PredictionError::EmptyDistribution);
    }

    #[test]
    fn test_malformed_distributions_are_faults() {
        let err = pipeline_with(Some(vec![1.0])).predict("love").unwrap_err();
        assert_eq!(err, PredictionError::DistributionShape { expected: 2, got: 1 });

        let err = pipeline_with(Some(vec![f64::NAN, 0.5])).predict("love").unwrap_err();
        assert!(matches!(err, PredictionError::InvalidProbability(_)));

        let err = pipeline_with(Some(vec![-0.5, 1.5])).predict("love").unwrap_err();
        assert!(matches!(err, PredictionError::InvalidProbability(_)));
    }

    #[test]
    fn test_unknown_terms_attach_warning() {
        let result = pipeline_with(Some(vec![0.5, 0.5]))
            .predict("zzz qqq")
            .unwrap();
        assert_eq!(result.diagnostic, Some(DiagnosticWarning::NoKnownTerms));
        assert_eq!(result.label, 0);
    }

    #[test]
    fn test_empty_text_has_no_warning() {
        let result = pipeline_with(Some(vec![0.5, 0.5])).predict("").unwrap();
        assert_eq!(result.active_features, 0);
        assert!(result.diagnostic.is_none());

        let result = pipeline_with(Some(vec![0.5, 0.5])).predict("   ").unwrap();
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn test_normalizer_applied_before_vectorizing() {
        let model = ModelHandle::new(
            "fixed",
            Arc::new(FixedClassifier {
                classes: vec![0, 1],
                proba: None,
                n_features: 3,
            }),
        );
        let normalizer = NormalizerSpec {
            letters_only: true,
            lowercase: true,
            stop_words: vec!["love".into()],
        };
        let pipeline = SentimentPipeline::new(model, vectorizer(Some(normalizer))).unwrap();

        // "love" is a stop word, "great" survives the digits around it
        let result = pipeline.predict("LOVE 1great1").unwrap();
        assert_eq!(result.active_features, 1);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let model = ModelHandle::new(
            "fixed",
            Arc::new(FixedClassifier {
                classes: vec![0, 1],
                proba: None,
                n_features: 5,
            }),
        );
        let err = SentimentPipeline::new(model, vectorizer(None)).unwrap_err();
        assert!(matches!(err, LoadError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("héllo wörld", 4), "héll...");
    }
}
