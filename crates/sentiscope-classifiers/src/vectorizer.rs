//! Bag-of-words text vectorizer
//!
//! Mirrors a fitted count vectorizer: a fixed vocabulary mapping terms to
//! columns, a token regex, an n-gram range and optional binary counts. The
//! optional text normalizer is an explicit capability of the artifact.

use sentiscope_core::{LoadError, SparseVector};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Serialized vectorizer artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerArtifact {
    pub format_version: u32,

    #[serde(default)]
    pub name: Option<String>,

    /// Term to column index
    pub vocabulary: BTreeMap<String, usize>,

    #[serde(default = "default_true")]
    pub lowercase: bool,

    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,

    /// Inclusive `(min_n, max_n)`
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),

    /// Emit 1.0 for present terms instead of counts
    #[serde(default)]
    pub binary: bool,

    #[serde(default)]
    pub normalizer: Option<NormalizerSpec>,
}

/// Text normalization applied before vectorization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizerSpec {
    /// Replace every non `a-zA-Z` character with a space
    #[serde(default = "default_true")]
    pub letters_only: bool,

    #[serde(default = "default_true")]
    pub lowercase: bool,

    /// Words removed after lower-casing
    #[serde(default)]
    pub stop_words: Vec<String>,
}

/// Compiled normalization step
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    letters_only: bool,
    lowercase: bool,
    stop_words: HashSet<String>,
}

impl TextNormalizer {
    pub fn from_spec(spec: &NormalizerSpec) -> Self {
        let stop_words = spec
            .stop_words
            .iter()
            .map(|w| {
                if spec.lowercase {
                    w.to_lowercase()
                } else {
                    w.clone()
                }
            })
            .collect();

        Self {
            letters_only: spec.letters_only,
            lowercase: spec.lowercase,
            stop_words,
        }
    }

    /// Normalize raw review text
    pub fn normalize(&self, text: &str) -> String {
        let cleaned: String = if self.letters_only {
            text.chars()
                .map(|c| if c.is_ascii_alphabetic() { c } else { ' ' })
                .collect()
        } else {
            text.to_string()
        };

        let cleaned = if self.lowercase {
            cleaned.to_lowercase()
        } else {
            cleaned
        };

        cleaned
            .split_whitespace()
            .filter(|w| !self.stop_words.contains(*w))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Fitted count vectorizer
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    vocabulary: HashMap<String, usize>,
    token_pattern: Regex,
    lowercase: bool,
    ngram_range: (usize, usize),
    binary: bool,
    normalizer: Option<TextNormalizer>,
}

impl CountVectorizer {
    /// Validate and compile an artifact
    pub fn from_artifact(artifact: VectorizerArtifact) -> Result<Self, LoadError> {
        let dim = artifact.vocabulary.len();
        if dim == 0 {
            return Err(LoadError::invalid("vectorizer", "vocabulary is empty"));
        }

        let mut seen = vec![false; dim];
        for (term, &column) in &artifact.vocabulary {
            if column >= dim {
                return Err(LoadError::invalid(
                    "vectorizer",
                    format!("term {term:?} maps to column {column}, vocabulary size is {dim}"),
                ));
            }
            if std::mem::replace(&mut seen[column], true) {
                return Err(LoadError::invalid(
                    "vectorizer",
                    format!("column {column} is assigned to more than one term"),
                ));
            }
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(LoadError::invalid(
                "vectorizer",
                format!("invalid ngram_range ({min_n}, {max_n})"),
            ));
        }

        let token_pattern = Regex::new(&artifact.token_pattern).map_err(|e| {
            LoadError::invalid("vectorizer", format!("invalid token_pattern: {e}"))
        })?;

        Ok(Self {
            vocabulary: artifact.vocabulary.into_iter().collect(),
            token_pattern,
            lowercase: artifact.lowercase,
            ngram_range: artifact.ngram_range,
            binary: artifact.binary,
            normalizer: artifact.normalizer.as_ref().map(TextNormalizer::from_spec),
        })
    }

    /// Output dimension
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    /// Optional normalization capability
    pub fn normalizer(&self) -> Option<&TextNormalizer> {
        self.normalizer.as_ref()
    }

    /// Map text to a sparse count vector
    pub fn transform(&self, text: &str) -> SparseVector {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&column) = self.vocabulary.get(&term) {
                    *counts.entry(column).or_insert(0.0) += 1.0;
                }
            }
        }

        if self.binary {
            counts.values_mut().for_each(|v| *v = 1.0);
        }

        SparseVector::from_pairs(self.dimension(), counts)
    }
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(terms: &[&str]) -> VectorizerArtifact {
        VectorizerArtifact {
            format_version: 1,
            name: None,
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            lowercase: true,
            token_pattern: default_token_pattern(),
            ngram_range: (1, 1),
            binary: false,
            normalizer: None,
        }
    }

    #[test]
    fn test_transform_counts_known_terms() {
        let vectorizer = CountVectorizer::from_artifact(artifact(&["love", "hate", "food"])).unwrap();
        let x = vectorizer.transform("I LOVE the food, love it");

        assert_eq!(x.dim(), 3);
        assert_eq!(x.to_dense(), vec![2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_and_unknown_text_produce_zero_vector() {
        let vectorizer = CountVectorizer::from_artifact(artifact(&["love", "hate"])).unwrap();
        assert_eq!(vectorizer.transform("").nnz(), 0);
        assert_eq!(vectorizer.transform("qwerty zxcv").nnz(), 0);
    }

    #[test]
    fn test_single_char_tokens_ignored_by_default_pattern() {
        let vectorizer = CountVectorizer::from_artifact(artifact(&["a", "ok"])).unwrap();
        assert_eq!(vectorizer.transform("a ok").to_dense(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_bigrams_and_binary() {
        let mut a = artifact(&["not", "good", "not good"]);
        a.ngram_range = (1, 2);
        a.binary = true;
        let vectorizer = CountVectorizer::from_artifact(a).unwrap();

        let x = vectorizer.transform("not good, not good at all");
        assert_eq!(x.to_dense(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_normalizer_capability() {
        let mut a = artifact(&["love", "place"]);
        a.normalizer = Some(NormalizerSpec {
            letters_only: true,
            lowercase: true,
            stop_words: vec!["the".into(), "This".into()],
        });
        let vectorizer = CountVectorizer::from_artifact(a).unwrap();

        let normalizer = vectorizer.normalizer().expect("normalizer");
        assert_eq!(normalizer.normalize("Loved THIS place!!! 10/10, the best"), "loved place best");

        let plain = CountVectorizer::from_artifact(artifact(&["love"])).unwrap();
        assert!(plain.normalizer().is_none());
    }

    #[test]
    fn test_invalid_artifacts_rejected() {
        assert!(CountVectorizer::from_artifact(artifact(&[])).is_err());

        let mut duplicate = artifact(&["a", "b"]);
        duplicate.vocabulary.insert("b".into(), 0);
        duplicate.vocabulary.insert("a".into(), 0);
        assert!(CountVectorizer::from_artifact(duplicate).is_err());

        let mut out_of_range = artifact(&["a"]);
        out_of_range.vocabulary.insert("a".into(), 5);
        assert!(CountVectorizer::from_artifact(out_of_range).is_err());

        let mut bad_range = artifact(&["a"]);
        bad_range.ngram_range = (2, 1);
        assert!(CountVectorizer::from_artifact(bad_range).is_err());

        let mut bad_pattern = artifact(&["a"]);
        bad_pattern.token_pattern = "(".into();
        assert!(matches!(
            CountVectorizer::from_artifact(bad_pattern),
            Err(LoadError::Invalid { .. })
        ));
    }

    #[test]
    fn test_artifact_defaults_from_json() {
        let json = r#"{"format_version": 1, "vocabulary": {"great": 0, "awful": 1}}"#;
        let a: VectorizerArtifact = serde_json::from_str(json).unwrap();
        assert!(a.lowercase);
        assert_eq!(a.ngram_range, (1, 1));
        assert!(!a.binary);
        assert!(a.normalizer.is_none());
        assert_eq!(a.token_pattern, DEFAULT_TOKEN_PATTERN);
    }
}
