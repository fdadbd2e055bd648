//! Classifier trait and the linear / naive Bayes models it is implemented for

use sentiscope_core::{Label, LoadError, PredictionError, SparseVector};
use serde::{Deserialize, Serialize};

/// Trait for all loaded classifiers
///
/// Implementations are immutable after construction and safe to share across
/// request handlers.
pub trait Classifier: Send + Sync {
    /// Model family name
    fn name(&self) -> &str;

    /// Known class ids; every prediction is one of these
    fn classes(&self) -> &[Label];

    /// Expected feature dimension
    fn n_features(&self) -> usize;

    /// Predict a class id
    fn predict(&self, x: &SparseVector) -> Result<Label, PredictionError>;

    /// Class probability distribution, aligned with `classes()`.
    ///
    /// `Ok(None)` means the model does not provide probabilities.
    fn predict_proba(&self, _x: &SparseVector) -> Result<Option<Vec<f64>>, PredictionError> {
        Ok(None)
    }
}

/// Serialized classifier, tagged by model family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    LogisticRegression(LinearParams),
    GaussianNb(GaussianNbParams),
    LinearSvc(LinearParams),
}

impl ClassifierArtifact {
    /// Validate shapes and build the runtime classifier
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, LoadError> {
        let classifier: Box<dyn Classifier> = match self {
            Self::LogisticRegression(p) => Box::new(LogisticRegression::new(p)?),
            Self::GaussianNb(p) => Box::new(GaussianNb::new(p)?),
            Self::LinearSvc(p) => Box::new(LinearSvc::new(p)?),
        };
        Ok(classifier)
    }
}

/// Coefficients of a linear model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearParams {
    pub classes: Vec<Label>,

    /// One row per class, or a single row for binary problems
    pub coef: Vec<Vec<f64>>,

    pub intercept: Vec<f64>,
}

/// Parameters of a Gaussian naive Bayes model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNbParams {
    pub classes: Vec<Label>,
    pub class_prior: Vec<f64>,

    /// Per-class feature means
    pub theta: Vec<Vec<f64>>,

    /// Per-class feature variances
    pub var: Vec<Vec<f64>>,

    /// Added to every variance
    #[serde(default)]
    pub epsilon: f64,
}

/// Shared validation for the linear families
fn check_linear(kind: &str, p: &LinearParams) -> Result<usize, LoadError> {
    check_classes(kind, &p.classes)?;

    let rows = p.coef.len();
    let binary_single_row = p.classes.len() == 2 && rows == 1;
    if !binary_single_row && rows != p.classes.len() {
        return Err(LoadError::invalid(
            kind,
            format!("{} coefficient rows for {} classes", rows, p.classes.len()),
        ));
    }
    if p.intercept.len() != rows {
        return Err(LoadError::invalid(
            kind,
            format!("{} intercepts for {} coefficient rows", p.intercept.len(), rows),
        ));
    }

    check_matrix(kind, "coef", &p.coef)
}

fn check_classes(kind: &str, classes: &[Label]) -> Result<(), LoadError> {
    if classes.len() < 2 {
        return Err(LoadError::invalid(kind, "at least two classes are required"));
    }
    let mut sorted = classes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != classes.len() {
        return Err(LoadError::invalid(kind, "class ids must be unique"));
    }
    Ok(())
}

/// Checks rows are non-empty, equally long and finite; returns the row length
fn check_matrix(kind: &str, field: &str, rows: &[Vec<f64>]) -> Result<usize, LoadError> {
    let n_features = rows.first().map(Vec::len).unwrap_or(0);
    if n_features == 0 {
        return Err(LoadError::invalid(kind, format!("{field} has no features")));
    }
    for row in rows {
        if row.len() != n_features {
            return Err(LoadError::invalid(
                kind,
                format!("{field} rows have inconsistent lengths"),
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(LoadError::invalid(kind, format!("{field} contains non-finite values")));
        }
    }
    Ok(n_features)
}

fn check_dimension(x: &SparseVector, expected: usize) -> Result<(), PredictionError> {
    if x.dim() != expected {
        return Err(PredictionError::FeatureDimension {
            expected,
            got: x.dim(),
        });
    }
    Ok(())
}

/// Index of the largest value, first wins on ties
fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Normalize log-scores into probabilities
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Decision values, one per coefficient row
fn decision(coef: &[Vec<f64>], intercept: &[f64], x: &SparseVector) -> Vec<f64> {
    coef.iter()
        .zip(intercept)
        .map(|(w, b)| x.dot(w) + b)
        .collect()
}

/// Logistic regression with sigmoid (binary) or softmax (multi-class) output
pub struct LogisticRegression {
    params: LinearParams,
    n_features: usize,
}

impl LogisticRegression {
    pub fn new(params: LinearParams) -> Result<Self, LoadError> {
        let n_features = check_linear("logistic_regression", &params)?;
        Ok(Self { params, n_features })
    }

    fn probabilities(&self, x: &SparseVector) -> Vec<f64> {
        let scores = decision(&self.params.coef, &self.params.intercept, x);
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            vec![1.0 - p, p]
        } else {
            softmax(&scores)
        }
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn classes(&self) -> &[Label] {
        &self.params.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &SparseVector) -> Result<Label, PredictionError> {
        check_dimension(x, self.n_features)?;
        let proba = self.probabilities(x);
        argmax(&proba)
            .map(|i| self.params.classes[i])
            .ok_or(PredictionError::EmptyDistribution)
    }

    fn predict_proba(&self, x: &SparseVector) -> Result<Option<Vec<f64>>, PredictionError> {
        check_dimension(x, self.n_features)?;
        Ok(Some(self.probabilities(x)))
    }
}

/// Gaussian naive Bayes over dense features
pub struct GaussianNb {
    classes: Vec<Label>,
    log_prior: Vec<f64>,
    theta: Vec<Vec<f64>>,
    var: Vec<Vec<f64>>,
    /// Per-class `-0.5 * sum(ln(2*pi*var))`
    log_norm: Vec<f64>,
    n_features: usize,
}

impl GaussianNb {
    pub fn new(params: GaussianNbParams) -> Result<Self, LoadError> {
        const KIND: &str = "gaussian_nb";

        check_classes(KIND, &params.classes)?;
        let k = params.classes.len();
        if params.class_prior.len() != k || params.theta.len() != k || params.var.len() != k {
            return Err(LoadError::invalid(
                KIND,
                "class_prior, theta and var must have one entry per class",
            ));
        }
        if params
            .class_prior
            .iter()
            .any(|p| !p.is_finite() || *p <= 0.0)
        {
            return Err(LoadError::invalid(KIND, "class priors must be positive"));
        }

        let n_features = check_matrix(KIND, "theta", &params.theta)?;
        if check_matrix(KIND, "var", &params.var)? != n_features {
            return Err(LoadError::invalid(KIND, "theta and var widths differ"));
        }

        let var: Vec<Vec<f64>> = params
            .var
            .into_iter()
            .map(|row| row.into_iter().map(|v| v + params.epsilon).collect())
            .collect();
        if var.iter().flatten().any(|v| *v <= 0.0) {
            return Err(LoadError::invalid(KIND, "variances must be positive"));
        }

        let log_norm = var
            .iter()
            .map(|row| {
                -0.5 * row
                    .iter()
                    .map(|v| (2.0 * std::f64::consts::PI * v).ln())
                    .sum::<f64>()
            })
            .collect();

        Ok(Self {
            classes: params.classes,
            log_prior: params.class_prior.iter().map(|p| p.ln()).collect(),
            theta: params.theta,
            var,
            log_norm,
            n_features,
        })
    }

    fn joint_log_likelihood(&self, x: &SparseVector) -> Vec<f64> {
        let dense = x.to_dense();
        (0..self.classes.len())
            .map(|c| {
                let sq: f64 = dense
                    .iter()
                    .zip(&self.theta[c])
                    .zip(&self.var[c])
                    .map(|((xi, mu), var)| (xi - mu).powi(2) / var)
                    .sum();
                self.log_prior[c] + self.log_norm[c] - 0.5 * sq
            })
            .collect()
    }
}

impl Classifier for GaussianNb {
    fn name(&self) -> &str {
        "gaussian_nb"
    }

    fn classes(&self) -> &[Label] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &SparseVector) -> Result<Label, PredictionError> {
        check_dimension(x, self.n_features)?;
        argmax(&self.joint_log_likelihood(x))
            .map(|i| self.classes[i])
            .ok_or(PredictionError::EmptyDistribution)
    }

    fn predict_proba(&self, x: &SparseVector) -> Result<Option<Vec<f64>>, PredictionError> {
        check_dimension(x, self.n_features)?;
        Ok(Some(softmax(&self.joint_log_likelihood(x))))
    }
}

/// Linear support vector classifier: labels only, no probabilities
pub struct LinearSvc {
    params: LinearParams,
    n_features: usize,
}

impl LinearSvc {
    pub fn new(params: LinearParams) -> Result<Self, LoadError> {
        let n_features = check_linear("linear_svc", &params)?;
        Ok(Self { params, n_features })
    }
}

impl Classifier for LinearSvc {
    fn name(&self) -> &str {
        "linear_svc"
    }

    fn classes(&self) -> &[Label] {
        &self.params.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &SparseVector) -> Result<Label, PredictionError> {
        check_dimension(x, self.n_features)?;
        let scores = decision(&self.params.coef, &self.params.intercept, x);
        let index = if scores.len() == 1 {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(&scores).ok_or(PredictionError::EmptyDistribution)?
        };
        Ok(self.params.classes[index])
    }
}
