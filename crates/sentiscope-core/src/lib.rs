//! Sentiscope Core
//!
//! Core types and error handling shared across sentiscope components.
//!
//! This crate provides:
//! - The startup and per-request error taxonomy
//! - Sparse feature vectors produced by vectorizers
//! - Prediction results and diagnostic warnings

pub mod error;
pub mod types;

pub use error::{AcquisitionError, LoadError, PredictionError};
pub use types::{DiagnosticWarning, Label, PredictionResult, SparseVector};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{AcquisitionError, LoadError, PredictionError};
    pub use crate::types::{DiagnosticWarning, Label, PredictionResult, SparseVector};
}
