//! Evaluation of suggestion batches against gold corrections.

/// Score matrices and the external classifier seam.
pub mod matrix;

/// Recall at several candidate cut-offs.
pub mod recall;

pub use matrix::{Classifier, Estimator, FeatureMatrix, RowLabel};
pub use recall::{DEFAULT_RECALL_KS, RecallReport};
