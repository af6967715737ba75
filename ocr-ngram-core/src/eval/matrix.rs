use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{NgramError, Result};
use crate::feature::{FeatureRegistry, FeatureType};
use crate::suggestion::Suggestion;

/// Identifies a matrix row: one candidate of one word.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowLabel {
	pub position: u64,
	pub candidate: String,
}

/// Dense score matrix for an external classifier.
///
/// # Invariants
/// - one column per feature type, in registry order
/// - `values.len() == rows.len() * columns.len()` (row-major)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FeatureMatrix {
	columns: Vec<FeatureType>,
	rows: Vec<RowLabel>,
	values: Vec<f64>,
}

impl FeatureMatrix {
	/// One row per candidate of every suggestion, in suggestion order.
	///
	/// # Errors
	/// Returns `InvalidArgument` if the suggestions disagree on their
	/// feature registry.
	pub fn from_suggestions(suggestions: &[Suggestion]) -> Result<Self> {
		let Some(first) = suggestions.first() else {
			return Ok(Self::default());
		};
		let registry: &FeatureRegistry = first.registry();

		let mut matrix = Self {
			columns: registry.types().to_vec(),
			..Self::default()
		};
		for suggestion in suggestions {
			if suggestion.registry() != registry {
				return Err(NgramError::InvalidArgument(format!(
					"suggestion at {} was scored by different features",
					suggestion.position()
				)));
			}
			for candidate in suggestion.candidates() {
				matrix.rows.push(RowLabel {
					position: suggestion.position(),
					candidate: candidate.text().to_owned(),
				});
				matrix.values.extend_from_slice(candidate.scores());
			}
		}
		Ok(matrix)
	}

	pub fn columns(&self) -> &[FeatureType] {
		&self.columns
	}

	pub fn rows(&self) -> &[RowLabel] {
		&self.rows
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Scores of row `i`.
	pub fn row(&self, i: usize) -> Option<&[f64]> {
		let width = self.columns.len();
		self.values.get(i * width..(i + 1) * width)
	}

	/// Score of row `i` under `feature`.
	pub fn value(&self, i: usize, feature: &FeatureType) -> Option<f64> {
		let column = self.columns.iter().position(|c| c == feature)?;
		self.row(i).map(|row| row[column])
	}

	/// `true` for rows holding their word's gold correction.
	pub fn gold_labels(&self, gold: &HashMap<u64, String>) -> Vec<bool> {
		self.rows
			.iter()
			.map(|row| gold.get(&row.position).is_some_and(|correction| *correction == row.candidate))
			.collect()
	}

	/// Checks that `labels` has one entry per row.
	///
	/// # Errors
	/// Returns `InvalidArgument` on a length mismatch.
	pub fn check_labels(&self, labels: &[bool]) -> Result<()> {
		if labels.len() != self.rows.len() {
			return Err(NgramError::InvalidArgument(format!(
				"{} labels for {} rows",
				labels.len(),
				self.rows.len()
			)));
		}
		Ok(())
	}
}

/// A trained model deciding which rows are the right correction.
pub trait Classifier {
	/// One verdict per row of `features`.
	fn predict(&self, features: &FeatureMatrix) -> Result<Vec<bool>>;
}

/// Trains a `Classifier` from labelled rows.
pub trait Estimator {
	type Model: Classifier;

	/// # Errors
	/// Implementations should reject mismatched lengths with
	/// `FeatureMatrix::check_labels`.
	fn train(&self, features: &FeatureMatrix, labels: &[bool]) -> Result<Self::Model>;
}
