use std::sync::Arc;

use super::{ContextSensitiveFeature, FeatureKind, FeatureType, Normalization};
use crate::context::MAX_NGRAM_SIZE;
use crate::corpus::NgramCorpusIndex;
use crate::error::{NgramError, Result};
use crate::matcher::MatchMode;

/// Scores candidates by how often they fill the pivot of the word's
/// `size`-gram contexts in a corpus.
///
/// Defaults to `LogAndRescale`, since corpus counts span many orders of
/// magnitude.
#[derive(Clone, Debug)]
pub struct NgramFrequencyFeature {
	index: Arc<NgramCorpusIndex>,
	size: usize,
	mode: MatchMode,
	normalization: Normalization,
	name: Option<String>,
	detects: bool,
}

impl NgramFrequencyFeature {
	/// # Errors
	/// Returns `InvalidArgument` unless `2 <= size <= MAX_NGRAM_SIZE`.
	pub fn new(index: Arc<NgramCorpusIndex>, size: usize, mode: MatchMode) -> Result<Self> {
		if !(2..=MAX_NGRAM_SIZE).contains(&size) {
			return Err(NgramError::InvalidArgument(format!(
				"n-gram size must be between 2 and {}, got {}",
				MAX_NGRAM_SIZE, size
			)));
		}
		Ok(Self {
			index,
			size,
			mode,
			normalization: Normalization::LogAndRescale,
			name: None,
			detects: false,
		})
	}

	pub fn with_normalization(mut self, normalization: Normalization) -> Self {
		self.normalization = normalization;
		self
	}

	/// Distinguishes two features of the same size and mode (e.g. two corpora).
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_detection(mut self, detects: bool) -> Self {
		self.detects = detects;
		self
	}
}

impl ContextSensitiveFeature for NgramFrequencyFeature {
	fn feature_type(&self) -> FeatureType {
		FeatureType {
			kind: FeatureKind::NgramFrequency { size: self.size, mode: self.mode },
			name: self.name.clone(),
		}
	}

	fn normalization(&self) -> Normalization {
		self.normalization
	}

	fn ngram_size(&self) -> usize {
		self.size
	}

	fn mode(&self) -> MatchMode {
		self.mode
	}

	fn index(&self) -> &NgramCorpusIndex {
		&self.index
	}

	fn detects(&self) -> bool {
		self.detects
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn empty_index() -> Arc<NgramCorpusIndex> {
		let files: [&str; 0] = [];
		Arc::new(NgramCorpusIndex::build(&files).unwrap())
	}

	#[test]
	fn size_is_validated() {
		assert!(NgramFrequencyFeature::new(empty_index(), 1, MatchMode::Exact).is_err());
		assert!(NgramFrequencyFeature::new(empty_index(), 6, MatchMode::Exact).is_err());
		assert!(NgramFrequencyFeature::new(empty_index(), 5, MatchMode::Approximate).is_ok());
	}

	#[test]
	fn identity_carries_size_mode_and_name() {
		let feature = NgramFrequencyFeature::new(empty_index(), 3, MatchMode::Approximate)
			.unwrap()
			.with_name("web1t");
		assert_eq!(
			feature.feature_type(),
			FeatureType::named(FeatureKind::NgramFrequency { size: 3, mode: MatchMode::Approximate }, "web1t")
		);
		assert_eq!(feature.normalization(), Normalization::LogAndRescale);
		assert_eq!(feature.score(42), 42.0);
	}
}
