use std::sync::Arc;

use super::{FeatureKind, FeatureType, Normalization, WordIsolatedFeature};
use crate::context::Word;
use crate::resource::UnigramTable;

/// Scores candidates by their unigram count; proposes nothing itself.
#[derive(Clone, Debug)]
pub struct UnigramFeature {
	table: Arc<UnigramTable>,
}

impl UnigramFeature {
	pub fn new(table: Arc<UnigramTable>) -> Self {
		Self { table }
	}
}

impl WordIsolatedFeature for UnigramFeature {
	fn feature_type(&self) -> FeatureType {
		FeatureType::new(FeatureKind::UnigramFrequency)
	}

	fn normalization(&self) -> Normalization {
		Normalization::LogAndRescale
	}

	fn score(&self, _word: &Word, candidate: &str) -> f64 {
		self.table.count(candidate) as f64
	}
}
