use std::sync::Arc;

use super::{FeatureKind, FeatureType, Normalization, WordIsolatedFeature};
use crate::context::Word;
use crate::resource::{Lexicon, edit_distance};

/// Proposes lexicon words close to the spelling and scores by edit distance.
///
/// Also a detector: a word missing from the lexicon is flagged.
#[derive(Clone, Debug)]
pub struct EditDistanceFeature {
	lexicon: Arc<Lexicon>,
	max_distance: usize,
}

impl EditDistanceFeature {
	pub fn new(lexicon: Arc<Lexicon>, max_distance: usize) -> Self {
		Self { lexicon, max_distance }
	}
}

impl WordIsolatedFeature for EditDistanceFeature {
	fn feature_type(&self) -> FeatureType {
		FeatureType::new(FeatureKind::EditDistance)
	}

	fn normalization(&self) -> Normalization {
		Normalization::RescaleAndNegate
	}

	fn detect(&self, word: &Word) -> Option<bool> {
		Some(!self.lexicon.contains(word.text()))
	}

	fn search(&self, spelling: &str) -> Vec<String> {
		self.lexicon.within_distance(spelling, self.max_distance)
	}

	fn score(&self, word: &Word, candidate: &str) -> f64 {
		edit_distance(word.text(), candidate) as f64
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_search_and_scores() {
		let feature = EditDistanceFeature::new(Arc::new(Lexicon::from_words(["cat", "rat", "dog"])), 1);
		let error = Word::from_tokens("cqt", 0, &["the"], &["sat"]).unwrap();
		let fine = Word::from_tokens("dog", 1, &["the"], &["sat"]).unwrap();

		assert_eq!(feature.detect(&error), Some(true));
		assert_eq!(feature.detect(&fine), Some(false));
		assert_eq!(feature.search("cqt"), vec!["cat"]);
		assert_eq!(feature.score(&error, "cat"), 1.0);
		assert_eq!(feature.score(&error, "dog"), 3.0);
	}
}
