use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::suggestion::Suggestion;

/// Cut-offs reported when the caller has no preference.
pub const DEFAULT_RECALL_KS: [usize; 6] = [100, 50, 20, 10, 5, 3];

/// Recall@K of a batch against gold corrections.
///
/// A gold word counts as a hit at K when its correction survives
/// `suggestion.pruned(K)`. Gold words without a suggestion (e.g. dropped by
/// detection) count as misses. When several suggestions share a position
/// only the first one is scored, so recall never exceeds 1.0.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecallReport {
	gold: usize,
	/// `(k, hits)` in the order the cut-offs were given.
	hits: Vec<(usize, usize)>,
}

impl RecallReport {
	/// `gold` maps a word position to its expected correction.
	pub fn compute(suggestions: &[Suggestion], gold: &HashMap<u64, String>, ks: &[usize]) -> Self {
		let mut seen = HashSet::new();
		let labelled: Vec<(&Suggestion, &str)> = suggestions
			.iter()
			.filter(|s| seen.insert(s.position()))
			.filter_map(|s| gold.get(&s.position()).map(|correction| (s, correction.as_str())))
			.collect();

		let hits = ks
			.iter()
			.map(|&k| {
				let found = labelled.iter().filter(|(s, correction)| s.pruned(k).contains(correction)).count();
				(k, found)
			})
			.collect();
		Self { gold: gold.len(), hits }
	}

	/// Number of gold-labelled words.
	pub fn gold(&self) -> usize {
		self.gold
	}

	/// Recall at cut-off `k`, if it was computed. 0.0 when there is no gold.
	pub fn at(&self, k: usize) -> Option<f64> {
		self.hits.iter().find(|(cut, _)| *cut == k).map(|(_, found)| self.ratio(*found))
	}

	/// `(k, recall)` pairs.
	pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
		self.hits.iter().map(|(k, found)| (*k, self.ratio(*found)))
	}

	fn ratio(&self, found: usize) -> f64 {
		if self.gold == 0 {
			return 0.0;
		}
		found as f64 / self.gold as f64
	}
}
