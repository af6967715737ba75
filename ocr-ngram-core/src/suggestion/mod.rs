//! Correction candidates for one word, scored by every feature of a batch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{NgramError, Result};
use crate::feature::{FeatureRegistry, FeatureType};
use crate::resource::edit_distance;

/// Stream and per-file persistence.
pub mod persistence;

pub use persistence::{load_dir, load_suggestions, read_suggestions, save_each, save_suggestions, write_suggestions};

/// A replacement proposal with one score per registered feature.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Candidate {
	text: String,
	/// One slot per registry entry; 0.0 where the feature made no proposal.
	scores: Vec<f64>,
	/// Highest raw corpus frequency any context feature saw for it.
	frequency: u64,
}

impl Candidate {
	pub fn new(text: impl Into<String>, scores: Vec<f64>, frequency: u64) -> Self {
		Self { text: text.into(), scores, frequency }
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn scores(&self) -> &[f64] {
		&self.scores
	}

	pub fn frequency(&self) -> u64 {
		self.frequency
	}
}

/// All candidates proposed for one word.
///
/// # Invariants
/// - every candidate's score vector has `registry.len()` slots
///
/// Suggestions are never mutated once built; pruning returns a new one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
	text: String,
	position: u64,
	registry: FeatureRegistry,
	candidates: Vec<Candidate>,
}

impl Suggestion {
	/// # Errors
	/// Returns `InvalidArgument` if a score vector does not match the registry.
	pub fn new(text: impl Into<String>, position: u64, registry: FeatureRegistry, candidates: Vec<Candidate>) -> Result<Self> {
		let suggestion = Self { text: text.into(), position, registry, candidates };
		suggestion.validate()?;
		Ok(suggestion)
	}

	pub(crate) fn validate(&self) -> Result<()> {
		let width = self.registry.len();
		match self.candidates.iter().find(|c| c.scores.len() != width) {
			Some(candidate) => Err(NgramError::InvalidArgument(format!(
				"candidate '{}' has {} scores, registry has {} features",
				candidate.text,
				candidate.scores.len(),
				width
			))),
			None => Ok(()),
		}
	}

	/// The word as it appears in the text.
	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn position(&self) -> u64 {
		self.position
	}

	pub fn registry(&self) -> &FeatureRegistry {
		&self.registry
	}

	pub fn candidates(&self) -> &[Candidate] {
		&self.candidates
	}

	pub fn candidate(&self, text: &str) -> Option<&Candidate> {
		self.candidates.iter().find(|c| c.text == text)
	}

	pub fn contains(&self, text: &str) -> bool {
		self.candidate(text).is_some()
	}

	/// Score of `candidate` under `feature`, if both are present.
	pub fn score(&self, candidate: &str, feature: &FeatureType) -> Option<f64> {
		let slot = self.registry.slot(feature)?;
		self.candidate(candidate).map(|c| c.scores[slot])
	}

	/// `(candidate, score)` pairs for one feature, or `None` if it is not
	/// registered.
	pub fn scores_for(&self, feature: &FeatureType) -> Option<Vec<(&str, f64)>> {
		let slot = self.registry.slot(feature)?;
		Some(self.candidates.iter().map(|c| (c.text.as_str(), c.scores[slot])).collect())
	}

	/// Candidates ordered best first by the feature in `slot`.
	///
	/// Ties go to the smaller edit distance from the word, then the higher
	/// corpus frequency, then the text.
	fn ranked_by_slot(&self, slot: usize) -> Vec<&Candidate> {
		let mut ranked: Vec<(&Candidate, usize)> = self
			.candidates
			.iter()
			.map(|c| (c, edit_distance(&self.text, &c.text)))
			.collect();
		ranked.sort_by(|(a, da), (b, db)| {
			b.scores[slot]
				.total_cmp(&a.scores[slot])
				.then(da.cmp(db))
				.then(b.frequency.cmp(&a.frequency))
				.then_with(|| a.text.cmp(&b.text))
		});
		ranked.into_iter().map(|(c, _)| c).collect()
	}

	/// Candidates ordered best first by `feature`; empty if not registered.
	pub fn ranked(&self, feature: &FeatureType) -> Vec<&Candidate> {
		match self.registry.slot(feature) {
			Some(slot) => self.ranked_by_slot(slot),
			None => Vec::new(),
		}
	}

	/// A new suggestion holding the union of every feature's top `k`.
	///
	/// Candidate order and scores are preserved.
	pub fn pruned(&self, k: usize) -> Suggestion {
		let mut keep: BTreeSet<&str> = BTreeSet::new();
		for slot in 0..self.registry.len() {
			keep.extend(self.ranked_by_slot(slot).into_iter().take(k).map(|c| c.text.as_str()));
		}
		let candidates = self
			.candidates
			.iter()
			.filter(|c| keep.contains(c.text.as_str()))
			.cloned()
			.collect();
		Suggestion {
			text: self.text.clone(),
			position: self.position,
			registry: self.registry.clone(),
			candidates,
		}
	}
}

/// Orders suggestions by position in the text.
pub fn sort_by_position(suggestions: &mut [Suggestion]) {
	suggestions.sort_by_key(|s| s.position);
}
