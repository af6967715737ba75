//! Scoring features and their identities.
//!
//! A feature either depends only on a word's spelling (`WordIsolated`) or
//! on its n-gram contexts (`ContextSensitive`). The engine dispatches on
//! that tag; nothing else about a feature changes how it is scheduled.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::Word;
use crate::corpus::NgramCorpusIndex;
use crate::error::{NgramError, Result};
use crate::matcher::MatchMode;

/// Lexicon edit-distance feature.
pub mod edit_distance;

/// N-gram context frequency feature.
pub mod ngram;

/// Score normalization policies.
pub mod normalization;

/// Unigram frequency feature.
pub mod unigram;

pub use edit_distance::EditDistanceFeature;
pub use ngram::NgramFrequencyFeature;
pub use normalization::Normalization;
pub use unigram::UnigramFeature;

/// What a feature measures.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
	NgramFrequency { size: usize, mode: MatchMode },
	EditDistance,
	UnigramFrequency,
	Custom,
}

/// Identity of a feature instance; decides its score-vector slot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureType {
	pub kind: FeatureKind,
	pub name: Option<String>,
}

impl FeatureType {
	pub fn new(kind: FeatureKind) -> Self {
		Self { kind, name: None }
	}

	pub fn named(kind: FeatureKind, name: impl Into<String>) -> Self {
		Self { kind, name: Some(name.into()) }
	}
}

impl fmt::Display for FeatureType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.kind {
			FeatureKind::NgramFrequency { size, mode } => write!(f, "{}gram-{:?}", size, mode)?,
			kind => write!(f, "{:?}", kind)?,
		}
		if let Some(name) = &self.name {
			write!(f, ":{}", name)?;
		}
		Ok(())
	}
}

/// Assigns each feature type of a batch a fixed slot.
///
/// # Invariants
/// - no feature type is registered twice
/// - `slots[types[i]] == i`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<FeatureType>", into = "Vec<FeatureType>")]
pub struct FeatureRegistry {
	types: Vec<FeatureType>,
	slots: HashMap<FeatureType, usize>,
}

impl FeatureRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `feature_type` and returns its slot.
	///
	/// # Errors
	/// Returns `DuplicateFeature` if it is already registered; the existing
	/// registration is left untouched.
	pub fn register(&mut self, feature_type: FeatureType) -> Result<usize> {
		if self.slots.contains_key(&feature_type) {
			return Err(NgramError::DuplicateFeature(feature_type));
		}
		let slot = self.types.len();
		self.slots.insert(feature_type.clone(), slot);
		self.types.push(feature_type);
		Ok(slot)
	}

	pub fn slot(&self, feature_type: &FeatureType) -> Option<usize> {
		self.slots.get(feature_type).copied()
	}

	pub fn types(&self) -> &[FeatureType] {
		&self.types
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}
}

impl TryFrom<Vec<FeatureType>> for FeatureRegistry {
	type Error = NgramError;

	fn try_from(types: Vec<FeatureType>) -> Result<Self> {
		let mut registry = Self::new();
		for feature_type in types {
			registry.register(feature_type)?;
		}
		Ok(registry)
	}
}

impl From<FeatureRegistry> for Vec<FeatureType> {
	fn from(registry: FeatureRegistry) -> Self {
		registry.types
	}
}

/// A feature whose candidates and scores depend only on the word itself.
pub trait WordIsolatedFeature: Send + Sync {
	fn feature_type(&self) -> FeatureType;

	fn normalization(&self) -> Normalization;

	/// `Some(true)` if the word looks erroneous; `None` if this feature
	/// takes no part in detection.
	fn detect(&self, _word: &Word) -> Option<bool> {
		None
	}

	/// Candidates for a spelling. Memoized per spelling by the engine.
	fn search(&self, _spelling: &str) -> Vec<String> {
		Vec::new()
	}

	/// Raw score of `candidate` as a replacement for `word`.
	fn score(&self, word: &Word, candidate: &str) -> f64;
}

/// A feature scored from corpus frequencies of a word's n-gram contexts.
pub trait ContextSensitiveFeature: Send + Sync {
	fn feature_type(&self) -> FeatureType;

	fn normalization(&self) -> Normalization;

	fn ngram_size(&self) -> usize;

	fn mode(&self) -> MatchMode;

	/// Corpus of `ngram_size()`-grams this feature reads.
	fn index(&self) -> &NgramCorpusIndex;

	/// Whether words with no confirmed context are flagged during detection.
	fn detects(&self) -> bool {
		false
	}

	/// Raw score of a summed corpus frequency.
	fn score(&self, frequency: u64) -> f64 {
		frequency as f64
	}
}

/// How the engine schedules a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStrategy {
	WordIsolated,
	ContextSensitive { ngram_size: usize },
}

/// A scoring feature, tagged by scheduling strategy.
pub enum Feature {
	WordIsolated(Box<dyn WordIsolatedFeature>),
	ContextSensitive(Box<dyn ContextSensitiveFeature>),
}

impl Feature {
	pub fn word_isolated<F: WordIsolatedFeature + 'static>(feature: F) -> Self {
		Feature::WordIsolated(Box::new(feature))
	}

	pub fn context_sensitive<F: ContextSensitiveFeature + 'static>(feature: F) -> Self {
		Feature::ContextSensitive(Box::new(feature))
	}

	pub fn feature_type(&self) -> FeatureType {
		match self {
			Feature::WordIsolated(f) => f.feature_type(),
			Feature::ContextSensitive(f) => f.feature_type(),
		}
	}

	pub fn normalization(&self) -> Normalization {
		match self {
			Feature::WordIsolated(f) => f.normalization(),
			Feature::ContextSensitive(f) => f.normalization(),
		}
	}

	pub fn strategy(&self) -> SearchStrategy {
		match self {
			Feature::WordIsolated(_) => SearchStrategy::WordIsolated,
			Feature::ContextSensitive(f) => SearchStrategy::ContextSensitive { ngram_size: f.ngram_size() },
		}
	}
}

impl fmt::Debug for Feature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Feature")
			.field("type", &self.feature_type())
			.field("strategy", &self.strategy())
			.finish()
	}
}
