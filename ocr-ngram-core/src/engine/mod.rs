//! Batch suggestion engine.
//!
//! Turns a batch of words into scored suggestions in five phases:
//!
//! 1. Detection (optional): keep only words some feature flags.
//! 2. Word-isolated search: memoized per spelling, unioned into a pool per word.
//! 3. Context-sensitive suggestion: one corpus scan per distinct first token,
//!    top-K per feature fed back into the pool.
//! 4. Word-isolated scoring of every pool member.
//! 5. Per-feature normalization and assembly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::context::{NgramContext, Word};
use crate::corpus::NgramCorpusIndex;
use crate::error::{NgramError, Result};
use crate::feature::{ContextSensitiveFeature, Feature, FeatureRegistry, FeatureType, Normalization, WordIsolatedFeature};
use crate::matcher::exact::confirms;
use crate::matcher::{CandidateFrequencyMap, ContextMatcher, MatchMode, match_group};
use crate::parallel::parallel_map;
use crate::resource::edit_distance;
use crate::suggestion::{Candidate, Suggestion, sort_by_position};

mod cache;

use cache::SpellingCache;

/// Scores of one feature: per word, candidate → score.
type ScoreTable = Vec<HashMap<String, f64>>;

/// A token group whose scan failed. Its contexts contributed nothing.
#[derive(Debug)]
pub struct GroupFailure {
	pub feature: FeatureType,
	pub token: String,
	/// Number of contexts in the group.
	pub contexts: usize,
	pub error: NgramError,
}

/// Result of one batch call.
#[derive(Debug, Default)]
pub struct BatchOutcome {
	/// Ordered by word position.
	pub suggestions: Vec<Suggestion>,
	pub failures: Vec<GroupFailure>,
	/// Words dropped because no feature flagged them.
	pub undetected: usize,
}

/// One scored candidate while a context feature picks its top-K.
struct Ranked {
	text: String,
	frequency: u64,
	score: f64,
	distance: usize,
}

/// Drives detection, candidate search and scoring for batches of words.
///
/// # Responsibilities
/// - Own the batch's features, in registration order
/// - Group contexts by first token so each corpus run is read once per feature
/// - Fan work out over words and token groups
///
/// # Invariants
/// - Feature `i` fills slot `i` of every candidate's score vector
///
/// # Notes
/// - The engine holds no corpus state; features carry their own resources.
#[derive(Debug, Default)]
pub struct BatchSuggestionEngine {
	features: Vec<Feature>,
	config: EngineConfig,
}

impl BatchSuggestionEngine {
	pub fn new(config: EngineConfig) -> Self {
		Self { features: Vec::new(), config }
	}

	pub fn with_feature(mut self, feature: Feature) -> Self {
		self.add_feature(feature);
		self
	}

	/// Appends a feature. Duplicates are reported when a batch starts.
	pub fn add_feature(&mut self, feature: Feature) {
		self.features.push(feature);
	}

	pub fn features(&self) -> &[Feature] {
		&self.features
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Slots of the current features.
	///
	/// # Errors
	/// Returns `DuplicateFeature` if two features share a `FeatureType`.
	pub fn registry(&self) -> Result<FeatureRegistry> {
		FeatureRegistry::try_from(self.features.iter().map(Feature::feature_type).collect::<Vec<_>>())
	}

	/// Runs a batch under the configured deadline, if any.
	pub fn suggest(&self, words: &[Word]) -> Result<BatchOutcome> {
		let cancel = self.config.cancellation_token();
		self.suggest_with(words, &cancel)
	}

	/// Runs a batch under a caller-provided cancellation token.
	///
	/// # Errors
	/// - `DuplicateFeature` before any work starts
	/// - `Cancelled` once `cancel` fires
	/// - any scan error when `isolate_group_failures` is off
	pub fn suggest_with(&self, words: &[Word], cancel: &CancellationToken) -> Result<BatchOutcome> {
		let registry = self.registry()?;
		cancel.check()?;
		info!("Suggesting for {} words with {} features", words.len(), self.features.len());

		let mut failures = Vec::new();
		let kept: Vec<&Word> = if self.config.detect {
			let flags = self.detect_into(words, cancel, &mut failures)?;
			words.iter().zip(flags).filter(|(_, flagged)| *flagged).map(|(word, _)| word).collect()
		} else {
			words.iter().collect()
		};
		let undetected = words.len() - kept.len();
		if undetected > 0 {
			debug!("Detection kept {} of {} words", kept.len(), words.len());
		}

		let mut pools = self.search_pools(&kept, cancel)?;
		let mut scores: Vec<ScoreTable> = vec![vec![HashMap::new(); kept.len()]; self.features.len()];
		let mut frequencies: Vec<HashMap<String, u64>> = vec![HashMap::new(); kept.len()];

		for (slot, feature) in self.features.iter().enumerate() {
			if let Feature::ContextSensitive(feature) = feature {
				cancel.check()?;
				scores[slot] =
					self.suggest_in_context(&**feature, &kept, &mut pools, &mut frequencies, cancel, &mut failures)?;
			}
		}

		for (slot, feature) in self.features.iter().enumerate() {
			if let Feature::WordIsolated(feature) = feature {
				cancel.check()?;
				scores[slot] = self.score_isolated(&**feature, &kept, &pools);
			}
		}

		for (feature, table) in self.features.iter().zip(scores.iter_mut()) {
			let normalization = feature.normalization();
			for word_scores in table.iter_mut() {
				normalize(word_scores, normalization);
			}
		}

		let mut suggestions = assemble(&kept, &registry, pools, &scores, &frequencies)?;
		sort_by_position(&mut suggestions);
		info!(
			"Built {} suggestions ({} undetected, {} failed groups)",
			suggestions.len(),
			undetected,
			failures.len()
		);
		Ok(BatchOutcome { suggestions, failures, undetected })
	}

	/// Flags each word that at least one feature considers erroneous.
	///
	/// Word-isolated features answer per word. A detecting context feature
	/// flags a word that has contexts but none the corpus confirms with the
	/// word's own spelling; contexts of failed groups are ignored.
	///
	/// # Errors
	/// Same as `suggest_with`.
	pub fn detect(&self, words: &[Word], cancel: &CancellationToken) -> Result<(Vec<bool>, Vec<GroupFailure>)> {
		self.registry()?;
		let mut failures = Vec::new();
		let flags = self.detect_into(words, cancel, &mut failures)?;
		Ok((flags, failures))
	}

	fn detect_into(&self, words: &[Word], cancel: &CancellationToken, failures: &mut Vec<GroupFailure>) -> Result<Vec<bool>> {
		let mut flags = vec![false; words.len()];
		for feature in &self.features {
			cancel.check()?;
			match feature {
				Feature::WordIsolated(feature) => {
					let verdicts = parallel_map(words, self.config.chunk_factor(), |word| feature.detect(word) == Some(true));
					for (flag, verdict) in flags.iter_mut().zip(verdicts) {
						*flag |= verdict;
					}
				}
				Feature::ContextSensitive(feature) if feature.detects() => {
					let contexts = collect_contexts(words.iter(), feature.ngram_size());
					let maps = self.scan_groups(
						&feature.feature_type(),
						feature.index(),
						&contexts,
						MatchMode::Exact.matcher(),
						cancel,
						failures,
					)?;

					let mut scanned = vec![false; words.len()];
					let mut confirmed = vec![false; words.len()];
					for (context, map) in contexts.iter().zip(&maps) {
						if let Some(map) = map {
							scanned[context.word()] = true;
							confirmed[context.word()] |= confirms(context, map);
						}
					}
					for (i, flag) in flags.iter_mut().enumerate() {
						*flag |= scanned[i] && !confirmed[i];
					}
				}
				Feature::ContextSensitive(_) => {}
			}
		}
		Ok(flags)
	}

	/// Unions every word-isolated feature's search results per word.
	fn search_pools(&self, words: &[&Word], cancel: &CancellationToken) -> Result<Vec<BTreeSet<String>>> {
		let cache = SpellingCache::new();
		let mut pools = vec![BTreeSet::new(); words.len()];
		for (slot, feature) in self.features.iter().enumerate() {
			let Feature::WordIsolated(feature) = feature else {
				continue;
			};
			cancel.check()?;
			let found = parallel_map(words, self.config.chunk_factor(), |word| {
				cache.get_or_compute(slot, word.text(), || feature.search(word.text()))
			});
			for (pool, candidates) in pools.iter_mut().zip(found) {
				pool.extend(candidates.iter().cloned());
			}
		}
		let (hits, misses) = cache.stats();
		debug!("Search cache: {} hits, {} misses", hits, misses);
		Ok(pools)
	}

	/// Scans, sums and ranks one context feature's candidates per word.
	///
	/// Pool members the corpus never saw are scored as frequency 0. The
	/// top-K of each word joins its pool and is the only scored set.
	fn suggest_in_context(
		&self,
		feature: &dyn ContextSensitiveFeature,
		words: &[&Word],
		pools: &mut [BTreeSet<String>],
		frequencies: &mut [HashMap<String, u64>],
		cancel: &CancellationToken,
		failures: &mut Vec<GroupFailure>,
	) -> Result<ScoreTable> {
		let feature_type = feature.feature_type();
		let contexts = collect_contexts(words.iter().copied(), feature.ngram_size());
		let maps = self.scan_groups(&feature_type, feature.index(), &contexts, feature.mode().matcher(), cancel, failures)?;

		let mut merged = vec![CandidateFrequencyMap::new(); words.len()];
		for (context, map) in contexts.iter().zip(maps) {
			let Some(map) = map else {
				continue;
			};
			let target = &mut merged[context.word()];
			for (candidate, frequency) in map {
				*target.entry(candidate).or_insert(0) += frequency;
			}
		}

		let top_k = self.config.top_k();
		let mut table = Vec::with_capacity(words.len());
		for (i, (word, mut candidates)) in words.iter().zip(merged).enumerate() {
			for member in &pools[i] {
				candidates.entry(member.clone()).or_insert(0);
			}

			let mut ranked: Vec<Ranked> = candidates
				.into_iter()
				.map(|(text, frequency)| Ranked {
					score: feature.score(frequency),
					distance: edit_distance(word.text(), &text),
					text,
					frequency,
				})
				.collect();
			ranked.sort_by(|a, b| {
				b.score
					.total_cmp(&a.score)
					.then(a.distance.cmp(&b.distance))
					.then_with(|| a.text.cmp(&b.text))
			});
			ranked.truncate(top_k);

			let mut word_scores = HashMap::with_capacity(ranked.len());
			for candidate in ranked {
				let seen = frequencies[i].entry(candidate.text.clone()).or_insert(0);
				*seen = (*seen).max(candidate.frequency);
				pools[i].insert(candidate.text.clone());
				word_scores.insert(candidate.text, candidate.score);
			}
			table.push(word_scores);
		}
		debug!("{}: ranked candidates for {} words", feature_type, words.len());
		Ok(table)
	}

	fn score_isolated(&self, feature: &dyn WordIsolatedFeature, words: &[&Word], pools: &[BTreeSet<String>]) -> ScoreTable {
		let jobs: Vec<(&Word, &BTreeSet<String>)> = words.iter().copied().zip(pools).collect();
		parallel_map(&jobs, self.config.chunk_factor(), |(word, pool)| {
			pool.iter()
				.map(|candidate| (candidate.clone(), feature.score(word, candidate)))
				.collect::<HashMap<_, _>>()
		})
	}

	/// Scans every first-token group of `contexts` in parallel.
	///
	/// Returns one map per context in input order; `None` marks contexts of
	/// a failed group when failures are isolated.
	fn scan_groups(
		&self,
		feature: &FeatureType,
		index: &NgramCorpusIndex,
		contexts: &[NgramContext],
		matcher: &dyn ContextMatcher,
		cancel: &CancellationToken,
		failures: &mut Vec<GroupFailure>,
	) -> Result<Vec<Option<CandidateFrequencyMap>>> {
		let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
		for (i, context) in contexts.iter().enumerate() {
			groups.entry(context.first_token()).or_default().push(i);
		}
		let groups: Vec<(&str, Vec<usize>)> = groups.into_iter().collect();
		debug!("{}: {} contexts in {} token groups", feature, contexts.len(), groups.len());

		let results = parallel_map(&groups, self.config.chunk_factor(), |(token, members)| {
			let members: Vec<&NgramContext> = members.iter().map(|&i| &contexts[i]).collect();
			match_group(index, token, &members, matcher, cancel)
		});

		let mut maps = vec![None; contexts.len()];
		for ((token, members), result) in groups.iter().zip(results) {
			match result {
				Ok(group_maps) => {
					for (&i, map) in members.iter().zip(group_maps) {
						maps[i] = Some(map);
					}
				}
				Err(NgramError::Cancelled) => return Err(NgramError::Cancelled),
				Err(error) if self.config.isolate_group_failures => {
					warn!("{}: skipping {} contexts of group '{}': {}", feature, members.len(), token, error);
					failures.push(GroupFailure {
						feature: feature.clone(),
						token: (*token).to_owned(),
						contexts: members.len(),
						error,
					});
				}
				Err(error) => return Err(error),
			}
		}
		Ok(maps)
	}
}

/// Every `size`-gram context of `words`, tagged with the word's batch index.
fn collect_contexts<'w>(words: impl Iterator<Item = &'w Word>, size: usize) -> Vec<NgramContext> {
	words.enumerate().flat_map(|(i, word)| word.contexts(i, size)).collect()
}

/// Normalizes one word's scores in place, in candidate order.
fn normalize(scores: &mut HashMap<String, f64>, normalization: Normalization) {
	let mut entries: Vec<(&String, &mut f64)> = scores.iter_mut().collect();
	entries.sort_by(|a, b| a.0.cmp(b.0));
	let mut values: Vec<f64> = entries.iter().map(|(_, score)| **score).collect();
	normalization.apply(&mut values);
	for ((_, score), value) in entries.into_iter().zip(values) {
		*score = value;
	}
}

fn assemble(
	words: &[&Word],
	registry: &FeatureRegistry,
	pools: Vec<BTreeSet<String>>,
	scores: &[ScoreTable],
	frequencies: &[HashMap<String, u64>],
) -> Result<Vec<Suggestion>> {
	words
		.iter()
		.zip(pools)
		.enumerate()
		.map(|(i, (word, pool))| {
			let candidates = pool
				.into_iter()
				.map(|text| {
					let slots = scores.iter().map(|table| table[i].get(&text).copied().unwrap_or(0.0)).collect();
					let frequency = frequencies[i].get(&text).copied().unwrap_or(0);
					Candidate::new(text, slots, frequency)
				})
				.collect();
			Suggestion::new(word.text(), word.position(), registry.clone(), candidates)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::path::Path;
	use std::sync::Arc;

	use crate::feature::{EditDistanceFeature, FeatureKind, NgramFrequencyFeature, UnigramFeature};
	use crate::resource::{Lexicon, UnigramTable};

	const CORPUS: &str = "the cat sat\t10\nthe dog sat\t5\nthe rat sat\t1\n";

	fn index(dir: &Path, content: &str) -> Arc<NgramCorpusIndex> {
		let path = dir.join("3gm.txt");
		fs::write(&path, content).unwrap();
		Arc::new(NgramCorpusIndex::build(&[path]).unwrap())
	}

	fn trigram(index: Arc<NgramCorpusIndex>) -> Feature {
		Feature::context_sensitive(
			NgramFrequencyFeature::new(index, 3, MatchMode::Exact)
				.unwrap()
				.with_normalization(Normalization::Rescale),
		)
	}

	fn word(text: &str, position: u64, before: &[&str], after: &[&str]) -> Word {
		Word::from_tokens(text, position, before, after).unwrap()
	}

	fn score(suggestion: &Suggestion, candidate: &str, slot: usize) -> f64 {
		suggestion.candidate(candidate).unwrap().scores()[slot]
	}

	#[test]
	fn rescaled_trigram_frequencies() {
		let _ = env_logger::builder().is_test(true).try_init();
		let dir = tempfile::tempdir().unwrap();
		let engine = BatchSuggestionEngine::new(EngineConfig::default()).with_feature(trigram(index(dir.path(), CORPUS)));

		let outcome = engine.suggest(&[word("cqt", 3, &["the"], &["sat"])]).unwrap();
		assert!(outcome.failures.is_empty());
		let suggestion = &outcome.suggestions[0];
		assert_eq!(suggestion.text(), "cqt");
		assert_eq!(suggestion.candidates().len(), 3);
		assert_eq!(score(suggestion, "cat", 0), 1.0);
		assert!((score(suggestion, "dog", 0) - 4.0 / 9.0).abs() < 1e-9);
		assert_eq!(score(suggestion, "rat", 0), 0.0);
		assert_eq!(suggestion.candidate("cat").unwrap().frequency(), 10);
	}

	#[test]
	fn pool_members_join_every_feature() {
		let dir = tempfile::tempdir().unwrap();
		let lexicon = Arc::new(Lexicon::from_words(["cat", "cot"]));
		let engine = BatchSuggestionEngine::new(EngineConfig::default())
			.with_feature(trigram(index(dir.path(), CORPUS)))
			.with_feature(Feature::word_isolated(EditDistanceFeature::new(lexicon, 1)));

		let outcome = engine.suggest(&[word("cqt", 0, &["the"], &["sat"])]).unwrap();
		let suggestion = &outcome.suggestions[0];
		let texts: Vec<&str> = suggestion.candidates().iter().map(|c| c.text()).collect();
		assert_eq!(texts, vec!["cat", "cot", "dog", "rat"]);

		// cot is unknown to the corpus but still scored as frequency 0
		assert_eq!(score(suggestion, "cot", 0), 0.0);
		assert_eq!(suggestion.candidate("cot").unwrap().frequency(), 0);
		// distances 1, 1, 3, 2 negated onto [0, 1]
		assert_eq!(score(suggestion, "cat", 1), 1.0);
		assert_eq!(score(suggestion, "cot", 1), 1.0);
		assert_eq!(score(suggestion, "dog", 1), 0.0);
		assert_eq!(score(suggestion, "rat", 1), 0.5);
	}

	#[test]
	fn top_k_limits_each_context_feature() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = EngineConfig::default();
		config.set_top_k(2).unwrap();
		let engine = BatchSuggestionEngine::new(config).with_feature(trigram(index(dir.path(), CORPUS)));

		let outcome = engine.suggest(&[word("cqt", 0, &["the"], &["sat"])]).unwrap();
		let texts: Vec<&str> = outcome.suggestions[0].candidates().iter().map(|c| c.text()).collect();
		assert_eq!(texts, vec!["cat", "dog"]);
	}

	#[test]
	fn unigram_scores_pool_and_results_follow_position() {
		let dir = tempfile::tempdir().unwrap();
		let table = Arc::new(UnigramTable::from_counts([("cat", 100u64), ("dog", 10)]));
		let engine = BatchSuggestionEngine::new(EngineConfig::default())
			.with_feature(trigram(index(dir.path(), CORPUS)))
			.with_feature(Feature::word_isolated(UnigramFeature::new(table)));

		let words = [word("dqg", 9, &["the"], &["sat"]), word("cqt", 2, &["the"], &["sat"])];
		let outcome = engine.suggest(&words).unwrap();
		let positions: Vec<u64> = outcome.suggestions.iter().map(|s| s.position()).collect();
		assert_eq!(positions, vec![2, 9]);
		let first = &outcome.suggestions[0];
		assert_eq!(score(first, "cat", 1), 1.0);
		assert_eq!(score(first, "rat", 1), 0.0);
	}

	#[test]
	fn duplicate_features_fail_the_batch() {
		let lexicon = Arc::new(Lexicon::from_words(["cat"]));
		let engine = BatchSuggestionEngine::new(EngineConfig::default())
			.with_feature(Feature::word_isolated(EditDistanceFeature::new(Arc::clone(&lexicon), 1)))
			.with_feature(Feature::word_isolated(EditDistanceFeature::new(lexicon, 2)));

		match engine.suggest(&[word("cqt", 0, &[], &[])]) {
			Err(NgramError::DuplicateFeature(t)) => assert_eq!(t, FeatureType::new(FeatureKind::EditDistance)),
			other => panic!("expected duplicate feature, got {:?}", other),
		}
	}

	#[test]
	fn detection_keeps_flagged_words_only() {
		let lexicon = Arc::new(Lexicon::from_words(["cat", "dog"]));
		let mut config = EngineConfig::default();
		config.detect = true;
		let engine = BatchSuggestionEngine::new(config).with_feature(Feature::word_isolated(EditDistanceFeature::new(lexicon, 1)));

		let outcome = engine
			.suggest(&[word("cqt", 0, &[], &[]), word("dog", 1, &[], &[])])
			.unwrap();
		assert_eq!(outcome.undetected, 1);
		assert_eq!(outcome.suggestions.len(), 1);
		assert_eq!(outcome.suggestions[0].text(), "cqt");
		assert!(outcome.suggestions[0].contains("cat"));
	}

	#[test]
	fn context_detection_flags_unconfirmed_words() {
		let dir = tempfile::tempdir().unwrap();
		let feature = NgramFrequencyFeature::new(index(dir.path(), "the cat sat\t10\n"), 3, MatchMode::Exact)
			.unwrap()
			.with_detection(true);
		let engine = BatchSuggestionEngine::new(EngineConfig::default()).with_feature(Feature::context_sensitive(feature));

		let words = [
			word("cat", 0, &["the"], &["sat"]),
			word("cqt", 1, &["the"], &["sat"]),
			word("alone", 2, &[], &[]),
		];
		let (flags, failures) = engine.detect(&words, &CancellationToken::new()).unwrap();
		assert_eq!(flags, vec![false, true, false]);
		assert!(failures.is_empty());
	}

	#[test]
	fn failing_group_is_isolated_or_fatal() {
		let dir = tempfile::tempdir().unwrap();
		let corpus = index(dir.path(), "a big dog\t3\nthe cat sat\t10\nthe dog sat\n");
		let words = [word("cqt", 0, &["the"], &["sat"]), word("bjg", 1, &["a"], &["dog"])];

		let engine = BatchSuggestionEngine::new(EngineConfig::default()).with_feature(trigram(Arc::clone(&corpus)));
		let outcome = engine.suggest(&words).unwrap();
		assert_eq!(outcome.failures.len(), 1);
		assert_eq!(outcome.failures[0].token, "the");
		assert!(matches!(outcome.failures[0].error, NgramError::Parse { .. }));
		assert!(outcome.suggestions[0].candidates().is_empty());
		assert!(outcome.suggestions[1].contains("big"));

		let mut config = EngineConfig::default();
		config.isolate_group_failures = false;
		let engine = BatchSuggestionEngine::new(config).with_feature(trigram(corpus));
		assert!(matches!(engine.suggest(&words), Err(NgramError::Parse { .. })));
	}

	#[test]
	fn cancelled_batch_stops() {
		let dir = tempfile::tempdir().unwrap();
		let engine = BatchSuggestionEngine::new(EngineConfig::default()).with_feature(trigram(index(dir.path(), CORPUS)));
		let cancel = CancellationToken::new();
		cancel.cancel();
		assert!(matches!(
			engine.suggest_with(&[word("cqt", 0, &["the"], &["sat"])], &cancel),
			Err(NgramError::Cancelled)
		));
	}

	#[test]
	fn empty_batch() {
		let engine = BatchSuggestionEngine::new(EngineConfig::default());
		let outcome = engine.suggest(&[]).unwrap();
		assert!(outcome.suggestions.is_empty());
		assert_eq!(outcome.undetected, 0);
	}
}
