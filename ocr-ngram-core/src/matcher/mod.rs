//! Skip-gram matching of corpus runs against groups of contexts.
//!
//! Every context of a group shares its first token, so one sequential read
//! of that token's corpus run serves the whole group. Each context gets a
//! candidate → summed frequency map.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::context::NgramContext;
use crate::context::ngram_context::write_skip_gram;
use crate::corpus::{BoundedLineReader, NgramCorpusIndex, NgramRecord};
use crate::error::{NgramError, Result};

/// Exact skip-gram matching.
pub mod exact;

/// Matching that tolerates one extra mismatch.
pub mod approximate;

pub use approximate::ApproximateMatcher;
pub use exact::ExactMatcher;

/// Candidate (gram seen at the pivot) → summed corpus frequency.
pub type CandidateFrequencyMap = HashMap<String, u64>;

/// Lines read between two cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Which matcher a context-sensitive feature uses.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchMode {
	Exact,
	Approximate,
}

impl MatchMode {
	pub fn matcher(self) -> &'static dyn ContextMatcher {
		match self {
			MatchMode::Exact => &ExactMatcher,
			MatchMode::Approximate => &ApproximateMatcher,
		}
	}
}

/// Turns one corpus run into per-context candidate frequencies.
pub trait ContextMatcher: Sync {
	/// Lookup keys for `contexts`, built once before the scan.
	fn key_table(&self, contexts: &[&NgramContext]) -> KeyTable;

	/// Scans `reader` once and returns one map per context, in input order.
	///
	/// # Errors
	/// - `Parse` if a line lacks its frequency field (the scan stops)
	/// - `Io` on read failure
	/// - `Cancelled` if `cancel` fires mid-scan
	fn scan(
		&self,
		reader: &mut BoundedLineReader,
		contexts: &[&NgramContext],
		cancel: &CancellationToken,
	) -> Result<Vec<CandidateFrequencyMap>> {
		let table = self.key_table(contexts);
		scan_run(reader, &table, contexts.len(), cancel)
	}
}

/// Keys for one `(size, pivot, free)` shape, each mapping to the contexts
/// that produced it.
#[derive(Debug, Default)]
struct Bucket {
	size: usize,
	pivot: usize,
	free: Option<usize>,
	keys: HashMap<String, Vec<usize>>,
}

/// All lookup keys of a context group, bucketed by shape.
#[derive(Debug, Default)]
pub struct KeyTable {
	buckets: Vec<Bucket>,
}

impl KeyTable {
	/// Registers `key` for context `context` under the given shape.
	pub(crate) fn insert(&mut self, size: usize, pivot: usize, free: Option<usize>, key: String, context: usize) {
		let position = self
			.buckets
			.iter()
			.position(|b| b.size == size && b.pivot == pivot && b.free == free);
		let bucket = match position {
			Some(i) => &mut self.buckets[i],
			None => {
				self.buckets.push(Bucket { size, pivot, free, keys: HashMap::new() });
				// Just pushed, so the vector is not empty
				let last = self.buckets.len() - 1;
				&mut self.buckets[last]
			}
		};
		bucket.keys.entry(key).or_default().push(context);
	}

	/// Number of distinct keys over all buckets.
	pub fn len(&self) -> usize {
		self.buckets.iter().map(|b| b.keys.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Adds one record's frequency to every context it matches.
	fn accumulate(&self, record: &NgramRecord, key: &mut String, maps: &mut [CandidateFrequencyMap]) {
		for bucket in &self.buckets {
			if bucket.size != record.len() {
				continue;
			}
			write_skip_gram(key, &record.grams, bucket.pivot, bucket.free);
			if let Some(contexts) = bucket.keys.get(key.as_str()) {
				let candidate = record.grams[bucket.pivot];
				for context in contexts {
					*maps[*context].entry(candidate.to_owned()).or_insert(0) += record.frequency;
				}
			}
		}
	}
}

/// Reads every line of `reader` and accumulates matches into one map per
/// context.
fn scan_run(
	reader: &mut BoundedLineReader,
	table: &KeyTable,
	contexts: usize,
	cancel: &CancellationToken,
) -> Result<Vec<CandidateFrequencyMap>> {
	let mut maps = vec![CandidateFrequencyMap::new(); contexts];
	let mut line = String::new();
	let mut key = String::new();

	while reader.read_line(&mut line)? {
		if reader.lines_read() % CANCEL_CHECK_INTERVAL == 0 {
			cancel.check()?;
		}
		let record = NgramRecord::parse(&line).map_err(|reason| {
			NgramError::parse(reader.path(), reader.lines_read(), format!("{} (line number counted from the run start)", reason))
		})?;
		table.accumulate(&record, &mut key, &mut maps);
	}
	Ok(maps)
}

/// Runs `matcher` over the corpus run of `first_token`.
///
/// Contexts whose first token is not indexed get empty maps.
pub fn match_group(
	index: &NgramCorpusIndex,
	first_token: &str,
	contexts: &[&NgramContext],
	matcher: &dyn ContextMatcher,
	cancel: &CancellationToken,
) -> Result<Vec<CandidateFrequencyMap>> {
	match index.open_token(first_token)? {
		Some(mut reader) => {
			let maps = matcher.scan(&mut reader, contexts, cancel)?;
			debug!(
				"Scanned run of '{}': {} lines for {} contexts",
				first_token,
				reader.lines_read(),
				contexts.len()
			);
			Ok(maps)
		}
		None => Ok(vec![CandidateFrequencyMap::new(); contexts.len()]),
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use std::fs;
	use std::path::Path;

	pub(crate) fn corpus(dir: &Path, content: &str) -> NgramCorpusIndex {
		let path = dir.join("corpus.txt");
		fs::write(&path, content).unwrap();
		NgramCorpusIndex::build(&[path]).unwrap()
	}

	pub(crate) fn context(tokens: &[&str], index: usize) -> NgramContext {
		NgramContext::new(0, tokens.iter().map(|t| t.to_string()).collect(), index).unwrap()
	}

	#[test]
	fn unknown_first_token_gives_empty_maps() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), "the cat sat\t10\n");
		let c = context(&["a", "cqt", "sat"], 1);
		let maps = match_group(&index, "a", &[&c], &ExactMatcher, &CancellationToken::new()).unwrap();
		assert_eq!(maps, vec![CandidateFrequencyMap::new()]);
	}

	#[test]
	fn malformed_line_aborts_the_group() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), "the cat sat\t10\nthe dog sat\n");
		let c = context(&["the", "cqt", "sat"], 1);
		let result = match_group(&index, "the", &[&c], &ExactMatcher, &CancellationToken::new());
		assert!(matches!(result, Err(NgramError::Parse { line: 2, .. })));
	}

	#[test]
	fn cancelled_token_stops_scan() {
		let dir = tempfile::tempdir().unwrap();
		let mut content = String::new();
		for i in 0..(CANCEL_CHECK_INTERVAL + 10) {
			content.push_str(&format!("the w{} sat\t1\n", i));
		}
		let index = corpus(dir.path(), &content);
		let c = context(&["the", "cqt", "sat"], 1);
		let cancel = CancellationToken::new();
		cancel.cancel();
		let result = match_group(&index, "the", &[&c], &ApproximateMatcher, &cancel);
		assert!(matches!(result, Err(NgramError::Cancelled)));
	}

	#[test]
	fn mode_dispatch() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), "the cat sat\t10\nthe cat ran\t3\n");
		let c = context(&["the", "cqt", "sat"], 1);
		let cancel = CancellationToken::new();
		let exact = match_group(&index, "the", &[&c], MatchMode::Exact.matcher(), &cancel).unwrap();
		let approx = match_group(&index, "the", &[&c], MatchMode::Approximate.matcher(), &cancel).unwrap();
		assert_eq!(exact[0].get("cat"), Some(&10));
		assert_eq!(approx[0].get("cat"), Some(&13));
	}
}
