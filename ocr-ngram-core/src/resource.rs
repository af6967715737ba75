//! Immutable lookup tables shared by scoring features.
//!
//! Built once by the driver and handed to features as `Arc` handles.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::info;

use crate::corpus::NgramRecord;
use crate::error::{NgramError, Result};
use crate::io::read_lines;

/// Levenshtein distance in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
	strsim::levenshtein(a, b)
}

/// Set of known spellings.
#[derive(Clone, Debug, Default)]
pub struct Lexicon {
	words: HashSet<String>,
}

impl Lexicon {
	pub fn from_words<I, S>(words: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { words: words.into_iter().map(Into::into).collect() }
	}

	/// Loads one word per line; blank lines and `#` comments are skipped.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let lexicon = Self::from_words(read_lines(&path)?.into_iter().map(|l| l.trim().to_owned()));
		info!("Loaded lexicon {:?}: {} words", path.as_ref(), lexicon.len());
		Ok(lexicon)
	}

	/// Exact match, then lowercase match.
	pub fn contains(&self, word: &str) -> bool {
		if self.words.contains(word) {
			return true;
		}
		let lower = word.to_lowercase();
		lower != word && self.words.contains(&lower)
	}

	/// Every known word within `max_distance` edits of `spelling`, sorted.
	///
	/// Linear scan with a length prefilter.
	pub fn within_distance(&self, spelling: &str, max_distance: usize) -> Vec<String> {
		let length = spelling.chars().count();
		let mut found: Vec<String> = self
			.words
			.iter()
			.filter(|w| w.chars().count().abs_diff(length) <= max_distance)
			.filter(|w| edit_distance(spelling, w) <= max_distance)
			.cloned()
			.collect();
		found.sort();
		found
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}
}

/// Word → corpus count.
#[derive(Clone, Debug, Default)]
pub struct UnigramTable {
	counts: HashMap<String, u64>,
}

impl UnigramTable {
	pub fn from_counts<I, S>(counts: I) -> Self
	where
		I: IntoIterator<Item = (S, u64)>,
		S: Into<String>,
	{
		Self { counts: counts.into_iter().map(|(w, c)| (w.into(), c)).collect() }
	}

	/// Loads `word\tcount` lines, the corpus record format.
	///
	/// # Errors
	/// Returns `Parse` on a line without a valid count.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let mut counts = HashMap::new();
		for (i, line) in read_lines(path)?.iter().enumerate() {
			let record = NgramRecord::parse(line).map_err(|reason| NgramError::parse(path, i as u64 + 1, reason))?;
			*counts.entry(record.grams.join(" ")).or_insert(0) += record.frequency;
		}
		info!("Loaded unigram table {:?}: {} entries", path, counts.len());
		Ok(Self { counts })
	}

	/// Count of `word`, 0 when unknown.
	pub fn count(&self, word: &str) -> u64 {
		self.counts.get(word).copied().unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn lexicon_lookup_falls_back_to_lowercase() {
		let lexicon = Lexicon::from_words(["cat", "dog"]);
		assert!(lexicon.contains("cat"));
		assert!(lexicon.contains("Cat"));
		assert!(!lexicon.contains("cqt"));
	}

	#[test]
	fn within_distance_is_sorted_and_bounded() {
		let lexicon = Lexicon::from_words(["cat", "rat", "cart", "dog", "cattle"]);
		assert_eq!(lexicon.within_distance("cqt", 1), vec!["cat"]);
		assert_eq!(lexicon.within_distance("cqt", 2), vec!["cart", "cat", "rat"]);
	}

	#[test]
	fn load_files() {
		let dir = tempfile::tempdir().unwrap();
		let words = dir.path().join("words.txt");
		fs::write(&words, "# english\ncat\ndog\n\n").unwrap();
		assert_eq!(Lexicon::load(&words).unwrap().len(), 2);

		let unigrams = dir.path().join("1gms.txt");
		fs::write(&unigrams, "cat\t10\ndog\t5\ncat\t1\n").unwrap();
		let table = UnigramTable::load(&unigrams).unwrap();
		assert_eq!(table.count("cat"), 11);
		assert_eq!(table.count("emu"), 0);

		fs::write(&unigrams, "cat\t10\ndog\n").unwrap();
		assert!(matches!(UnigramTable::load(&unigrams), Err(NgramError::Parse { line: 2, .. })));
	}
}
