use crate::error::{NgramError, Result};

/// Largest n-gram size a context may have.
pub const MAX_NGRAM_SIZE: usize = 5;

/// Placeholder for the pivot in a skip-gram key.
pub const PIVOT_MARK: &str = "_";

/// Placeholder for the one extra position an approximate match may change.
pub const ANY_MARK: &str = "?";

/// A contiguous slice of a word's window, with the pivot inside it.
///
/// # Invariants
/// - `1 <= index <= tokens.len() - 1`
/// - `tokens.len() <= MAX_NGRAM_SIZE` when built through `new`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NgramContext {
	word: usize,
	tokens: Vec<String>,
	index: usize,
}

impl NgramContext {
	/// Creates a context for batch word `word`.
	///
	/// # Errors
	/// Returns `InvalidArgument` if the size or pivot index is out of range.
	pub fn new(word: usize, tokens: Vec<String>, index: usize) -> Result<Self> {
		let size = tokens.len();
		if !(2..=MAX_NGRAM_SIZE).contains(&size) {
			return Err(NgramError::InvalidArgument(format!(
				"context size must be between 2 and {}, got {}",
				MAX_NGRAM_SIZE, size
			)));
		}
		if index == 0 || index >= size {
			return Err(NgramError::InvalidArgument(format!(
				"pivot index must be between 1 and {}, got {}",
				size - 1,
				index
			)));
		}
		Ok(Self { word, tokens, index })
	}

	/// Windows are already validated by `Word::contexts`.
	pub(crate) fn from_window(word: usize, tokens: Vec<String>, index: usize) -> Self {
		debug_assert!(index >= 1 && index < tokens.len());
		Self { word, tokens, index }
	}

	/// Index of the owning word in its batch.
	pub fn word(&self) -> usize {
		self.word
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	/// Position of the pivot inside the slice.
	pub fn index(&self) -> usize {
		self.index
	}

	pub fn size(&self) -> usize {
		self.tokens.len()
	}

	pub fn first_token(&self) -> &str {
		&self.tokens[0]
	}

	pub fn pivot(&self) -> &str {
		&self.tokens[self.index]
	}

	/// Key with the pivot blanked: `"the _ sat"`.
	pub fn skip_gram(&self) -> String {
		let mut key = String::new();
		write_skip_gram(&mut key, &self.tokens, self.index, None);
		key
	}

	/// Key with the pivot blanked and `free` replaced by `ANY_MARK`.
	pub fn relaxed_skip_gram(&self, free: usize) -> String {
		let mut key = String::new();
		write_skip_gram(&mut key, &self.tokens, self.index, Some(free));
		key
	}

	/// Positions an approximate match may relax: neither the first token
	/// (fixed by the corpus lookup) nor the pivot.
	pub fn relaxable_positions(&self) -> impl Iterator<Item = usize> + '_ {
		(1..self.tokens.len()).filter(move |i| *i != self.index)
	}
}

/// Writes the skip-gram key of `grams` into `key`, replacing its content.
///
/// Shared by contexts and corpus records so both sides build identical
/// keys without intermediate allocations.
pub(crate) fn write_skip_gram<S: AsRef<str>>(key: &mut String, grams: &[S], pivot: usize, free: Option<usize>) {
	key.clear();
	for (i, gram) in grams.iter().enumerate() {
		if i > 0 {
			key.push(' ');
		}
		if i == pivot {
			key.push_str(PIVOT_MARK);
		} else if Some(i) == free {
			key.push_str(ANY_MARK);
		} else {
			key.push_str(gram.as_ref());
		}
	}
}
