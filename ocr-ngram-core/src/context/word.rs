use serde::{Deserialize, Serialize};

use super::ngram_context::NgramContext;
use crate::error::{NgramError, Result};

/// Number of tokens in a word's context window.
pub const WINDOW_SIZE: usize = 8;

/// Slot of the pivot inside the window (4 tokens before, 3 after).
pub const PIVOT_SLOT: usize = 4;

/// A token under correction together with its surrounding tokens.
///
/// # Invariants
/// - the window always has `WINDOW_SIZE` slots (enforced by the array type)
/// - an empty slot means "no token" (start or end of the text)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Word {
	text: String,
	position: u64,
	window: [String; WINDOW_SIZE],
}

impl Word {
	pub fn new(text: impl Into<String>, position: u64, window: [String; WINDOW_SIZE]) -> Self {
		Self { text: text.into(), position, window }
	}

	/// Builds a word from up to 4 preceding and 3 following tokens.
	///
	/// `before` is in reading order and aligned to the pivot, so the last
	/// element of `before` is the token right before the pivot. Missing
	/// slots are left empty. The pivot slot holds `text`.
	///
	/// # Errors
	/// Returns `InvalidArgument` if more tokens are given than slots exist.
	pub fn from_tokens(text: &str, position: u64, before: &[&str], after: &[&str]) -> Result<Self> {
		if before.len() > PIVOT_SLOT || after.len() > WINDOW_SIZE - PIVOT_SLOT - 1 {
			return Err(NgramError::InvalidArgument(format!(
				"window holds at most {} tokens before and {} after, got {} and {}",
				PIVOT_SLOT,
				WINDOW_SIZE - PIVOT_SLOT - 1,
				before.len(),
				after.len()
			)));
		}
		let mut window: [String; WINDOW_SIZE] = Default::default();
		let start = PIVOT_SLOT - before.len();
		for (slot, token) in window[start..PIVOT_SLOT].iter_mut().zip(before) {
			*slot = (*token).to_owned();
		}
		window[PIVOT_SLOT] = text.to_owned();
		for (slot, token) in window[PIVOT_SLOT + 1..].iter_mut().zip(after) {
			*slot = (*token).to_owned();
		}
		Ok(Self::new(text, position, window))
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn position(&self) -> u64 {
		self.position
	}

	pub fn window(&self) -> &[String; WINDOW_SIZE] {
		&self.window
	}

	/// All `size`-gram contexts of this word.
	///
	/// Produces one context per pivot position `1..size`, skipping those
	/// that run past the window or cover an empty slot. The slice starting
	/// at the pivot is never produced: the first token is the lookup key
	/// and the pivot is what varies.
	///
	/// `word` is the word's index in its batch, carried by each context.
	pub fn contexts(&self, word: usize, size: usize) -> Vec<NgramContext> {
		let mut contexts = Vec::new();
		for index in 1..size {
			let Some(start) = PIVOT_SLOT.checked_sub(index) else {
				continue;
			};
			let end = start + size;
			if end > WINDOW_SIZE {
				continue;
			}
			let slice = &self.window[start..end];
			if slice.iter().any(|token| token.is_empty()) {
				continue;
			}
			contexts.push(NgramContext::from_window(word, slice.to_vec(), index));
		}
		contexts
	}
}
