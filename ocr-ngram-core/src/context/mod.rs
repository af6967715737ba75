//! Words, their context windows, and skip-gram keys.

/// N-gram slices around a pivot and skip-gram key construction.
pub mod ngram_context;

/// Pivot token with its fixed 8-slot window.
pub mod word;

pub use ngram_context::{ANY_MARK, MAX_NGRAM_SIZE, NgramContext, PIVOT_MARK};
pub use word::{PIVOT_SLOT, WINDOW_SIZE, Word};
