use super::{ContextMatcher, KeyTable};
use crate::context::NgramContext;

/// Exact matching relaxed by exactly one extra mismatch.
///
/// For a context of size `n` the pivot is blanked and, in turn, each of the
/// `n - 2` positions that are neither the first token nor the pivot is
/// freed. Every relaxed key accumulates into the same per-context map, so
/// the result is the additive union of the per-relaxation maps: a record
/// that satisfies several relaxations (an exact match satisfies all of
/// them) contributes its frequency once per relaxation.
///
/// Bigrams have nothing to relax (their only other position is the first
/// token); they fall back to the exact key so that the approximate
/// candidates always include the exact ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApproximateMatcher;

impl ContextMatcher for ApproximateMatcher {
	fn key_table(&self, contexts: &[&NgramContext]) -> KeyTable {
		let mut table = KeyTable::default();
		for (i, context) in contexts.iter().enumerate() {
			let mut relaxed = false;
			for free in context.relaxable_positions() {
				table.insert(context.size(), context.index(), Some(free), context.relaxed_skip_gram(free), i);
				relaxed = true;
			}
			if !relaxed {
				table.insert(context.size(), context.index(), None, context.skip_gram(), i);
			}
		}
		table
	}
}
