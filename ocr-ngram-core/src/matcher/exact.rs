use super::{CandidateFrequencyMap, ContextMatcher, KeyTable};
use crate::context::NgramContext;

/// A record matches a context iff every non-pivot position is equal; the
/// candidate is the record's gram at the pivot.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMatcher;

impl ContextMatcher for ExactMatcher {
	fn key_table(&self, contexts: &[&NgramContext]) -> KeyTable {
		let mut table = KeyTable::default();
		for (i, context) in contexts.iter().enumerate() {
			table.insert(context.size(), context.index(), None, context.skip_gram(), i);
		}
		table
	}
}

/// A context is confirmed coherent when the corpus holds it with the
/// pivot's own spelling, i.e. the spelling is among its exact candidates.
pub fn confirms(context: &NgramContext, candidates: &CandidateFrequencyMap) -> bool {
	candidates.contains_key(context.pivot())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cancel::CancellationToken;
	use crate::matcher::match_group;
	use crate::matcher::tests::{context, corpus};

	const CORPUS: &str = "the cat sat\t10\nthe dog sat\t5\nthe rat sat\t1\nthe cat ran\t7\nthe fat cat sat\t2\n";

	#[test]
	fn sums_frequencies_per_candidate() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), CORPUS);
		let c = context(&["the", "cqt", "sat"], 1);
		let maps = match_group(&index, "the", &[&c], &ExactMatcher, &CancellationToken::new()).unwrap();

		let expected: CandidateFrequencyMap =
			[("cat".to_owned(), 10), ("dog".to_owned(), 5), ("rat".to_owned(), 1)].into_iter().collect();
		assert_eq!(maps[0], expected);
	}

	#[test]
	fn repeated_records_accumulate() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), "the cat sat\t10\nthe cat sat\t4\n");
		let c = context(&["the", "cqt", "sat"], 1);
		let maps = match_group(&index, "the", &[&c], &ExactMatcher, &CancellationToken::new()).unwrap();
		assert_eq!(maps[0].get("cat"), Some(&14));
	}

	#[test]
	fn one_scan_serves_every_context_of_the_group() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), CORPUS);
		let a = context(&["the", "cqt", "sat"], 1);
		let b = context(&["the", "cat", "rqn"], 2);
		let c = context(&["the", "fat", "cqt", "sat"], 2);
		let twin = context(&["the", "cqt", "sat"], 1);
		let maps = match_group(&index, "the", &[&a, &b, &c, &twin], &ExactMatcher, &CancellationToken::new()).unwrap();

		assert_eq!(maps[0].len(), 3);
		assert_eq!(maps[1].get("ran"), Some(&7));
		assert_eq!(maps[1].get("sat"), Some(&10));
		assert_eq!(maps[2].get("cat"), Some(&2));
		assert_eq!(maps[2].len(), 1);
		assert_eq!(maps[3], maps[0]);
	}

	#[test]
	fn confirmation_uses_pivot_spelling() {
		let dir = tempfile::tempdir().unwrap();
		let index = corpus(dir.path(), CORPUS);
		let good = context(&["the", "cat", "sat"], 1);
		let bad = context(&["the", "cqt", "sat"], 1);
		let maps = match_group(&index, "the", &[&good, &bad], &ExactMatcher, &CancellationToken::new()).unwrap();
		assert!(confirms(&good, &maps[0]));
		assert!(!confirms(&bad, &maps[1]));
	}
}
