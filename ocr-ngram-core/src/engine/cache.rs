use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Memoized word-isolated search results, keyed by feature slot and spelling.
///
/// # Behavior
/// - Lookups take the read lock; a miss computes outside any lock.
/// - Two workers missing the same key both compute; the first insert wins
///   and every caller gets that stored value.
#[derive(Debug, Default)]
pub(crate) struct SpellingCache {
	entries: RwLock<HashMap<(usize, String), Arc<Vec<String>>>>,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl SpellingCache {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn get_or_compute<F>(&self, slot: usize, spelling: &str, compute: F) -> Arc<Vec<String>>
	where
		F: FnOnce() -> Vec<String>,
	{
		let key = (slot, spelling.to_owned());
		{
			let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(found) = entries.get(&key) {
				self.hits.fetch_add(1, Ordering::Relaxed);
				return Arc::clone(found);
			}
		}
		self.misses.fetch_add(1, Ordering::Relaxed);
		let computed = Arc::new(compute());

		let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
		Arc::clone(entries.entry(key).or_insert(computed))
	}

	/// `(hits, misses)` so far.
	pub(crate) fn stats(&self) -> (u64, u64) {
		(self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn computes_once_per_slot_and_spelling() {
		let cache = SpellingCache::new();
		let first = cache.get_or_compute(0, "cqt", || vec!["cat".to_owned()]);
		let second = cache.get_or_compute(0, "cqt", || panic!("should be cached"));
		assert!(Arc::ptr_eq(&first, &second));

		let other_slot = cache.get_or_compute(1, "cqt", Vec::new);
		assert!(other_slot.is_empty());
		assert_eq!(cache.stats(), (1, 2));
	}

	#[test]
	fn first_writer_wins() {
		let cache = SpellingCache::new();
		let inserted = cache.get_or_compute(0, "x", || vec!["a".to_owned()]);
		// A racing computation that lost still observes the stored value
		let mut entries = cache.entries.write().unwrap();
		let stored = Arc::clone(entries.entry((0, "x".to_owned())).or_insert(Arc::new(vec!["b".to_owned()])));
		drop(entries);
		assert_eq!(stored, inserted);
	}
}
