use std::sync::mpsc;
use std::thread;

/// Number of chunks handed to each CPU when the caller has no opinion.
pub(crate) const DEFAULT_CHUNK_FACTOR: usize = 8;

/// Maps `f` over `items` on scoped worker threads and returns the results
/// in input order.
///
/// # Behavior
/// - Splits the input into `num_cpus * chunk_factor` chunks.
/// - Spawns one scoped thread per chunk; `f` may borrow from the caller.
/// - Each thread sends `(chunk_index, results)` back over an MPSC channel.
/// - Results are re-ordered by chunk index before returning.
///
/// # Notes
/// - Small inputs (a single chunk) run on the calling thread.
/// - A panic inside `f` propagates when the scope joins.
pub(crate) fn parallel_map<T, R, F>(items: &[T], chunk_factor: usize, f: F) -> Vec<R>
where
	T: Sync,
	R: Send,
	F: Fn(&T) -> R + Sync,
{
	if items.is_empty() {
		return Vec::new();
	}

	let chunks = num_cpus::get() * chunk_factor.max(1);
	let chunk_size = items.len().div_ceil(chunks);
	if chunk_size >= items.len() {
		return items.iter().map(&f).collect();
	}

	let (tx, rx) = mpsc::channel();
	let f = &f;
	thread::scope(|scope| {
		for (index, chunk) in items.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			scope.spawn(move || {
				let results: Vec<R> = chunk.iter().map(f).collect();
				// The receiver outlives the scope, so sending cannot fail
				let _ = tx.send((index, results));
			});
		}
	});
	drop(tx);

	let mut partials: Vec<(usize, Vec<R>)> = rx.iter().collect();
	partials.sort_by_key(|(index, _)| *index);
	partials.into_iter().flat_map(|(_, results)| results).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn preserves_input_order() {
		let items: Vec<u64> = (0..10_000).collect();
		let squares = parallel_map(&items, 4, |x| x * x);
		assert_eq!(squares.len(), items.len());
		for (i, sq) in squares.iter().enumerate() {
			assert_eq!(*sq, (i as u64) * (i as u64));
		}
	}

	#[test]
	fn empty_and_tiny_inputs() {
		let empty: Vec<u32> = Vec::new();
		assert!(parallel_map(&empty, 8, |x| *x).is_empty());
		assert_eq!(parallel_map(&[7u32], 8, |x| x + 1), vec![8]);
	}

	#[test]
	fn closures_may_borrow() {
		let offset = 100usize;
		let items: Vec<usize> = (0..500).collect();
		let shifted = parallel_map(&items, 2, |x| x + offset);
		assert_eq!(shifted[499], 599);
	}
}
