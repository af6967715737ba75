use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{NgramError, Result};

/// Cooperative cancellation for one batch call.
///
/// Clones share the same flag, so a driver can keep one handle and cancel
/// while workers poll theirs. An optional deadline cancels implicitly.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
	deadline: Option<Instant>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	/// A token that expires `timeout` from now.
	pub fn with_timeout(timeout: Duration) -> Self {
		Self {
			cancelled: Arc::new(AtomicBool::new(false)),
			deadline: Some(Instant::now() + timeout),
		}
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		if self.cancelled.load(Ordering::Relaxed) {
			return true;
		}
		matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
	}

	/// Returns `Err(Cancelled)` once the token has been cancelled or expired.
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() {
			return Err(NgramError::Cancelled);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_state() {
		let token = CancellationToken::new();
		let worker = token.clone();
		assert!(worker.check().is_ok());
		token.cancel();
		assert!(matches!(worker.check(), Err(NgramError::Cancelled)));
	}

	#[test]
	fn zero_timeout_is_expired() {
		let token = CancellationToken::with_timeout(Duration::ZERO);
		assert!(token.is_cancelled());
	}
}
