use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::{NgramError, Result};
use crate::parallel::DEFAULT_CHUNK_FACTOR;

/// Default number of candidates a context-sensitive feature keeps per word.
pub const DEFAULT_TOP_K: usize = 100;

/// Parameters of a batch suggestion run.
///
/// # Responsibilities
/// - Control candidate pruning (`top_k`)
/// - Toggle the detection phase (`detect`)
/// - Decide how a failing token group affects the batch
/// - Size the worker fan-out and bound the batch duration
///
/// # Invariants
/// - `top_k >= 1`
/// - `chunk_factor >= 1`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
	/// Number of candidates each context-sensitive feature keeps per word.
	top_k: usize,

	/// Whether to drop words that no feature flags as erroneous.
	pub detect: bool,

	/// If true, an I/O or parse failure only fails the contexts of the
	/// offending token group; otherwise the whole batch aborts.
	pub isolate_group_failures: bool,

	/// Work chunks handed to each CPU during fan-out.
	chunk_factor: usize,

	/// Optional time budget for one batch call, in milliseconds.
	pub deadline_ms: Option<u64>,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			top_k: DEFAULT_TOP_K,
			detect: false,
			isolate_group_failures: true,
			chunk_factor: DEFAULT_CHUNK_FACTOR,
			deadline_ms: None,
		}
	}
}

impl EngineConfig {
	/// Loads a configuration from JSON. Missing fields take their defaults.
	///
	/// # Errors
	/// Returns an error if the JSON is malformed or violates an invariant.
	pub fn from_json<R: Read>(reader: R) -> Result<Self> {
		let config: Self = serde_json::from_reader(reader)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		if self.top_k == 0 {
			return Err(NgramError::InvalidArgument("top_k must be >= 1".to_owned()));
		}
		if self.chunk_factor == 0 {
			return Err(NgramError::InvalidArgument("chunk_factor must be >= 1".to_owned()));
		}
		Ok(())
	}

	pub fn top_k(&self) -> usize {
		self.top_k
	}

	/// Sets the per-feature candidate limit.
	///
	/// # Errors
	/// Returns an error if `top_k` is 0.
	pub fn set_top_k(&mut self, top_k: usize) -> Result<()> {
		if top_k == 0 {
			return Err(NgramError::InvalidArgument("top_k must be >= 1".to_owned()));
		}
		self.top_k = top_k;
		Ok(())
	}

	pub fn chunk_factor(&self) -> usize {
		self.chunk_factor
	}

	/// Sets the fan-out chunk factor.
	///
	/// # Errors
	/// Returns an error if `chunk_factor` is 0.
	pub fn set_chunk_factor(&mut self, chunk_factor: usize) -> Result<()> {
		if chunk_factor == 0 {
			return Err(NgramError::InvalidArgument("chunk_factor must be >= 1".to_owned()));
		}
		self.chunk_factor = chunk_factor;
		Ok(())
	}

	/// A fresh cancellation token honoring `deadline_ms`.
	pub fn cancellation_token(&self) -> CancellationToken {
		match self.deadline_ms {
			Some(ms) => CancellationToken::with_timeout(Duration::from_millis(ms)),
			None => CancellationToken::new(),
		}
	}
}
