use std::path::PathBuf;

use thiserror::Error;

use crate::feature::FeatureType;

#[derive(Error, Debug)]
pub enum NgramError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error in {path:?} at line {line}: {reason}")]
	Parse {
		path: PathBuf,
		line: u64,
		reason: String,
	},

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	#[error("Feature registered twice: {0}")]
	DuplicateFeature(FeatureType),

	#[error("Token '{token}' has a second run of lines in {path:?}")]
	SplitRun { token: String, path: PathBuf },

	#[error("Run for token '{token}' spans {length} bytes, more than a corpus subset can address")]
	RunTooLong { token: String, length: u64 },

	#[error("Format error: {0}")]
	Format(String),

	#[error("Encoding error: {0}")]
	Encoding(#[from] postcard::Error),

	#[error("Config error: {0}")]
	Config(#[from] serde_json::Error),

	#[error("Batch cancelled")]
	Cancelled,
}

pub type Result<T> = std::result::Result<T, NgramError>;

impl NgramError {
	pub(crate) fn parse<P: Into<PathBuf>>(path: P, line: u64, reason: impl Into<String>) -> Self {
		NgramError::Parse {
			path: path.into(),
			line,
			reason: reason.into(),
		}
	}
}
