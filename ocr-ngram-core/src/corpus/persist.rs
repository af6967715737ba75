//! Binary persistence for `NgramCorpusIndex`.
//!
//! Layout (little endian):
//! `[magic: b"NGIX"] [version: u32] [body_len: u64] [body: postcard]`
//!
//! The body is an `IndexBlob`, a wire-only struct decoupled from the
//! in-memory representation. Entries are sorted by token so the same index
//! always encodes to the same bytes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::index::{CorpusSubset, NgramCorpusIndex};
use crate::error::{NgramError, Result};
use crate::io::write_atomic;

const MAGIC: &[u8; 4] = b"NGIX";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8;

#[derive(Serialize, Deserialize)]
struct IndexBlob {
	paths: Vec<String>,
	boundaries: Vec<u64>,
	entries: Vec<(String, u64, u32)>,
}

impl NgramCorpusIndex {
	/// Encodes the index into its versioned binary form.
	///
	/// # Errors
	/// Returns `InvalidArgument` if a corpus path is not valid UTF-8.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		let paths = self
			.files
			.iter()
			.map(|p| {
				p.to_str()
					.map(str::to_owned)
					.ok_or_else(|| NgramError::InvalidArgument(format!("corpus path {:?} is not UTF-8", p)))
			})
			.collect::<Result<Vec<String>>>()?;

		let mut entries: Vec<(String, u64, u32)> = self
			.subsets
			.iter()
			.map(|(token, subset)| (token.clone(), subset.offset, subset.length))
			.collect();
		entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

		let blob = IndexBlob { paths, boundaries: self.boundaries.clone(), entries };
		let body = postcard::to_stdvec(&blob)?;

		let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
		bytes.extend_from_slice(MAGIC);
		bytes.extend_from_slice(&VERSION.to_le_bytes());
		bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
		bytes.extend_from_slice(&body);
		Ok(bytes)
	}

	/// Decodes an index and checks its structural invariants.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < HEADER_LEN {
			return Err(NgramError::Format("truncated index header".to_owned()));
		}
		if &bytes[0..4] != MAGIC {
			return Err(NgramError::Format("not an n-gram index (bad magic)".to_owned()));
		}
		let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
		if version != VERSION {
			return Err(NgramError::Format(format!("unsupported index version {}", version)));
		}
		let mut len_bytes = [0u8; 8];
		len_bytes.copy_from_slice(&bytes[8..16]);
		let body_len = u64::from_le_bytes(len_bytes);
		let body = &bytes[HEADER_LEN..];
		if body.len() as u64 != body_len {
			return Err(NgramError::Format(format!(
				"index body is {} bytes, header says {}",
				body.len(),
				body_len
			)));
		}

		let blob: IndexBlob = postcard::from_bytes(body)?;
		if blob.boundaries.len() != blob.paths.len() + 1
			|| blob.boundaries.first() != Some(&0)
			|| blob.boundaries.windows(2).any(|w| w[0] > w[1])
		{
			return Err(NgramError::Format("file boundaries are not a monotonic prefix sum".to_owned()));
		}

		let total = blob.boundaries.last().copied().unwrap_or(0);
		let mut subsets = HashMap::with_capacity(blob.entries.len());
		for (token, offset, length) in blob.entries {
			match offset.checked_add(u64::from(length)) {
				Some(end) if end <= total => {}
				_ => {
					return Err(NgramError::Format(format!(
						"entry {:?} at {}+{} lies past the corpus end {}",
						token, offset, length, total
					)));
				}
			}
			subsets.insert(token, CorpusSubset { offset, length });
		}

		Ok(Self {
			files: blob.paths.into_iter().map(PathBuf::from).collect(),
			boundaries: blob.boundaries,
			subsets,
		})
	}

	/// Atomically writes the index to `path`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		write_atomic(path, &self.to_bytes()?)?;
		Ok(())
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = fs::read(path)?;
		Self::from_bytes(&bytes)
	}

	/// Loads an index and points it at relocated corpus files.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `paths` does not hold exactly one path
	/// per indexed file.
	pub fn load_rebound<P: AsRef<Path>, Q: Into<PathBuf>>(path: P, paths: Vec<Q>) -> Result<Self> {
		let mut index = Self::load(path)?;
		index.rebind(paths)?;
		Ok(index)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_index(dir: &Path) -> NgramCorpusIndex {
		let a = dir.join("a.txt");
		let b = dir.join("b.txt");
		fs::write(&a, "of the\t9\nof them\t2\nthe cat\t10\n").unwrap();
		fs::write(&b, "zebra crossing\t4\n").unwrap();
		NgramCorpusIndex::build(&[a, b]).unwrap()
	}

	#[test]
	fn round_trip_preserves_every_subset() {
		let dir = tempfile::tempdir().unwrap();
		let index = sample_index(dir.path());
		let path = dir.path().join("corpus.idx");
		index.save(&path).unwrap();

		let loaded = NgramCorpusIndex::load(&path).unwrap();
		for (token, subset) in index.entries() {
			assert_eq!(loaded.query(token), Some(subset));
		}
		assert_eq!(loaded, index);
	}

	#[test]
	fn encoding_is_deterministic() {
		let dir = tempfile::tempdir().unwrap();
		let index = sample_index(dir.path());
		assert_eq!(index.to_bytes().unwrap(), index.clone().to_bytes().unwrap());
	}

	#[test]
	fn rejects_foreign_and_corrupt_blobs() {
		let dir = tempfile::tempdir().unwrap();
		let mut bytes = sample_index(dir.path()).to_bytes().unwrap();

		assert!(matches!(NgramCorpusIndex::from_bytes(b"NGI"), Err(NgramError::Format(_))));

		let mut wrong_magic = bytes.clone();
		wrong_magic[0] = b'X';
		assert!(matches!(NgramCorpusIndex::from_bytes(&wrong_magic), Err(NgramError::Format(_))));

		let mut wrong_version = bytes.clone();
		wrong_version[4] = 99;
		assert!(matches!(NgramCorpusIndex::from_bytes(&wrong_version), Err(NgramError::Format(_))));

		bytes.pop();
		assert!(matches!(NgramCorpusIndex::from_bytes(&bytes), Err(NgramError::Format(_))));
	}

	fn framed(blob: &IndexBlob) -> Vec<u8> {
		let body = postcard::to_stdvec(blob).unwrap();
		let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
		bytes.extend_from_slice(MAGIC);
		bytes.extend_from_slice(&VERSION.to_le_bytes());
		bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
		bytes.extend_from_slice(&body);
		bytes
	}

	#[test]
	fn rejects_entries_outside_the_corpus() {
		let blob = |entries: Vec<(String, u64, u32)>| IndexBlob {
			paths: vec!["a.txt".to_owned()],
			boundaries: vec![0, 100],
			entries,
		};

		let inside = framed(&blob(vec![("the".to_owned(), 90, 10)]));
		assert_eq!(NgramCorpusIndex::from_bytes(&inside).unwrap().query("the"), Some(CorpusSubset { offset: 90, length: 10 }));

		let past_end = framed(&blob(vec![("the".to_owned(), 95, 10)]));
		assert!(matches!(NgramCorpusIndex::from_bytes(&past_end), Err(NgramError::Format(_))));

		let overflow = framed(&blob(vec![("the".to_owned(), u64::MAX, 1)]));
		assert!(matches!(NgramCorpusIndex::from_bytes(&overflow), Err(NgramError::Format(_))));
	}

	#[test]
	fn load_rebound_checks_cardinality() {
		let dir = tempfile::tempdir().unwrap();
		let index = sample_index(dir.path());
		let path = dir.path().join("corpus.idx");
		index.save(&path).unwrap();

		let result = NgramCorpusIndex::load_rebound(&path, vec![dir.path().join("only-one.txt")]);
		assert!(matches!(result, Err(NgramError::InvalidArgument(_))));

		let rebound = NgramCorpusIndex::load_rebound(&path, index.files().to_vec()).unwrap();
		assert_eq!(rebound.query("the"), index.query("the"));
	}
}
