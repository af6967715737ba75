use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::reader::BoundedLineReader;
use super::record::first_field;
use crate::error::{NgramError, Result};
use crate::io::list_files;
use crate::parallel::{DEFAULT_CHUNK_FACTOR, parallel_map};

/// A byte range in the logical concatenation of all corpus files.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CorpusSubset {
	pub offset: u64,
	pub length: u32,
}

/// What to do when a first token's run of lines shows up a second time,
/// usually because a run was split across two corpus files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateRunPolicy {
	/// Keep the most recent run; earlier records for the token become
	/// unreachable. Each overwrite is logged and counted.
	#[default]
	LastWriteWins,
	/// Fail the build with `NgramError::SplitRun`.
	Reject,
}

/// Counters collected while building an index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
	pub files: usize,
	pub lines: u64,
	pub tokens: usize,
	/// Tokens whose earlier run was replaced under `LastWriteWins`.
	pub overwritten: Vec<String>,
}

/// Sparse first-token index over an ordered list of sorted corpus files.
///
/// # Invariants
/// - `boundaries.len() == files.len() + 1`, `boundaries[0] == 0`
/// - `boundaries` is non-decreasing; `boundaries[i+1] - boundaries[i]` is
///   the byte length of `files[i]`
/// - every subset lies entirely inside one file
#[derive(Clone, Debug, PartialEq)]
pub struct NgramCorpusIndex {
	pub(crate) files: Vec<PathBuf>,
	pub(crate) boundaries: Vec<u64>,
	pub(crate) subsets: HashMap<String, CorpusSubset>,
}

/// Options for building a `NgramCorpusIndex`.
#[derive(Clone, Debug)]
pub struct IndexBuilder {
	policy: DuplicateRunPolicy,
	chunk_factor: usize,
}

impl Default for IndexBuilder {
	fn default() -> Self {
		Self {
			policy: DuplicateRunPolicy::default(),
			chunk_factor: DEFAULT_CHUNK_FACTOR,
		}
	}
}

/// A run of consecutive lines sharing one first token, in file-local offsets.
struct Run {
	token: String,
	start: u64,
	length: u64,
}

struct FileScan {
	length: u64,
	lines: u64,
	runs: Vec<Run>,
}

impl IndexBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn policy(mut self, policy: DuplicateRunPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn chunk_factor(mut self, chunk_factor: usize) -> Self {
		self.chunk_factor = chunk_factor.max(1);
		self
	}

	/// Builds an index over `files`, in the given order.
	pub fn build<P: AsRef<Path>>(&self, files: &[P]) -> Result<NgramCorpusIndex> {
		self.build_with_stats(files).map(|(index, _)| index)
	}

	/// Builds an index over every `*.extension` file of `dir`, sorted by name.
	pub fn build_dir<P: AsRef<Path>>(&self, dir: P, extension: &str) -> Result<NgramCorpusIndex> {
		let files = list_files(dir, extension)?;
		self.build(&files)
	}

	/// Builds an index and reports build counters.
	///
	/// # Behavior
	/// - Canonicalizes every path.
	/// - Scans files in parallel; each scan is a strict left-to-right pass
	///   recording first-token runs with file-local offsets.
	/// - Walks the scans in file order, turning local offsets into global
	///   ones (prefix sum over file lengths) and inserting runs, so the
	///   result is identical to a sequential build.
	///
	/// # Errors
	/// - `Io` if a file cannot be read
	/// - `Parse` if a line has no whitespace delimiter
	/// - `RunTooLong` if a run does not fit a `u32` length
	/// - `SplitRun` under `DuplicateRunPolicy::Reject`
	pub fn build_with_stats<P: AsRef<Path>>(&self, files: &[P]) -> Result<(NgramCorpusIndex, BuildStats)> {
		let paths = files
			.iter()
			.map(|p| fs::canonicalize(p.as_ref()))
			.collect::<std::io::Result<Vec<PathBuf>>>()?;
		info!("Indexing {} corpus files", paths.len());

		let scans = parallel_map(&paths, self.chunk_factor, |path| scan_file(path));

		let mut boundaries = Vec::with_capacity(paths.len() + 1);
		boundaries.push(0u64);
		let mut subsets: HashMap<String, CorpusSubset> = HashMap::new();
		let mut stats = BuildStats { files: paths.len(), ..BuildStats::default() };
		let mut base = 0u64;

		for (path, scan) in paths.iter().zip(scans) {
			let scan = scan?;
			let run_count = scan.runs.len();
			for run in scan.runs {
				let length = u32::try_from(run.length).map_err(|_| NgramError::RunTooLong {
					token: run.token.clone(),
					length: run.length,
				})?;
				let subset = CorpusSubset { offset: base + run.start, length };
				match subsets.entry(run.token) {
					Entry::Vacant(entry) => {
						entry.insert(subset);
					}
					Entry::Occupied(mut entry) => match self.policy {
						DuplicateRunPolicy::Reject => {
							return Err(NgramError::SplitRun {
								token: entry.key().clone(),
								path: path.clone(),
							});
						}
						DuplicateRunPolicy::LastWriteWins => {
							warn!("Token '{}' seen again in {:?}; keeping the later run", entry.key(), path);
							stats.overwritten.push(entry.key().clone());
							entry.insert(subset);
						}
					},
				}
			}
			debug!("Indexed {:?}: {} bytes, {} lines, {} runs", path, scan.length, scan.lines, run_count);
			stats.lines += scan.lines;
			base += scan.length;
			boundaries.push(base);
		}

		stats.tokens = subsets.len();
		info!("Index built: {} tokens over {} lines ({} bytes)", stats.tokens, stats.lines, base);

		Ok((NgramCorpusIndex { files: paths, boundaries, subsets }, stats))
	}
}

/// Scans one file, recording every run of lines sharing a first token.
fn scan_file(path: &Path) -> Result<FileScan> {
	let mut reader = BufReader::new(File::open(path)?);
	let mut buf: Vec<u8> = Vec::new();
	let mut offset = 0u64;
	let mut lines = 0u64;
	let mut current: Option<(String, u64)> = None;
	let mut runs = Vec::new();

	loop {
		buf.clear();
		let read = reader.read_until(b'\n', &mut buf)?;
		if read == 0 {
			break;
		}
		lines += 1;

		let token = first_field(&buf).ok_or_else(|| NgramError::parse(path, lines, "line has no whitespace delimiter"))?;
		let token = std::str::from_utf8(token)
			.map_err(|e| NgramError::parse(path, lines, format!("first field is not UTF-8: {}", e)))?;

		let same_run = matches!(&current, Some((t, _)) if t == token);
		if !same_run {
			if let Some((previous, start)) = current.take() {
				runs.push(Run { token: previous, start, length: offset - start });
			}
			current = Some((token.to_owned(), offset));
		}
		offset += read as u64;
	}

	if let Some((token, start)) = current {
		runs.push(Run { token, start, length: offset - start });
	}

	Ok(FileScan { length: offset, lines, runs })
}

impl NgramCorpusIndex {
	/// Builds an index with default options.
	pub fn build<P: AsRef<Path>>(files: &[P]) -> Result<Self> {
		IndexBuilder::new().build(files)
	}

	/// O(1) lookup of a first token's byte range. Absence is not an error.
	pub fn query(&self, token: &str) -> Option<CorpusSubset> {
		self.subsets.get(token).copied()
	}

	pub fn contains(&self, token: &str) -> bool {
		self.subsets.contains_key(token)
	}

	/// Number of indexed first tokens.
	pub fn len(&self) -> usize {
		self.subsets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subsets.is_empty()
	}

	pub fn files(&self) -> &[PathBuf] {
		&self.files
	}

	pub fn boundaries(&self) -> &[u64] {
		&self.boundaries
	}

	/// Iterates over all `(token, subset)` entries, in no particular order.
	pub fn entries(&self) -> impl Iterator<Item = (&str, CorpusSubset)> {
		self.subsets.iter().map(|(k, v)| (k.as_str(), *v))
	}

	/// Index of the file holding global byte `offset`, by binary search over
	/// the boundaries.
	fn locate(&self, offset: u64) -> Option<usize> {
		let upper = self.boundaries.partition_point(|b| *b <= offset);
		if upper == 0 || upper > self.files.len() {
			return None;
		}
		Some(upper - 1)
	}

	/// Opens a reader over exactly the bytes of `subset`.
	///
	/// # Errors
	/// - `InvalidArgument` if the subset does not lie inside one corpus file
	/// - `Io` if the file cannot be opened or seeked
	pub fn open_bounded_reader(&self, subset: CorpusSubset) -> Result<BoundedLineReader> {
		let file = self.locate(subset.offset).ok_or_else(|| {
			NgramError::InvalidArgument(format!("offset {} is outside the corpus", subset.offset))
		})?;
		let end = subset.offset.checked_add(u64::from(subset.length)).ok_or_else(|| {
			NgramError::InvalidArgument(format!("subset {}+{} overflows", subset.offset, subset.length))
		})?;
		if end > self.boundaries[file + 1] {
			return Err(NgramError::InvalidArgument(format!(
				"subset {}+{} crosses the end of {:?}",
				subset.offset, subset.length, self.files[file]
			)));
		}
		let local = subset.offset - self.boundaries[file];
		Ok(BoundedLineReader::open(&self.files[file], local, subset)?)
	}

	/// Opens a reader over the run of `token`, or `None` if it is not indexed.
	pub fn open_token(&self, token: &str) -> Result<Option<BoundedLineReader>> {
		match self.query(token) {
			Some(subset) => self.open_bounded_reader(subset).map(Some),
			None => Ok(None),
		}
	}

	/// Points the index at relocated corpus files.
	///
	/// # Errors
	/// Returns `InvalidArgument` unless exactly one path per indexed file is given.
	pub fn rebind<P: Into<PathBuf>>(&mut self, paths: Vec<P>) -> Result<()> {
		if paths.len() != self.files.len() {
			return Err(NgramError::InvalidArgument(format!(
				"expected {} corpus paths, got {}",
				self.files.len(),
				paths.len()
			)));
		}
		self.files = paths.into_iter().map(Into::into).collect();
		Ok(())
	}
}
