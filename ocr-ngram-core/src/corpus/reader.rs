use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

use super::index::CorpusSubset;

/// Buffered line reader over one corpus subset.
///
/// Reads never go past `subset.length` bytes from the subset start, so a
/// caller only ever sees the lines of a single first-token run. The file
/// handle is closed when the reader is dropped.
#[derive(Debug)]
pub struct BoundedLineReader {
	path: PathBuf,
	inner: BufReader<Take<File>>,
	lines_read: u64,
}

impl BoundedLineReader {
	/// Opens `path`, seeks to `local_offset` and caps reads at `subset.length`.
	pub(crate) fn open(path: &Path, local_offset: u64, subset: CorpusSubset) -> io::Result<Self> {
		let mut file = File::open(path)?;
		file.seek(SeekFrom::Start(local_offset))?;
		Ok(Self {
			path: path.to_path_buf(),
			inner: BufReader::new(file.take(u64::from(subset.length))),
			lines_read: 0,
		})
	}

	/// File this reader is scoped to.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Number of lines returned so far (1-based number of the last line).
	pub fn lines_read(&self) -> u64 {
		self.lines_read
	}

	/// Reads the next line into `buf`, replacing its content.
	///
	/// Returns `Ok(false)` once the subset is exhausted.
	pub fn read_line(&mut self, buf: &mut String) -> io::Result<bool> {
		buf.clear();
		if self.inner.read_line(buf)? == 0 {
			return Ok(false);
		}
		self.lines_read += 1;
		Ok(true)
	}
}

impl Iterator for BoundedLineReader {
	type Item = io::Result<String>;

	fn next(&mut self) -> Option<Self::Item> {
		let mut line = String::new();
		match self.read_line(&mut line) {
			Ok(true) => Some(Ok(line)),
			Ok(false) => None,
			Err(e) => Some(Err(e)),
		}
	}
}
