use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Reads a text file and returns its meaningful lines.
///
/// - Empty lines and lines starting with `#` are skipped
/// - Trailing `\r` is removed
pub(crate) fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let reader = BufReader::new(File::open(filename)?);
	let mut lines = Vec::new();
	for line in reader.lines() {
		let line = line?;
		let line = line.trim_end_matches('\r');
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		lines.push(line.to_owned());
	}
	Ok(lines)
}

/// Lists all files with a given extension in a directory.
///
/// Returns full paths sorted by file name, which is the order corpus
/// partitions are expected to be indexed in.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			files.push(path);
		}
	}
	files.sort();

	Ok(files)
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so readers never observe a half-written file.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let parent = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent)?;

	let mut temp_file = NamedTempFile::new_in(parent)?;
	temp_file.write_all(bytes)?;
	temp_file.flush()?;
	temp_file.persist(path).map_err(|e| e.error)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn list_files_filters_and_sorts() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["b.txt", "a.txt", "c.gz", "d.txt"] {
			fs::write(dir.path().join(name), "x\t1\n").unwrap();
		}
		let files = list_files(dir.path(), "txt").unwrap();
		let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
		assert_eq!(names, vec!["a.txt", "b.txt", "d.txt"]);
	}

	#[test]
	fn read_lines_skips_comments_and_blanks() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("words.txt");
		fs::write(&path, "# header\ncat\r\n\ndog\n").unwrap();
		assert_eq!(read_lines(&path).unwrap(), vec!["cat", "dog"]);
	}

	#[test]
	fn atomic_write_replaces_content() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("blob.bin");
		write_atomic(&path, b"one").unwrap();
		write_atomic(&path, b"two").unwrap();
		assert_eq!(fs::read(&path).unwrap(), b"two");
	}
}
