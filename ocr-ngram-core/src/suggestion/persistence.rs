//! Suggestion files.
//!
//! Stream layout (little endian):
//! `[magic: b"NGSG"] [version: u32] [count: u32]` then `count` records of
//! `[len: u32] [postcard-encoded Suggestion]`.
//!
//! `save_each` writes one record per file instead, named after the word
//! position so that a directory listing is already in text order.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::info;

use super::{Suggestion, sort_by_position};
use crate::error::{NgramError, Result};
use crate::io::{list_files, write_atomic};

const MAGIC: &[u8; 4] = b"NGSG";
const VERSION: u32 = 1;
const EXTENSION: &str = "sug";

/// Upper bound on records reserved up front; the header count is untrusted.
const MAX_PREALLOCATED: u32 = 1024;

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
	let mut buf = [0u8; 4];
	reader.read_exact(&mut buf)?;
	Ok(u32::from_le_bytes(buf))
}

fn write_record<W: Write>(writer: &mut W, suggestion: &Suggestion) -> Result<()> {
	let bytes = postcard::to_stdvec(suggestion)?;
	let len = u32::try_from(bytes.len())
		.map_err(|_| NgramError::InvalidArgument(format!("suggestion at {} is too large", suggestion.position())))?;
	writer.write_all(&len.to_le_bytes())?;
	writer.write_all(&bytes)?;
	Ok(())
}

/// Reads one record. The buffer grows with the bytes actually present, so
/// a corrupt length prefix ends in `Io` instead of a huge allocation.
fn read_record<R: Read>(reader: &mut R) -> Result<Suggestion> {
	let len = u64::from(read_u32(reader)?);
	let mut bytes = Vec::new();
	reader.by_ref().take(len).read_to_end(&mut bytes)?;
	if bytes.len() as u64 != len {
		return Err(NgramError::Io(io::Error::new(
			io::ErrorKind::UnexpectedEof,
			format!("suggestion record holds {} of {} bytes", bytes.len(), len),
		)));
	}
	let suggestion: Suggestion = postcard::from_bytes(&bytes)?;
	suggestion.validate()?;
	Ok(suggestion)
}

/// Writes a count-prefixed stream of suggestions.
pub fn write_suggestions<W: Write>(mut writer: W, suggestions: &[Suggestion]) -> Result<()> {
	let count = u32::try_from(suggestions.len())
		.map_err(|_| NgramError::InvalidArgument("too many suggestions for one stream".to_owned()))?;
	writer.write_all(MAGIC)?;
	writer.write_all(&VERSION.to_le_bytes())?;
	writer.write_all(&count.to_le_bytes())?;
	for suggestion in suggestions {
		write_record(&mut writer, suggestion)?;
	}
	writer.flush()?;
	Ok(())
}

/// Reads a stream written by `write_suggestions`.
///
/// # Errors
/// - `Format` on a foreign or newer stream
/// - `Io` if the stream ends before `count` records
/// - `InvalidArgument` if a record breaks the score-vector invariant
pub fn read_suggestions<R: Read>(mut reader: R) -> Result<Vec<Suggestion>> {
	let mut magic = [0u8; 4];
	reader.read_exact(&mut magic)?;
	if &magic != MAGIC {
		return Err(NgramError::Format("not a suggestion stream (bad magic)".to_owned()));
	}
	let version = read_u32(&mut reader)?;
	if version != VERSION {
		return Err(NgramError::Format(format!("unsupported suggestion stream version {}", version)));
	}
	let count = read_u32(&mut reader)?;
	let mut suggestions = Vec::with_capacity(count.min(MAX_PREALLOCATED) as usize);
	for _ in 0..count {
		suggestions.push(read_record(&mut reader)?);
	}
	Ok(suggestions)
}

/// Atomically writes all suggestions to one file.
pub fn save_suggestions<P: AsRef<Path>>(path: P, suggestions: &[Suggestion]) -> Result<()> {
	let mut bytes = Vec::new();
	write_suggestions(&mut bytes, suggestions)?;
	write_atomic(&path, &bytes)?;
	info!("Saved {} suggestions to {:?}", suggestions.len(), path.as_ref());
	Ok(())
}

pub fn load_suggestions<P: AsRef<Path>>(path: P) -> Result<Vec<Suggestion>> {
	read_suggestions(BufReader::new(File::open(path)?))
}

/// Atomically writes one file per suggestion into `dir` and returns their
/// paths.
pub fn save_each<P: AsRef<Path>>(dir: P, suggestions: &[Suggestion]) -> Result<Vec<PathBuf>> {
	let dir = dir.as_ref();
	fs::create_dir_all(dir)?;
	let mut paths = Vec::with_capacity(suggestions.len());
	for suggestion in suggestions {
		let path = dir.join(format!("{:020}.{}", suggestion.position(), EXTENSION));
		let mut bytes = Vec::new();
		write_record(&mut bytes, suggestion)?;
		write_atomic(&path, &bytes)?;
		paths.push(path);
	}
	Ok(paths)
}

/// Loads every suggestion file of `dir`, ordered by position.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Suggestion>> {
	let mut suggestions = Vec::new();
	for path in list_files(dir, EXTENSION)? {
		let mut reader = BufReader::new(File::open(&path)?);
		suggestions.push(read_record(&mut reader)?);
	}
	sort_by_position(&mut suggestions);
	Ok(suggestions)
}
