/// One parsed corpus line: `<gram1 gram2 ... gramN><TAB><frequency>`.
///
/// Grams borrow from the line buffer; nothing is allocated per record
/// beyond the gram slice vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgramRecord<'a> {
	pub grams: Vec<&'a str>,
	pub frequency: u64,
}

impl<'a> NgramRecord<'a> {
	/// Parses a corpus line.
	///
	/// Returns a human-readable reason on failure; callers attach the
	/// file and line to build a `NgramError::Parse`.
	pub fn parse(line: &'a str) -> Result<Self, String> {
		let line = line.trim_end_matches(['\n', '\r']);
		let (ngram, frequency) = line
			.rsplit_once('\t')
			.ok_or_else(|| format!("missing tab-separated frequency in '{}'", line))?;
		let frequency = frequency
			.trim()
			.parse::<u64>()
			.map_err(|e| format!("invalid frequency '{}': {}", frequency, e))?;
		let grams: Vec<&str> = ngram.split_whitespace().collect();
		if grams.is_empty() {
			return Err(format!("empty n-gram in '{}'", line));
		}
		Ok(Self { grams, frequency })
	}

	pub fn len(&self) -> usize {
		self.grams.len()
	}

	pub fn is_empty(&self) -> bool {
		self.grams.is_empty()
	}
}

/// Returns the first whitespace-delimited field of a raw corpus line.
///
/// `None` if the line has no delimiter or starts with one.
pub(crate) fn first_field(line: &[u8]) -> Option<&[u8]> {
	let end = line.iter().position(|b| *b == b' ' || *b == b'\t')?;
	if end == 0 {
		return None;
	}
	Some(&line[..end])
}
