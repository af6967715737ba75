//! N-gram corpus access.
//!
//! - `NgramCorpusIndex`: first token → byte range over sorted corpus files
//! - `BoundedLineReader`: line reader scoped to one byte range
//! - `NgramRecord`: parsed `<grams>\t<frequency>` line

/// Index construction, lookup and bounded reads.
pub mod index;

/// Versioned binary encoding of the index.
mod persist;

/// Length-capped buffered line reader.
pub mod reader;

/// Corpus line parsing.
pub mod record;

pub use index::{BuildStats, CorpusSubset, DuplicateRunPolicy, IndexBuilder, NgramCorpusIndex};
pub use reader::BoundedLineReader;
pub use record::NgramRecord;
