//! N-gram corpus index and context-sensitive OCR correction library.
//!
//! This crate provides:
//! - A first-token index over sorted n-gram corpus files, with bounded reads
//!   and a versioned on-disk format
//! - Exact and approximate skip-gram matching of a word's contexts
//! - A batch engine combining word-isolated and context-sensitive features
//!   into scored, normalized suggestions
//! - Suggestion persistence and recall / feature-matrix evaluation helpers
//!
//! Corpus lines are `<gram1 ... gramN>\t<frequency>`, sorted so that all
//! lines of a first token are contiguous.

/// Cooperative cancellation and deadlines for batch calls.
pub mod cancel;

/// Engine configuration.
pub mod config;

/// Words, context windows and skip-gram keys.
pub mod context;

/// Corpus index, bounded readers and record parsing.
pub mod corpus;

/// Batch suggestion engine.
pub mod engine;

/// Crate error type.
pub mod error;

/// Recall and feature-matrix evaluation.
pub mod eval;

/// Scoring features and their registry.
pub mod feature;

/// File and path helpers.
pub mod io;

/// Corpus scanning against context groups.
pub mod matcher;

/// Scoped-thread fan-out.
///
/// Not exposed
pub(crate) mod parallel;

/// Lexicon and unigram resources.
pub mod resource;

/// Suggestion model and persistence.
pub mod suggestion;

pub use cancel::CancellationToken;
pub use config::EngineConfig;
pub use context::{NgramContext, Word};
pub use corpus::{IndexBuilder, NgramCorpusIndex};
pub use engine::{BatchOutcome, BatchSuggestionEngine, GroupFailure};
pub use error::{NgramError, Result};
pub use feature::{Feature, FeatureKind, FeatureRegistry, FeatureType, Normalization};
pub use matcher::MatchMode;
pub use suggestion::{Candidate, Suggestion};
