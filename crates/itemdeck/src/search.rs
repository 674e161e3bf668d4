//! Substring search over item identifiers.
//!
//! This module provides:
//! - `SubstringKey`: compact encoding of a run of decimal digits
//! - `SearchIndex`: exhaustive substring -> ids index built once at startup
//! - `SearchTerm`: resolution of raw user search input
//! - Build state and progress tracking for the one-time index build

mod build;
mod index;
mod key;
mod term;

// Re-export main types
pub use build::{unix_now_secs, IndexBuildProgress, IndexBuildState, ProgressSnapshot};
pub use index::{IndexStats, SearchIndex, SortedIds};
pub use key::{SubstringKey, MAX_DIGITS};
pub use term::SearchTerm;
