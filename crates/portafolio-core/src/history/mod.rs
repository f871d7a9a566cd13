//! Persisted question/answer history for the search view.
//!
//! Entries are kept newest-last in a JSON file per account next to the
//! session and capped at a fixed size; the oldest entries fall off first.

pub mod manager;

pub use manager::{CachedData, HistoryStore};
