//! Utility functions for string formatting and validation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, format_expiry, is_plausible_email, truncate};
