//! REST API client module for the portfolio backend.
//!
//! This module provides the `ApiClient` for signing in, managing teacher
//! accounts, portfolios and their files, and querying uploaded documents.
//!
//! Every call except sign-in carries the session's bearer token.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
