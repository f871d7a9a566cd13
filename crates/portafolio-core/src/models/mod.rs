//! Data models for the portfolio backend.
//!
//! - `User`, `Role`: accounts and their coarse permission class
//! - `Portfolio`: a teacher's named collection of files
//! - `PortfolioFile`, `Category`: uploaded files organized by week
//! - `QueryResponse`, `QueryEntry`: document search results and history

pub mod file;
pub mod portfolio;
pub mod query;
pub mod user;
mod lenient;

use serde::Deserialize;
use thiserror::Error;

pub use lenient::{DocId, IdRef};
pub use file::{Category, PortfolioFile, UploadRequest, WEEK_COUNT};
pub use portfolio::{Portfolio, PortfolioFilter, PortfolioPayload};
pub use query::{QueryEntry, QueryResponse, Snippet, NO_ANSWER};
pub use user::{ProfilePayload, Role, User, UserPayload};

/// `{ "data": ... }` envelope most backend responses arrive in.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Client-side form validation failures, shown inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Select at least one file")]
    NoFiles,

    #[error("Week must be between 1 and {0}")]
    WeekOutOfRange(u8),
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}
