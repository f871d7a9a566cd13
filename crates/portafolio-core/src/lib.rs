//! Core library for the portafolio client.
//!
//! - `auth`: persisted session store, validator, sanitizer and route guard
//! - `api`: REST client for the portfolio backend
//! - `models`: users, portfolios, files and query results
//! - `history`: persisted question/answer history
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod history;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{GuardDecision, Route, Router, Session, SessionContext};
pub use config::Config;
