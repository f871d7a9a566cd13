//! Authentication module for managing the client-side session.
//!
//! This module provides:
//! - `KeyValueStore`: the persisted key/value state the session lives in
//! - `Session` / `SessionContext`: validation, startup sanitizing and
//!   the login/logout lifecycle
//! - `Router`: the route guard deciding which view may render
//! - `CredentialStore`: optional OS keychain storage of the password
//!
//! A session is usable only while its token is non-empty and its expiry
//! (epoch milliseconds) lies strictly in the future.

pub mod credentials;
pub mod guard;
pub mod session;
pub mod store;

pub use credentials::CredentialStore;
pub use guard::{evaluate, GuardDecision, Route, Router};
pub use session::{now_millis, SanitizeOutcome, Session, SessionContext, SessionGrant};
pub use store::{FileStore, KeyValueStore, MemoryStore};
