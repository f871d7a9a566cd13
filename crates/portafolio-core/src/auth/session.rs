use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

use super::store::KeyValueStore;
use crate::models::Role;

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "role";
pub const EXPIRY_KEY: &str = "expiry";
pub const USER_ID_KEY: &str = "userId";
pub const EMAIL_KEY: &str = "email";

/// Session lifetime granted on login when the config does not override it.
pub const DEFAULT_SESSION_MINUTES: i64 = 60;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// What the backend hands back on a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub user_id: String,
    pub role: Option<String>,
    pub email: Option<String>,
}

/// Snapshot of the persisted session fields, each possibly absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub role: Option<String>,
    pub expiry: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Session {
    pub fn read(store: &impl KeyValueStore) -> Self {
        Self {
            token: store.get(TOKEN_KEY),
            role: store.get(ROLE_KEY),
            expiry: store.get(EXPIRY_KEY),
            user_id: store.get(USER_ID_KEY),
            email: store.get(EMAIL_KEY),
        }
    }

    /// Expiry as epoch milliseconds. A non-numeric value counts as absent.
    pub fn expiry_millis(&self) -> Option<i64> {
        self.expiry.as_deref().and_then(|e| e.trim().parse().ok())
    }

    fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// `token` non-empty, `expiry` present, and `now_ms` strictly before it.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.has_token() && self.expiry_millis().is_some_and(|expiry| now_ms < expiry)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }

    /// Token and expiry must travel together; an empty token never counts.
    pub fn is_inconsistent(&self) -> bool {
        let empty_token = self.token.as_deref() == Some("");
        empty_token || self.has_token() != self.expiry.is_some()
    }

    /// An expiry is stored but is not in the future (or cannot be read).
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expiry {
            Some(_) => self.expiry_millis().map_or(true, |expiry| now_ms >= expiry),
            None => false,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whole minutes left before expiry, floored at zero.
    pub fn minutes_until_expiry(&self, now_ms: i64) -> i64 {
        self.expiry_millis()
            .map(|expiry| (expiry - now_ms) / MILLIS_PER_MINUTE)
            .unwrap_or(0)
            .max(0)
    }
}

/// Result of the startup cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeOutcome {
    Untouched,
    PurgedInconsistent,
    PurgedExpired,
}

/// Owner of the injected store plus the login/logout lifecycle.
#[derive(Debug)]
pub struct SessionContext<S> {
    store: S,
    lifetime_minutes: i64,
}

impl<S: KeyValueStore> SessionContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lifetime_minutes: DEFAULT_SESSION_MINUTES,
        }
    }

    pub fn with_lifetime_minutes(mut self, minutes: i64) -> Self {
        self.lifetime_minutes = minutes.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> Session {
        Session::read(&self.store)
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.snapshot().is_valid_at(now_ms)
    }

    /// Bearer token, only while the session is valid.
    pub fn token(&self) -> Option<String> {
        let session = self.snapshot();
        if session.is_valid() {
            session.token
        } else {
            None
        }
    }

    /// Repair inconsistent or stale persisted state before anything renders.
    ///
    /// Running it a second time is a no-op.
    pub fn sanitize_at(&mut self, now_ms: i64) -> Result<SanitizeOutcome> {
        let session = self.snapshot();

        let outcome = if session.is_inconsistent() {
            SanitizeOutcome::PurgedInconsistent
        } else if session.is_expired_at(now_ms) {
            SanitizeOutcome::PurgedExpired
        } else {
            return Ok(SanitizeOutcome::Untouched);
        };

        info!(?outcome, "Purging stored session");
        self.purge()?;
        Ok(outcome)
    }

    pub fn sanitize(&mut self) -> Result<SanitizeOutcome> {
        self.sanitize_at(now_millis())
    }

    /// Record a fresh login; expiry is `now_ms` plus the configured lifetime.
    pub fn establish_at(&mut self, grant: &SessionGrant, now_ms: i64) -> Result<()> {
        self.purge()?;

        let expiry = now_ms + self.lifetime_minutes * MILLIS_PER_MINUTE;
        self.store.set(TOKEN_KEY, &grant.token)?;
        self.store.set(EXPIRY_KEY, &expiry.to_string())?;
        self.store.set(USER_ID_KEY, &grant.user_id)?;
        if let Some(ref role) = grant.role {
            self.store.set(ROLE_KEY, role)?;
        }
        if let Some(ref email) = grant.email {
            self.store.set(EMAIL_KEY, email)?;
        }

        debug!(user_id = %grant.user_id, role = ?grant.role, expiry, "Session established");
        Ok(())
    }

    pub fn establish(&mut self, grant: &SessionGrant) -> Result<()> {
        self.establish_at(grant, now_millis())
    }

    /// Clear every session field.
    pub fn purge(&mut self) -> Result<()> {
        self.store.clear()
    }
}
