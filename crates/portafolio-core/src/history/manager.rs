use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::QueryEntry;

/// History files are `history-<userId>.json` in the cache directory.
const HISTORY_PREFIX: &str = "history";

/// Keep the most recent 50 questions.
pub const MAX_HISTORY_ENTRIES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// File-backed history of search questions and their answers, one file per
/// account.
pub struct HistoryStore {
    path: Option<PathBuf>,
    entries: Vec<QueryEntry>,
    saved_at: Option<DateTime<Utc>>,
}

impl HistoryStore {
    /// Open `user_id`'s history in `cache_dir`. A corrupt file starts an
    /// empty history.
    pub fn open(cache_dir: &Path, user_id: &str) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let mut store = Self {
            path: Some(cache_dir.join(format!("{}-{}.json", HISTORY_PREFIX, file_key(user_id)))),
            entries: Vec::new(),
            saved_at: None,
        };

        match store.load::<Vec<QueryEntry>>() {
            Ok(Some(cached)) => {
                debug!(count = cached.data.len(), "History loaded");
                store.entries = cached.data;
                store.saved_at = Some(cached.cached_at);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable history file"),
        }
        Ok(store)
    }

    /// Empty history bound to no account. Nothing is read or written.
    pub fn signed_out() -> Self {
        Self {
            path: None,
            entries: Vec::new(),
            saved_at: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    fn load<T: DeserializeOwned>(&self) -> Result<Option<CachedData<T>>> {
        let Some(path) = self.path.as_ref().filter(|p| p.exists()) else {
            return Ok(None);
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {}", path.display()))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse history file: {}", path.display()))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, data: &T) -> Result<Option<DateTime<Utc>>> {
        let Some(path) = self.path.as_ref() else {
            return Ok(None);
        };
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(path, contents)?;
        Ok(Some(cached.cached_at))
    }

    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&QueryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry, dropping the oldest beyond the cap, and persist.
    pub fn push(&mut self, entry: QueryEntry) -> Result<()> {
        self.entries.push(entry);
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(..excess);
        }
        self.saved_at = self.save(&self.entries)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.saved_at = None;
        if let Some(path) = self.path.as_ref().filter(|p| p.exists()) {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// "5m ago"-style age of the last save, "never" without one.
    pub fn last_saved(&self) -> String {
        match self.saved_at {
            Some(at) => CachedData {
                data: (),
                cached_at: at,
            }
            .age_display(),
            None => "never".to_string(),
        }
    }
}

/// Account ids are backend document ids; anything outside `[A-Za-z0-9_-]`
/// is replaced so the id cannot escape the cache directory.
fn file_key(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    use crate::models::{QueryResponse, Snippet};

    fn entry(question: &str) -> QueryEntry {
        let response = QueryResponse {
            data: vec![Snippet {
                text: format!("answer to {}", question),
                score: Some(50.0),
            }],
        };
        QueryEntry::answered(question, &response)
    }

    #[test]
    fn test_cached_data_age_display() {
        let fresh = CachedData::new(());
        assert_eq!(fresh.age_display(), "just now");

        let mut old = CachedData::new(());
        old.cached_at = Utc::now() - Duration::minutes(90);
        assert_eq!(old.age_display(), "1h ago");

        old.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(old.age_display(), "3d ago");
    }

    #[test]
    fn test_history_persists_across_opens() {
        let dir = TempDir::new().unwrap();

        let mut history = HistoryStore::open(dir.path(), "u1").unwrap();
        assert_eq!(history.last_saved(), "never");
        history.push(entry("uno")).unwrap();
        history.push(entry("dos")).unwrap();

        let reopened = HistoryStore::open(dir.path(), "u1").unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(1).unwrap().question, "dos");
        assert_eq!(reopened.last_saved(), "just now");
    }

    #[test]
    fn test_history_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut history = HistoryStore::open(dir.path(), "u1").unwrap();

        for i in 0..(MAX_HISTORY_ENTRIES + 5) {
            history.push(entry(&format!("q{}", i))).unwrap();
        }

        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0].question, "q5");
    }

    #[test]
    fn test_history_clear() {
        let dir = TempDir::new().unwrap();
        let mut history = HistoryStore::open(dir.path(), "u1").unwrap();
        history.push(entry("uno")).unwrap();

        history.clear().unwrap();

        assert!(history.is_empty());
        assert!(HistoryStore::open(dir.path(), "u1").unwrap().is_empty());
    }

    #[test]
    fn test_each_account_has_its_own_history() {
        let dir = TempDir::new().unwrap();
        let mut ana = HistoryStore::open(dir.path(), "u1").unwrap();
        ana.push(entry("notas de ana")).unwrap();

        let luis = HistoryStore::open(dir.path(), "u2").unwrap();
        assert!(luis.is_empty());

        let ana = HistoryStore::open(dir.path(), "u1").unwrap();
        assert_eq!(ana.len(), 1);
        assert!(dir.path().join("history-u1.json").exists());
    }

    #[test]
    fn test_user_id_cannot_leave_cache_dir() {
        assert_eq!(file_key("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_key("680ec523f6bc85c713d73d5c"), "680ec523f6bc85c713d73d5c");
    }

    #[test]
    fn test_signed_out_history_is_not_persisted() {
        let mut history = HistoryStore::signed_out();
        assert!(!history.is_persistent());
        history.push(entry("uno")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.last_saved(), "never");
        history.clear().unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_corrupt_history_starts_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("history-u1.json"), "garbage").unwrap();

        let history = HistoryStore::open(dir.path(), "u1").unwrap();
        assert!(history.is_empty());
    }
}
