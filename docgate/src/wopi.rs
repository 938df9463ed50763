//! In-memory WOPI lock table.
//!
//! WOPI locks are advisory strings the viewer attaches to a document while a
//! user is editing it. They gate the WOPI save path only; they do not
//! serialize plain uploads. Locks expire after 30 minutes unless refreshed,
//! per WOPI, and are lost on restart - acceptable for a
//! single-instance gateway fronting one viewer.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::errors::{Error, Result};

/// WOPI lock lifetime; the viewer refreshes well within this window.
const LOCK_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct Lock {
    value: String,
    refreshed_at: DateTime<Utc>,
}

impl Lock {
    fn expired(&self) -> bool {
        Utc::now() - self.refreshed_at > Duration::minutes(LOCK_TTL_MINUTES)
    }
}

/// Lock table keyed by document name.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<String, Lock>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lock value for a document, if an unexpired one exists
    pub fn current(&self, name: &str) -> Option<String> {
        let entry = self.locks.get(name)?;
        if entry.expired() {
            drop(entry);
            self.locks.remove(name);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Acquire or refresh a lock. Succeeds when the document is unlocked or
    /// already holds the same lock value; conflicts carry the current holder.
    pub fn lock(&self, name: &str, value: &str) -> Result<()> {
        match self.current(name) {
            None => {
                self.locks.insert(
                    name.to_string(),
                    Lock {
                        value: value.to_string(),
                        refreshed_at: Utc::now(),
                    },
                );
                Ok(())
            }
            Some(current) if current == value => {
                self.locks.insert(
                    name.to_string(),
                    Lock {
                        value: value.to_string(),
                        refreshed_at: Utc::now(),
                    },
                );
                Ok(())
            }
            Some(current) => Err(Error::LockConflict { current }),
        }
    }

    /// Refresh an existing lock's TTL. Unlike [`LockTable::lock`], refreshing
    /// never acquires: an unlocked document is a conflict with an empty lock
    /// value, per WOPI.
    pub fn refresh(&self, name: &str, value: &str) -> Result<()> {
        match self.current(name) {
            Some(current) if current == value => {
                self.locks.insert(
                    name.to_string(),
                    Lock {
                        value: value.to_string(),
                        refreshed_at: Utc::now(),
                    },
                );
                Ok(())
            }
            Some(current) => Err(Error::LockConflict { current }),
            None => Err(Error::LockConflict { current: String::new() }),
        }
    }

    /// Release a lock; the caller must present the current lock value
    pub fn unlock(&self, name: &str, value: &str) -> Result<()> {
        match self.current(name) {
            Some(current) if current == value => {
                self.locks.remove(name);
                Ok(())
            }
            Some(current) => Err(Error::LockConflict { current }),
            // Unlocking an unlocked document is a conflict with an empty lock, per WOPI
            None => Err(Error::LockConflict { current: String::new() }),
        }
    }

    /// Check that a write is permitted under the presented lock value.
    /// Unlocked documents accept writes with no (or an empty) lock header.
    pub fn check_write(&self, name: &str, presented: Option<&str>) -> Result<()> {
        match (self.current(name), presented.unwrap_or("")) {
            (None, _) => Ok(()),
            (Some(current), presented) if current == presented => Ok(()),
            (Some(current), _) => Err(Error::LockConflict { current }),
        }
    }

    /// Drop all locks for a document (used when the document is deleted or renamed)
    pub fn forget(&self, name: &str) {
        self.locks.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn lock_then_matching_refresh_succeeds() {
        let table = LockTable::new();
        table.lock("a.odt", "session-1").expect("initial lock");
        table.lock("a.odt", "session-1").expect("refresh");
        assert_eq!(table.current("a.odt").as_deref(), Some("session-1"));
    }

    #[test_log::test]
    fn conflicting_lock_reports_holder() {
        let table = LockTable::new();
        table.lock("a.odt", "session-1").expect("initial lock");
        let err = table.lock("a.odt", "session-2").expect_err("conflict");
        match err {
            Error::LockConflict { current } => assert_eq!(current, "session-1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test_log::test]
    fn unlock_requires_matching_value() {
        let table = LockTable::new();
        table.lock("a.odt", "session-1").expect("lock");
        assert!(table.unlock("a.odt", "wrong").is_err());
        table.unlock("a.odt", "session-1").expect("unlock");
        assert_eq!(table.current("a.odt"), None);
    }

    #[test_log::test]
    fn writes_gated_by_lock() {
        let table = LockTable::new();
        table.check_write("a.odt", None).expect("unlocked write");
        table.lock("a.odt", "session-1").expect("lock");
        assert!(table.check_write("a.odt", None).is_err());
        table.check_write("a.odt", Some("session-1")).expect("holder write");
    }

    #[test_log::test]
    fn refresh_requires_an_existing_lock() {
        let table = LockTable::new();
        let err = table.refresh("a.odt", "session-1").expect_err("conflict");
        match err {
            Error::LockConflict { current } => assert_eq!(current, ""),
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing was acquired as a side effect
        assert_eq!(table.current("a.odt"), None);

        table.lock("a.odt", "session-1").expect("lock");
        table.refresh("a.odt", "session-1").expect("refresh");
        assert!(table.refresh("a.odt", "session-2").is_err());
    }

    #[test_log::test]
    fn unlock_without_lock_conflicts_with_empty_value() {
        let table = LockTable::new();
        let err = table.unlock("a.odt", "anything").expect_err("conflict");
        match err {
            Error::LockConflict { current } => assert_eq!(current, ""),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
