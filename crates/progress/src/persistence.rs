//! Loading and saving learner state in the local store.
//!
//! Nothing here returns an error: a store that cannot be read yields the
//! default state, and a store that cannot be written is logged and left
//! behind. The in-memory state owned by the engine stays authoritative.

use chrono::{DateTime, Utc};
use levelup_core::{ProgressState, Time, UserId};
use levelup_storage::KeyValueStore;
use tracing::{debug, warn};

/// Prefix of the per-user progress document key.
pub const PROGRESS_KEY_PREFIX: &str = "levelup_progress_";

/// Key of the bearer credential written by the login flow.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key of the device-wide heart regeneration timestamp.
pub const REGEN_KEY: &str = "levelup_hearts_last_regen";

/// Store key for a user's progress document.
pub fn progress_key(user: &UserId) -> String {
    format!("{}{}", PROGRESS_KEY_PREFIX, user.as_str())
}

/// Store key for a user's own regeneration timestamp.
pub fn user_regen_key(user: &UserId) -> String {
    format!("{}_{}", REGEN_KEY, user.as_str())
}

/// Load a user's state, falling back to defaults on missing or bad data.
pub fn load_state<S: KeyValueStore + ?Sized>(store: &S, user: &UserId) -> ProgressState {
    let key = progress_key(user);
    match store.get(&key) {
        Ok(Some(json)) => match ProgressState::from_json(&json) {
            Ok(state) => {
                debug!("Loaded progress for {} ({} levels)", user, state.records.len());
                state
            }
            Err(e) => {
                warn!("Discarding unreadable progress for {}: {}", user, e);
                ProgressState::default()
            }
        },
        Ok(None) => {
            debug!("No stored progress for {}, starting fresh", user);
            ProgressState::default()
        }
        Err(e) => {
            warn!("Failed to read progress for {}: {}", user, e);
            ProgressState::default()
        }
    }
}

/// Save a user's state. Returns whether the write went through.
pub fn save_state<S: KeyValueStore + ?Sized>(store: &S, user: &UserId, state: &ProgressState) -> bool {
    let json = match state.to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize progress for {}: {}", user, e);
            return false;
        }
    };

    match store.set(&progress_key(user), &json) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save progress for {}, keeping it in memory only: {}", user, e);
            false
        }
    }
}

/// Read the bearer credential, if one is stored.
pub fn read_auth_token<S: KeyValueStore + ?Sized>(store: &S) -> Option<String> {
    match store.get(AUTH_TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            warn!("Failed to read auth token: {}", e);
            None
        }
    }
}

/// Read a stored timestamp; unreadable values count as absent.
pub fn read_timestamp<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<Time> {
    match store.get(key) {
        Ok(Some(raw)) => match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring malformed timestamp under {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

/// Write a timestamp. Returns whether the write went through.
pub fn write_timestamp<S: KeyValueStore + ?Sized>(store: &S, key: &str, at: Time) -> bool {
    match store.set(key, &at.to_rfc3339()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write {}: {}", key, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelup_core::{evaluate, LevelAttempt, LevelId, LevelRecord};
    use levelup_storage::{MemoryStore, StorageError};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> levelup_storage::Result<Option<String>> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> levelup_storage::Result<()> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        fn remove(&self, _key: &str) -> levelup_storage::Result<()> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = MemoryStore::new();
        let user = UserId::new("ana");

        let mut state = ProgressState::default();
        let attempt = LevelAttempt::new(LevelId(1), 10, 10, 25);
        state.records.insert(
            LevelId(1),
            LevelRecord::from_attempt(&attempt, evaluate(10, 10), Utc::now()),
        );
        state.progress.record_pass(LevelId(1), 25);

        assert!(save_state(&store, &user, &state));
        assert!(store.get("levelup_progress_ana").unwrap().is_some());
        assert_eq!(load_state(&store, &user), state);
    }

    #[test]
    fn test_load_is_namespaced_by_user() {
        let store = MemoryStore::new();
        let mut state = ProgressState::default();
        state.progress.total_xp = 99;
        save_state(&store, &UserId::new("ana"), &state);

        assert_eq!(load_state(&store, &UserId::new("ben")), ProgressState::default());
    }

    #[test]
    fn test_load_corrupt_falls_back_to_defaults() {
        let store = MemoryStore::new();
        store.set("levelup_progress_ana", "{\"records\": 12").unwrap();
        assert_eq!(load_state(&store, &UserId::new("ana")), ProgressState::default());
    }

    #[test]
    fn test_broken_store_never_fails() {
        let user = UserId::new("ana");
        assert_eq!(load_state(&BrokenStore, &user), ProgressState::default());
        assert!(!save_state(&BrokenStore, &user, &ProgressState::default()));
        assert_eq!(read_auth_token(&BrokenStore), None);
        assert_eq!(read_timestamp(&BrokenStore, REGEN_KEY), None);
    }

    #[test]
    fn test_blank_token_is_absent() {
        let store = MemoryStore::new();
        store.set(AUTH_TOKEN_KEY, "  ").unwrap();
        assert_eq!(read_auth_token(&store), None);
        store.set(AUTH_TOKEN_KEY, "tok").unwrap();
        assert_eq!(read_auth_token(&store).as_deref(), Some("tok"));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let store = MemoryStore::new();
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z").unwrap().with_timezone(&Utc);
        assert!(write_timestamp(&store, REGEN_KEY, at));
        assert_eq!(read_timestamp(&store, REGEN_KEY), Some(at));

        store.set(REGEN_KEY, "yesterday").unwrap();
        assert_eq!(read_timestamp(&store, REGEN_KEY), None);
    }
}
