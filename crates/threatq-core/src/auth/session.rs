use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Cache key for a session.
///
/// Kept as a structured pair rather than a concatenated string so that
/// `("ab", "c")` and `("a", "bc")` never share an entry. Matching is exact
/// and case-sensitive.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialPair {
    username: String,
    password: String,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// Never print the password, even at trace level.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionEntry {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            created_at: Utc::now(),
        }
    }

    /// How long this token has been cached (informational only)
    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }
}

impl fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEntry")
            .field("token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Process-wide bearer token cache.
///
/// One instance is created per integration and shared (behind an `Arc`) by
/// every request executor. The lock makes concurrent `set`/`clear` calls for
/// the same key serialize with last-writer-wins semantics.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<CredentialPair, SessionEntry>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached token for these credentials, regardless of age
    pub fn get_session(&self, username: &str, password: &str) -> Option<String> {
        let key = CredentialPair::new(username, password);
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(&key).map(|entry| entry.token.clone())
    }

    /// Get the full cache entry, including when it was created
    pub fn get_entry(&self, username: &str, password: &str) -> Option<SessionEntry> {
        let key = CredentialPair::new(username, password);
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(&key).cloned()
    }

    /// Insert or replace the token for these credentials
    pub fn set_session(&self, username: &str, password: &str, token: impl Into<String>) {
        let key = CredentialPair::new(username, password);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.insert(key, SessionEntry::new(token)).is_some() {
            debug!(username = username, "Replaced cached session");
        } else {
            debug!(username = username, "Cached new session");
        }
    }

    /// Drop the token for these credentials. Missing entries are ignored.
    pub fn clear_session(&self, username: &str, password: &str) {
        let key = CredentialPair::new(username, password);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = sessions.remove(&key) {
            debug!(
                username = username,
                age_secs = entry.age().num_seconds(),
                "Cleared cached session"
            );
        }
    }

    /// Drop the token only if it is still `rejected`. Returns true when an
    /// entry was removed; a newer token cached by another request is kept.
    pub fn clear_session_if(&self, username: &str, password: &str, rejected: &str) -> bool {
        let key = CredentialPair::new(username, password);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(&key) {
            Some(entry) if entry.token == rejected => {
                sessions.remove(&key);
                debug!(username = username, "Cleared rejected session");
                true
            }
            Some(_) => {
                debug!(username = username, "Keeping newer cached session");
                false
            }
            None => false,
        }
    }

    /// Number of live sessions (diagnostics)
    pub fn get_num_sessions(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

// ============================================================================
// Tests
// ============================================================================
