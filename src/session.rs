//! Session state
//!
//! The workflow only needs string get/set on per-user state. `SessionStore`
//! is a process-local map of session id to values; expiry and transport
//! belong to the host.

use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Session key holding the current avatar path
pub const AVATAR_PATH_KEY: &str = "AvatarPath";

/// Per-user string state
pub trait Session {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// String map backing one session
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    values: HashMap<String, String>,
}

impl Session for SessionData {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

/// In-memory sessions keyed by id
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a random 128-bit session id
    pub fn new_session_id() -> String {
        let bytes: [u8; 16] = rand::thread_rng().gen();
        hex::encode(bytes)
    }

    /// Copy of the session for `id`, if one exists. Never creates a session.
    pub fn get(&self, id: &str) -> Option<SessionData> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Run `f` against the session for `id`, creating it if missing.
    ///
    /// The store lock is held while `f` runs; keep `f` to map updates.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> R {
        // A poisoned lock only means another handler panicked mid-update
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let session = sessions.entry(id.to_string()).or_default();
        f(session)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
