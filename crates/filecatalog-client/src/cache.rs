//! In-memory identifier and concurrency-token caches.
//!
//! Both caches live for the lifetime of the owning client and are never
//! shared between clients. They do no I/O and cannot fail.

use std::collections::HashMap;

use tracing::warn;

/// Maps a caller-assigned uid to the server-assigned stable identifier.
///
/// Stable identifiers are kept unique across values: mapping a uid to an
/// identifier already held by another uid drops the older mapping.
#[derive(Debug, Clone, Default)]
pub struct IdentifierCache {
    ids: HashMap<String, String>,
}

impl IdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uid: &str) -> Option<&str> {
        self.ids.get(uid).map(String::as_str)
    }

    pub fn has(&self, uid: &str) -> bool {
        self.ids.contains_key(uid)
    }

    /// Upsert `uid -> stable_id`.
    pub fn set(&mut self, uid: impl Into<String>, stable_id: impl Into<String>) {
        let uid = uid.into();
        let stable_id = stable_id.into();

        let before = self.ids.len();
        self.ids.retain(|other, id| other == &uid || id != &stable_id);
        if self.ids.len() != before {
            warn!(
                uid = %uid,
                stable_id = %stable_id,
                "stable identifier was cached under another uid; replacing"
            );
        }

        self.ids.insert(uid, stable_id);
    }

    /// Remove the mapping whose value is `stable_id`. Returns how many
    /// entries were removed (zero or one).
    pub fn delete_by_stable_id(&mut self, stable_id: &str) -> usize {
        let before = self.ids.len();
        self.ids.retain(|_, id| id != stable_id);
        let removed = before - self.ids.len();
        debug_assert!(removed <= 1, "stable identifier mapped from {removed} uids");
        removed
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// What the client knows about a record's concurrency token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState<'a> {
    /// Never looked up.
    Unknown,
    /// Looked up, and the server supplied none.
    Missing,
    /// Last observed token.
    Known(&'a str),
}

/// Maps a stable identifier to the last concurrency token this client saw.
///
/// A cached token can be stale relative to the server; a write made with it
/// then fails with a conflict.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    tokens: HashMap<String, Option<String>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stable_id: &str) -> Option<&str> {
        self.tokens.get(stable_id).and_then(|t| t.as_deref())
    }

    pub fn lookup(&self, stable_id: &str) -> TokenState<'_> {
        match self.tokens.get(stable_id) {
            None => TokenState::Unknown,
            Some(None) => TokenState::Missing,
            Some(Some(token)) => TokenState::Known(token),
        }
    }

    /// Upsert. `None` records that the server returned no token.
    pub fn set(&mut self, stable_id: impl Into<String>, token: Option<String>) {
        self.tokens.insert(stable_id.into(), token);
    }

    pub fn delete(&mut self, stable_id: &str) {
        self.tokens.remove(stable_id);
    }
}

/// Both caches of one client, guarded together.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    pub ids: IdentifierCache,
    pub tokens: TokenCache,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything known about `stable_id`.
    pub fn clear_by_stable_id(&mut self, stable_id: &str) {
        self.ids.delete_by_stable_id(stable_id);
        self.tokens.delete(stable_id);
    }
}
