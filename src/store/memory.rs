use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::auth::UserId;
use crate::store::schema::{ProgressPatch, ProgressSnapshot};
use crate::store::{ProgressStore, StoreError};

/// In-process store with the same merge semantics as [`super::json_store::JsonStore`].
/// Failures can be switched on to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<UserId, ProgressSnapshot>>,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(user: UserId, snapshot: ProgressSnapshot) -> Self {
        let store = Self::default();
        if let Ok(mut docs) = store.docs.lock() {
            docs.insert(user, snapshot);
        }
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn document(&self, user: &UserId) -> Option<ProgressSnapshot> {
        self.docs.lock().ok()?.get(user).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    fn check_version(user: &UserId, snapshot: &ProgressSnapshot) -> Result<(), StoreError> {
        if snapshot.is_supported() {
            return Ok(());
        }
        Err(StoreError::UnsupportedVersion {
            user: user.to_string(),
            version: snapshot.version,
        })
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self, user: &UserId) -> Result<Option<ProgressSnapshot>, StoreError> {
        self.check()?;
        let docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        match docs.get(user) {
            Some(snapshot) => {
                Self::check_version(user, snapshot)?;
                Ok(Some(snapshot.clone()))
            }
            None => Ok(None),
        }
    }

    fn save(&self, user: &UserId, patch: &ProgressPatch) -> Result<(), StoreError> {
        self.check()?;
        let mut docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let snapshot = docs.entry(user.clone()).or_default();
        Self::check_version(user, snapshot)?;
        patch.apply_to(snapshot);
        snapshot.last_sync = Some(chrono::Utc::now());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
