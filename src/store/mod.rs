pub mod json_store;
pub mod memory;
pub mod schema;
pub mod sync;

use thiserror::Error;

use crate::auth::UserId;
use crate::store::schema::{ProgressPatch, ProgressSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("progress for {user} is unreadable: {reason}")]
    Corrupt { user: String, reason: String },
    #[error("progress for {user} was written by a newer version (document version {version})")]
    UnsupportedVersion { user: String, version: u32 },
    #[error("progress store unavailable: {0}")]
    Unavailable(String),
}

/// Per-user progress persistence.
///
/// `save` merges: fields absent from the patch keep their stored values, so a
/// partial update never erases what another writer stored. A document that
/// cannot be parsed at all is replaced; one written by a newer build is
/// rejected with [`StoreError::UnsupportedVersion`] on both load and save.
pub trait ProgressStore: Send + Sync {
    /// `Ok(None)` when the user has no stored progress yet.
    fn load(&self, user: &UserId) -> Result<Option<ProgressSnapshot>, StoreError>;

    fn save(&self, user: &UserId, patch: &ProgressPatch) -> Result<(), StoreError>;
}
