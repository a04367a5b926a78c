use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};

use crate::auth::UserId;
use crate::store::schema::{ProgressPatch, ProgressSnapshot};
use crate::store::{ProgressStore, StoreError};

/// One JSON document per user under `<base>/users/<id>/progress.json`.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(base_dir.join("users"))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn user_dir(&self, user: &UserId) -> PathBuf {
        self.base_dir.join("users").join(user.as_str())
    }

    fn progress_path(&self, user: &UserId) -> PathBuf {
        self.user_dir(user).join("progress.json")
    }

    fn read(&self, user: &UserId) -> Result<Option<ProgressSnapshot>, StoreError> {
        let path = self.progress_path(user);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: ProgressSnapshot =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                user: user.to_string(),
                reason: e.to_string(),
            })?;
        if !snapshot.is_supported() {
            return Err(StoreError::UnsupportedVersion {
                user: user.to_string(),
                version: snapshot.version,
            });
        }
        Ok(Some(snapshot))
    }

    fn write(&self, user: &UserId, snapshot: &ProgressSnapshot) -> Result<(), StoreError> {
        fs::create_dir_all(self.user_dir(user))?;
        let path = self.progress_path(user);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(snapshot)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

impl ProgressStore for JsonStore {
    fn load(&self, user: &UserId) -> Result<Option<ProgressSnapshot>, StoreError> {
        self.read(user)
    }

    fn save(&self, user: &UserId, patch: &ProgressPatch) -> Result<(), StoreError> {
        let mut snapshot = match self.read(user) {
            Ok(existing) => existing.unwrap_or_default(),
            Err(StoreError::Corrupt { reason, .. }) => {
                warn!("replacing unreadable progress for {user}: {reason}");
                ProgressSnapshot::default()
            }
            Err(e) => return Err(e),
        };
        patch.apply_to(&mut snapshot);
        snapshot.last_sync = Some(Utc::now());
        self.write(user, &snapshot)?;
        debug!("saved progress for {user}");
        Ok(())
    }
}
