use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::{Drive, DrivePayload};
use crate::infrastructure::repository::{
    now_rfc3339, DriveRepository, RepositoryError, RepositoryResult,
};

/// Keeps drives in a single JSON document on disk, keyed by id.
///
/// The whole file is rewritten on every save. The mutex serializes the
/// read-modify-write cycle within one process only.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> RepositoryResult<BTreeMap<String, Drive>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, drives: &BTreeMap<String, Drive>) -> RepositoryResult<()> {
        let json = serde_json::to_string_pretty(drives)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl DriveRepository for FileRepository {
    fn save(&self, payload: &DrivePayload) -> RepositoryResult<String> {
        let _guard = self.lock.lock().map_err(|_| RepositoryError::Poisoned)?;
        let mut drives = self.load()?;

        let id = Uuid::new_v4().to_string();
        drives.insert(
            id.clone(),
            Drive {
                id: id.clone(),
                details: payload.clone(),
                created_at: now_rfc3339(),
            },
        );
        self.store(&drives)?;
        Ok(id)
    }

    fn get(&self, id: &str) -> RepositoryResult<Option<Drive>> {
        let _guard = self.lock.lock().map_err(|_| RepositoryError::Poisoned)?;
        Ok(self.load()?.remove(id))
    }
}
