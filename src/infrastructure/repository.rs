use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

use crate::domain::{Drive, DriveDashboard, DrivePayload};
use crate::infrastructure::config::{BackendConfig, BackendMode};
use crate::infrastructure::http::HttpRepository;
use crate::infrastructure::persistence::FileRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Backend not available: {0}")]
    Unreachable(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("No ID returned from server")]
    MissingId,

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage for created drives.
///
/// Implementations must be usable from the submission worker thread.
pub trait DriveRepository: Send + Sync {
    /// Persists a new drive and returns its id.
    fn save(&self, payload: &DrivePayload) -> RepositoryResult<String>;

    /// Looks a drive up by id; `Ok(None)` when it does not exist.
    fn get(&self, id: &str) -> RepositoryResult<Option<Drive>>;

    /// Loads the KPI dashboard of a drive.
    ///
    /// Stores without field activity report the stored drive with zero
    /// counts and its polygon as the covered area.
    fn dashboard(&self, id: &str) -> RepositoryResult<Option<DriveDashboard>> {
        Ok(self.get(id)?.map(DriveDashboard::for_new_drive))
    }
}

/// Builds the repository selected by the configuration.
pub fn connect(config: &BackendConfig) -> RepositoryResult<Arc<dyn DriveRepository>> {
    debug!(mode = ?config.mode, "connecting drive repository");
    Ok(match config.mode {
        BackendMode::Memory => Arc::new(MemoryRepository::with_latency(config.mock_latency)),
        BackendMode::File => Arc::new(FileRepository::new(&config.store_path)),
        BackendMode::Http => Arc::new(HttpRepository::new(
            &config.api_base,
            config.api_token.clone(),
            config.timeout,
        )?),
    })
}

pub(crate) fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

/// In-process store handing out sequential ids, optionally slowed down to
/// mimic a remote backend.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    drives: Mutex<BTreeMap<String, Drive>>,
    next_id: AtomicU64,
    latency: Duration,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.drives.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DriveRepository for MemoryRepository {
    fn save(&self, payload: &DrivePayload) -> RepositoryResult<String> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let drive = Drive {
            id: id.clone(),
            details: payload.clone(),
            created_at: now_rfc3339(),
        };
        self.drives
            .lock()
            .map_err(|_| RepositoryError::Poisoned)?
            .insert(id.clone(), drive);
        Ok(id)
    }

    fn get(&self, id: &str) -> RepositoryResult<Option<Drive>> {
        Ok(self
            .drives
            .lock()
            .map_err(|_| RepositoryError::Poisoned)?
            .get(id)
            .cloned())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{Center, DrivePayload, Polygon};

    pub fn sample_payload() -> DrivePayload {
        DrivePayload {
            title: "Bandra drive".to_string(),
            description: "Evening round".to_string(),
            date: "2025-09-01".to_string(),
            range_km: Some(2.0),
            city: "Mumbai".to_string(),
            area: "Bandra".to_string(),
            center: Center { lat: 19.06, lng: 72.83 },
            community_forming: false,
            polygon: Polygon::from_rings(vec![vec![
                [72.82, 19.05],
                [72.84, 19.05],
                [72.84, 19.07],
                [72.82, 19.07],
                [72.82, 19.05],
            ]])
            .unwrap(),
        }
    }
}
