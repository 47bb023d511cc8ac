//! Loads drive dashboards off the event loop.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::domain::DriveDashboard;
use crate::infrastructure::{DriveRepository, RepositoryResult};

/// A dashboard fetch that came back.
#[derive(Debug)]
pub struct DashboardLoaded {
    pub id: String,
    pub result: RepositoryResult<Option<DriveDashboard>>,
}

#[derive(Debug)]
struct Reply {
    request: u64,
    loaded: DashboardLoaded,
}

/// Fetches one dashboard at a time on a worker thread.
///
/// Only the answer to the latest [`request`](Self::request) is delivered;
/// earlier ones and anything outstanding at [`cancel`](Self::cancel) are
/// dropped.
pub struct DashboardLoader {
    request: u64,
    pending: bool,
    sender: Sender<Reply>,
    receiver: Receiver<Reply>,
}

impl Default for DashboardLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            request: 0,
            pending: false,
            sender,
            receiver,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending
    }

    /// Starts fetching the dashboard of drive `id` from `repository`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the worker thread cannot be spawned.
    pub fn request(&mut self, repository: Arc<dyn DriveRepository>, id: &str) -> io::Result<()> {
        self.request += 1;
        let request = self.request;
        let sender = self.sender.clone();
        let id = id.to_string();
        thread::Builder::new()
            .name("pawhub-dashboard".to_string())
            .spawn(move || {
                let result = repository.dashboard(&id);
                let _ = sender.send(Reply {
                    request,
                    loaded: DashboardLoaded { id, result },
                });
            })?;

        debug!(request, "dashboard requested");
        self.pending = true;
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.request += 1;
        self.pending = false;
    }

    /// Returns the latest dashboard if it has arrived.
    pub fn poll(&mut self) -> Option<DashboardLoaded> {
        while let Ok(reply) = self.receiver.try_recv() {
            if reply.request != self.request {
                warn!(id = %reply.loaded.id, "dropping outdated dashboard");
                continue;
            }
            self.pending = false;
            return Some(reply.loaded);
        }
        None
    }
}
