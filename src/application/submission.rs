//! Background dispatch of drive creation requests.
//!
//! The event loop never blocks on the repository. Each submission runs on its
//! own worker thread and reports back over a channel, tagged with the
//! generation it was started in. Cancelling bumps the generation, so a late
//! answer for an abandoned submission is recognised and dropped.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::DrivePayload;
use crate::infrastructure::{DriveRepository, RepositoryResult};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("A submission is already in progress")]
    InFlight,

    #[error("Could not start submission: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    result: RepositoryResult<String>,
}

pub struct SubmissionController {
    repository: Arc<dyn DriveRepository>,
    generation: u64,
    in_flight: bool,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl SubmissionController {
    pub fn new(repository: Arc<dyn DriveRepository>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            repository,
            generation: 0,
            in_flight: false,
            sender,
            receiver,
        }
    }

    pub fn repository(&self) -> &Arc<dyn DriveRepository> {
        &self.repository
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Starts saving `payload` in the background and returns immediately.
    pub fn submit(&mut self, payload: DrivePayload) -> Result<(), SubmitError> {
        if self.in_flight {
            warn!("submission refused: another one is in flight");
            return Err(SubmitError::InFlight);
        }

        let generation = self.generation;
        let repository = Arc::clone(&self.repository);
        let sender = self.sender.clone();
        thread::Builder::new()
            .name("pawhub-submit".to_string())
            .spawn(move || {
                let result = repository.save(&payload);
                // The controller may be gone already; nobody is left to tell.
                let _ = sender.send(Completion { generation, result });
            })?;

        info!(generation, "drive submission dispatched");
        self.in_flight = true;
        Ok(())
    }

    /// Abandons the in-flight submission, if any. Its result will be ignored.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if self.in_flight {
            info!(generation = self.generation, "submission cancelled");
        }
        self.in_flight = false;
    }

    /// Returns the outcome of the current submission if it has arrived.
    pub fn poll(&mut self) -> Option<RepositoryResult<String>> {
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => {
                    if let Some(result) = self.accept(completion) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Blocks until the current submission finishes or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Option<RepositoryResult<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => {
                    if let Some(result) = self.accept(completion) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    fn accept(&mut self, completion: Completion) -> Option<RepositoryResult<String>> {
        if completion.generation != self.generation {
            warn!(
                stale = completion.generation,
                current = self.generation,
                "ignoring result of a cancelled submission"
            );
            return None;
        }
        debug!(generation = completion.generation, ok = completion.result.is_ok(), "submission finished");
        self.in_flight = false;
        Some(completion.result)
    }
}
