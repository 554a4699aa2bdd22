use std::sync::Arc;

use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Broadcasts a stop request to every part of a run that polls for one.
///
/// The scheduler checks a listener before dispatching queued scenarios and the
/// progress line uses one to know when to clear itself. Simulations that are
/// already in flight are not interrupted.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn request_stop(&self) {
        if let Err(e) = self.sender.send(()) {
            // Will fail if nothing is listening for a stop request, in which case
            // the log message can be ignored.
            log::warn!("Failed to broadcast stop request: {e:?}");
        }
    }

    pub fn new_listener(&self) -> ShutdownListener {
        ShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl ShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Point in time check for a stop request. Once this returns true it keeps
    /// returning true for the rest of the run.
    pub fn stop_requested(&mut self) -> bool {
        match self.receiver.try_lock() {
            Ok(mut guard) => {
                match guard.try_recv() {
                    Ok(_) => true,
                    Err(tokio::sync::broadcast::error::TryRecvError::Closed) => true,
                    // Empty or lagged, no stop requested.
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }

    /// Wait until a stop is requested. Safe to race against other futures so it
    /// can be used to cut short waiting work.
    pub async fn wait_for_stop(&mut self) {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .expect("Failed to receive stop request");
    }
}

/// Recorded for scenarios that were still queued when a stop request arrived.
///
/// The scheduler never interrupts an in-flight simulation; only work that had
/// not started yet is cut short, and it is reported with this error instead of
/// silently vanishing from the results.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("run interrupted before scenario {scenario_id} started")]
pub struct RunInterruptedError {
    scenario_id: String,
}

impl RunInterruptedError {
    pub fn new(scenario_id: &str) -> Self {
        Self {
            scenario_id: scenario_id.to_string(),
        }
    }
}
