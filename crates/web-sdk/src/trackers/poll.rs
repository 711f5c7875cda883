//! Bounded polling and bookkeeping for the waits it spawns.

use parking_lot::Mutex;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

use beacon_core::config::PollingConfig;
use beacon_core::{BeaconError, BeaconResult};

/// Poll `predicate` until it holds or the retry budget is spent.
///
/// The predicate is checked once up front and once after each of the
/// `max_retries` sleeps, so a wait never takes longer than
/// `max_retries * interval`.
pub async fn wait_until<F>(policy: PollingConfig, predicate: F) -> bool
where
    F: Fn() -> bool,
{
    let mut retries = 0;
    loop {
        if predicate() {
            return true;
        }
        if retries >= policy.max_retries {
            return false;
        }
        retries += 1;
        tokio::time::sleep(policy.interval()).await;
    }
}

/// Tasks spawned on behalf of one tracker.
#[derive(Debug, Default)]
pub struct PendingWaits {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PendingWaits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current tokio runtime.
    pub fn spawn<F>(&self, task: F) -> BeaconResult<AbortHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| BeaconError::Runtime(format!("cannot schedule data layer wait: {e}")))?;
        let handle = runtime.spawn(task);
        let abort = handle.abort_handle();

        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(abort)
    }

    /// Number of tasks that have not finished yet.
    pub fn len(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every outstanding task, including ones spawned while
    /// settling.
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(&mut *self.handles.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                // Aborted tasks resolve with a cancellation error; nothing to report.
                let _ = handle.await;
            }
        }
    }

    /// Abort every outstanding task. Returns how many were still running.
    pub fn cancel(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles.lock());
        let mut aborted = 0;
        for handle in handles.into_iter().filter(|h| !h.is_finished()) {
            handle.abort();
            aborted += 1;
        }
        aborted
    }
}
