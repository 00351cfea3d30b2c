// src/engine/task.rs
//! Named background thread with a stop channel

use crossbeam::channel::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};

pub(crate) struct BackgroundTask {
    name: &'static str,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    /// Run `body` on a new thread. The receiver disconnects or yields a
    /// message once the task should exit.
    pub(crate) fn spawn<F>(name: &'static str, body: F) -> SimResult<Self>
    where
        F: FnOnce(Receiver<()>) + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(stop_rx))
            .map_err(|e| SimError::Resource {
                resource: name,
                reason: e.to_string(),
            })?;

        debug!(task = name, "background task started");
        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the task and wait for it to exit
    pub(crate) fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(task = self.name, "background task panicked");
            } else {
                debug!(task = self.name, "background task stopped");
            }
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
