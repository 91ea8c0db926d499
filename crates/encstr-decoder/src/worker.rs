//! Single background worker
//!
//! Tasks run one at a time in submission order on a dedicated named thread.
//! The queue is an unbounded tokio channel drained with `blocking_recv`, so no
//! async runtime is needed. Barriers answer over a std channel so
//! [`Worker::wait_idle`] also works from inside a runtime.

use crate::cache::CacheKey;
use crate::provider::LanguageId;
use crate::{DecoderError, Result};
use parking_lot::Mutex;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Unit of background work
#[derive(Debug)]
pub(crate) enum Task {
    /// Build the string table for a language
    LoadTable {
        language: LanguageId,
        generation: u64,
    },
    /// Run the decode pipeline for a claimed key
    Decode { key: CacheKey, generation: u64 },
    /// Signal once every earlier task has finished
    Barrier(std_mpsc::SyncSender<()>),
}

#[derive(Debug)]
pub(crate) struct Worker {
    sender: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawn the worker thread running `handler` for every task
    pub(crate) fn spawn<F>(name: &str, mut handler: F) -> Result<Self>
    where
        F: FnMut(Task) + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("Decode worker started");
                while let Some(task) = receiver.blocking_recv() {
                    match task {
                        Task::Barrier(done) => {
                            // The waiter may have given up
                            let _ = done.send(());
                        }
                        task => {
                            trace!("Running {task:?}");
                            handler(task);
                        }
                    }
                }
                debug!("Decode worker stopped");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn submit(&self, task: Task) -> Result<()> {
        self.sender
            .lock()
            .as_ref()
            .ok_or(DecoderError::WorkerStopped)?
            .send(task)
            .map_err(|_| DecoderError::WorkerStopped)
    }

    /// Block until every task submitted before this call has run
    pub(crate) fn wait_idle(&self) -> Result<()> {
        let (done, wait) = std_mpsc::sync_channel(1);
        self.submit(Task::Barrier(done))?;
        wait.recv().map_err(|_| DecoderError::WorkerStopped)
    }

    /// Close the queue and join the thread after it drains
    pub(crate) fn shutdown(&self) {
        drop(self.sender.lock().take());
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("Decode worker panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
