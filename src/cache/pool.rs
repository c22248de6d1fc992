//! Render worker pool
//!
//! A fixed set of named threads pulls render jobs from a shared channel and
//! sends each result back on the channel of the batch it came from. The
//! controller side ([`RenderPool::run_batch`]) consumes results one at a time
//! so file writes and change classification stay single-threaded.
//!
//! The first failing document stops the batch: the shutdown flag is set,
//! queued jobs are skipped, and the error is returned. After that the pool
//! only drains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{Error, Result};
use crate::render::{self, Formatter};
use crate::signal::CancelToken;

/// How often the controller re-checks the cancel token while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Extra workers on top of the CPU count; rendering mostly waits on the
/// formatter process.
const EXTRA_WORKERS: usize = 4;

/// One document to render.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Document file name, e.g. `tar.md`
    pub name: String,
    /// Raw markdown
    pub source: String,
}

/// Rendered output for one document.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    /// Document file name the artifact came from
    pub name: String,
    pub content: String,
}

struct Task {
    job: RenderJob,
    reply: Sender<Result<RenderedArtifact>>,
}

/// Default worker count: available parallelism plus a few.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        + EXTRA_WORKERS
}

/// Pool of render threads sharing one formatter.
pub struct RenderPool {
    tasks: Option<Sender<Task>>,
    shutdown: Arc<AtomicBool>,
    cancel: CancelToken,
    workers: usize,
}

impl RenderPool {
    /// Spawn `workers` render threads.
    pub fn new(
        workers: usize,
        formatter: Arc<dyn Formatter>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let workers = workers.max(1);
        let (tx, rx) = crossbeam_channel::unbounded::<Task>();
        let shutdown = Arc::new(AtomicBool::new(false));

        for index in 0..workers {
            let rx = rx.clone();
            let formatter = Arc::clone(&formatter);
            let shutdown = Arc::clone(&shutdown);
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("render-{index}"))
                .spawn(move || worker_loop(rx, formatter, shutdown, cancel))
                .map_err(|err| Error::io("render worker thread", err))?;
        }

        tracing::debug!(workers, "render pool started");
        Ok(Self {
            tasks: Some(tx),
            shutdown,
            cancel,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Render every job, handing each artifact to `on_result` as it arrives.
    ///
    /// Results come back in completion order. Returns the first render
    /// failure, the first error from `on_result`, or [`Error::Cancelled`].
    pub fn run_batch<F>(&self, jobs: Vec<RenderJob>, mut on_result: F) -> Result<()>
    where
        F: FnMut(RenderedArtifact) -> Result<()>,
    {
        let tasks = self.tasks.as_ref().ok_or(Error::Cancelled)?;
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }

        let expected = jobs.len();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();
        for job in jobs {
            let task = Task {
                job,
                reply: reply_tx.clone(),
            };
            if tasks.send(task).is_err() {
                return Err(self.stop(Error::Cancelled));
            }
        }
        drop(reply_tx);

        let mut received = 0;
        while received < expected {
            if self.cancel.is_cancelled() {
                return Err(self.stop(Error::Cancelled));
            }

            match reply_rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(artifact)) => {
                    received += 1;
                    if let Err(err) = on_result(artifact) {
                        return Err(self.stop(err));
                    }
                }
                // A signal also kills the formatter child, so its failure
                // reports as the interrupt.
                Ok(Err(_)) if self.cancel.is_cancelled() => {
                    return Err(self.stop(Error::Cancelled))
                }
                Ok(Err(err)) => return Err(self.stop(err)),
                Err(RecvTimeoutError::Timeout) => continue,
                // Every outstanding job was dropped without a reply.
                Err(RecvTimeoutError::Disconnected) => return Err(self.stop(Error::Cancelled)),
            }
        }
        Ok(())
    }

    fn stop(&self, err: Error) -> Error {
        self.shutdown.store(true, Ordering::SeqCst);
        err
    }
}

impl Drop for RenderPool {
    fn drop(&mut self) {
        // Workers exit once the task channel disconnects. Not joined.
        self.shutdown.store(true, Ordering::SeqCst);
        self.tasks.take();
    }
}

fn worker_loop(
    tasks: Receiver<Task>,
    formatter: Arc<dyn Formatter>,
    shutdown: Arc<AtomicBool>,
    cancel: CancelToken,
) {
    while let Ok(Task { job, reply }) = tasks.recv() {
        if shutdown.load(Ordering::SeqCst) || cancel.is_cancelled() {
            continue;
        }

        let result = render::render(&job.source, formatter.as_ref())
            .map(|content| RenderedArtifact {
                name: job.name.clone(),
                content,
            })
            .map_err(|source| Error::RenderPage {
                page: job.name,
                source,
            });
        // The batch may already be gone after a failure.
        let _ = reply.send(result);
    }
}
