//! Periodic background tasks with cooperative cancellation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::time;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Work performed by a [`PeriodicTask`].
pub trait PeriodicJob: Send {
    /// Run one period of work.
    fn tick(&mut self);

    /// Called once on the task's thread after cancellation.
    fn on_stop(&mut self) {}
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Shared cancellation flag checked once per period.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

/// A named thread running a [`PeriodicJob`] at a fixed period until
/// cancelled.
pub struct PeriodicTask {
    name: String,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Could not spawn the {0} thread: {1}")]
    SpawnFailed(String, std::io::Error),

    #[error("The {0} thread panicked")]
    Panicked(String)
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl PeriodicTask {
    /// Spawn the job on a new thread, ticking every `period`.
    ///
    /// The in-flight tick always completes before the thread observes the
    /// cancellation.
    pub fn spawn<J>(
        name: &str,
        period: Duration,
        cancel: CancelToken,
        mut job: J
    ) -> Result<Self, TaskError>
    where
        J: PeriodicJob + 'static
    {
        let thread_cancel = cancel.clone();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("{} task started ({:?} period)", thread_name, period);

                while !thread_cancel.is_cancelled() {
                    let start = Instant::now();

                    job.tick();

                    let elapsed = start.elapsed();
                    if elapsed < period {
                        thread::sleep(period - elapsed);
                    }
                    else {
                        warn!(
                            "{} task overran its period: {:.1} ms > {:.1} ms",
                            thread_name,
                            time::std_duration_to_millis(elapsed),
                            time::std_duration_to_millis(period)
                        );
                    }
                }

                job.on_stop();
                debug!("{} task stopped", thread_name);
            })
            .map_err(|e| TaskError::SpawnFailed(name.to_string(), e))?;

        Ok(Self {
            name: name.to_string(),
            cancel,
            handle: Some(handle)
        })
    }

    /// Cancel the task and wait for its thread to exit.
    pub fn stop(mut self) -> Result<(), TaskError> {
        self.cancel.cancel();
        self.join()
    }

    fn join(&mut self) -> Result<(), TaskError> {
        match self.handle.take() {
            Some(h) => h.join().map_err(|_| TaskError::Panicked(self.name.clone())),
            None => Ok(())
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Err(e) = self.join() {
            warn!("{}", e);
        }
    }
}
