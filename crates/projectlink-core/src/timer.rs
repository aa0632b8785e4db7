// ── Single-flight periodic task ──
//
// Each tick is scheduled only after the previous tick's future settles,
// so ticks never overlap and slow ticks never queue up behind each other.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer is already started")]
    AlreadyStarted,

    #[error("timer is not started")]
    NotStarted,
}

/// A self-rescheduling periodic task with at most one tick pending or in flight.
///
/// The interval can be changed at any time and applies from the next
/// scheduled tick. A tick that returns `Err` is logged and the timer keeps
/// going. Dropping the timer stops it.
pub struct PersistentTimer {
    name: &'static str,
    interval_ms: Arc<AtomicU64>,
    running: Mutex<Option<CancellationToken>>,
    /// Held while a tick runs. Shared by every loop this timer spawns, so a
    /// restart waits for a tick left in flight by `stop()`.
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

impl PersistentTimer {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval_ms: Arc::new(AtomicU64::new(duration_ms(interval))),
            running: Mutex::new(None),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    /// Change the delay used for the next scheduled tick.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms.store(duration_ms(interval), Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .expect("timer lock poisoned")
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Begin scheduling `tick` every interval.
    ///
    /// Must be called from within a Tokio runtime. Starting a running
    /// timer logs a warning and returns [`TimerError::AlreadyStarted`].
    pub fn start<F, Fut, E>(&self, mut tick: F) -> Result<(), TimerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send,
    {
        let mut running = self.running.lock().expect("timer lock poisoned");
        if running.as_ref().is_some_and(|token| !token.is_cancelled()) {
            warn!(timer = self.name, "start() called on a running timer");
            return Err(TimerError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();
        *running = Some(cancel.clone());
        drop(running);

        let name = self.name;
        let interval_ms = Arc::clone(&self.interval_ms);
        let in_flight = Arc::clone(&self.in_flight);
        debug!(timer = name, interval_ms = interval_ms.load(Ordering::SeqCst), "timer started");

        tokio::spawn(async move {
            loop {
                let delay = Duration::from_millis(interval_ms.load(Ordering::SeqCst));
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
                let _in_flight = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    guard = in_flight.lock() => guard,
                };

                // An in-flight tick is never interrupted; `stop()` only
                // prevents the next one from being scheduled.
                if let Err(e) = tick().await {
                    warn!(timer = name, error = %e, "timer tick failed");
                }
            }
            debug!(timer = name, "timer loop exiting");
        });

        Ok(())
    }

    /// Cancel the pending tick. Stopping an idle timer logs a warning and
    /// returns [`TimerError::NotStarted`].
    pub fn stop(&self) -> Result<(), TimerError> {
        let token = self.running.lock().expect("timer lock poisoned").take();
        match token {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                debug!(timer = self.name, "timer stopped");
                Ok(())
            }
            _ => {
                warn!(timer = self.name, "stop() called on an idle timer");
                Err(TimerError::NotStarted)
            }
        }
    }
}

impl Drop for PersistentTimer {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            if let Some(token) = running.take() {
                token.cancel();
            }
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
