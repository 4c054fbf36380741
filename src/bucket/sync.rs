//! Blocking token bucket, refilled by an OS thread
use super::{check_interval, Bucket, Shared};
use crate::{Error, Result};
use log::*;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Handles scoped to a single run of the refill worker.
#[derive(Debug)]
struct Refill {
    // dropping or sending on it asks the worker to exit
    cancel: Sender<()>,

    // joined to confirm the worker has exited
    stopped: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct TokenBucket {
    shared: Arc<Shared>,

    // Serializes start/stop. Never taken by the worker.
    refill: Mutex<Option<Refill>>,
}

impl Bucket for TokenBucket {
    fn shared(&self) -> &Shared {
        &self.shared
    }
}

impl TokenBucket {
    /// An empty bucket: capacity 0, count 0, not running.
    pub fn new() -> Self {
        Default::default()
    }

    /// Begin adding one token every `interval`. Tokens are not added
    /// past the capacity set by `set_max`.
    pub fn start(&self, interval: Duration) -> Result<()> {
        check_interval(interval)?;
        let mut refill = self.refill.lock().unwrap_or_else(PoisonError::into_inner);
        if refill.is_some() {
            warn!("Refusing to start a running bucket");
            return Err(Error::AlreadyRunning);
        }

        let (cancel, cancel_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let stopped = thread::Builder::new()
            .name("tokenbucket-refill".into())
            .spawn(move || refill_loop(&shared, interval, cancel_rx))
            .map_err(|e| {
                let msg = format!("Fail to spawn refill thread: {e}");
                error!("{msg}");
                Error::Runtime(msg)
            })?;

        *refill = Some(Refill { cancel, stopped });
        self.shared.set_running(true);
        debug!("Bucket started, one token every {interval:?}");
        Ok(())
    }

    /// Stop adding tokens. Blocks until the refill thread has exited,
    /// after which no more tokens are added. The bucket can be resumed
    /// with another call to `start`.
    pub fn stop(&self) -> Result<()> {
        let mut refill = self.refill.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(Refill { cancel, stopped }) = refill.take() else {
            warn!("Refusing to stop a stopped bucket");
            return Err(Error::AlreadyStopped);
        };

        // A send error means the worker already hung up; join covers both.
        let _ = cancel.send(());
        if stopped.join().is_err() {
            error!("Refill thread panicked before acknowledging stop");
        }

        self.shared.set_running(false);
        debug!("Bucket stopped");
        Ok(())
    }
}

fn refill_loop(shared: &Shared, interval: Duration, cancel: Receiver<()>) {
    trace!("Refill thread up");
    // None: the next tick lies past what Instant can represent, so it never comes.
    let mut next = Instant::now().checked_add(interval);
    loop {
        let woke = match next {
            Some(next) => cancel.recv_timeout(next.saturating_duration_since(Instant::now())),
            None => cancel.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match woke {
            Err(RecvTimeoutError::Timeout) => {
                shared.refill();
                // Skip ticks we fell behind on rather than bursting them.
                let now = Instant::now();
                next = match next.and_then(|next| next.checked_add(interval)) {
                    Some(next) if next > now => Some(next),
                    _ => now.checked_add(interval),
                };
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    trace!("Refill thread down");
}
