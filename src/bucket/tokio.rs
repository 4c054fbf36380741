//! Tokio token bucket, refilled by a spawned task
use super::{check_interval, Bucket, Shared};
use crate::{Error, Result};
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug)]
struct Refill {
    // taken once the cancel signal has been sent
    cancel: Option<oneshot::Sender<()>>,
    stopped: JoinHandle<()>,
}

/// Same bucket as [`TokenBucket`](crate::TokenBucket), with the refill
/// worker running as a task on the current tokio runtime.
/// Consumer calls never suspend; only the lifecycle calls are async.
#[derive(Debug, Default)]
pub struct TokenBucketAsync {
    shared: Arc<Shared>,
    refill: Mutex<Option<Refill>>,
}

impl Bucket for TokenBucketAsync {
    fn shared(&self) -> &Shared {
        &self.shared
    }
}

impl TokenBucketAsync {
    pub fn new() -> Self {
        Default::default()
    }

    /// Begin adding one token every `interval` on the current runtime.
    /// Fails with `Error::Runtime` when polled outside a tokio runtime.
    pub async fn start(&self, interval: Duration) -> Result<()> {
        check_interval(interval)?;
        let handle = Handle::try_current().map_err(|e| {
            let msg = format!("No tokio runtime to run refill task: {e}");
            error!("{msg}");
            Error::Runtime(msg)
        })?;

        let mut refill = self.refill.lock().await;
        if refill.is_some() {
            warn!("Refusing to start a running bucket");
            return Err(Error::AlreadyRunning);
        }

        let (cancel, cancel_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let stopped = handle.spawn(refill_task(shared, interval, cancel_rx));

        *refill = Some(Refill {
            cancel: Some(cancel),
            stopped,
        });
        self.shared.set_running(true);
        debug!("Bucket started, one token every {interval:?}");
        Ok(())
    }

    /// Stop adding tokens, waiting for the refill task to finish.
    ///
    /// Cancel safe: if this future is dropped before the task has exited,
    /// the bucket stays running and a later `stop` finishes the job.
    pub async fn stop(&self) -> Result<()> {
        let mut refill = self.refill.lock().await;
        let Some(Refill { cancel, stopped }) = refill.as_mut() else {
            warn!("Refusing to stop a stopped bucket");
            return Err(Error::AlreadyStopped);
        };

        if let Some(cancel) = cancel.take() {
            let _ = cancel.send(());
        }
        if let Err(e) = stopped.await {
            error!("Refill task ended abnormally: {e}");
        }

        *refill = None;
        self.shared.set_running(false);
        debug!("Bucket stopped");
        Ok(())
    }
}

async fn refill_task(shared: Arc<Shared>, period: Duration, mut cancel: oneshot::Receiver<()>) {
    trace!("Refill task up");
    let now = Instant::now();
    // The ticker computes the deadline after next; past Instant's range it never ticks.
    let Some(first) = period
        .checked_mul(2)
        .and_then(|twice| now.checked_add(twice))
        .map(|_| now + period)
    else {
        let _ = cancel.await;
        trace!("Refill task down");
        return;
    };
    let mut ticker = interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            // A dropped sender resolves too.
            _ = &mut cancel => break,
            _ = ticker.tick() => {
                shared.refill();
            }
        }
    }
    trace!("Refill task down");
}
