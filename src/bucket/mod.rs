//! Token bucket state shared between a bucket handle and its refill worker.
pub mod sync;
pub mod tokio;

use crate::{Error, Result};
use log::*;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    // upper bound enforced by refill
    capacity: u64,

    // tokens currently available
    count: u64,

    // whether a refill worker is scheduled
    running: bool,
}

/// Counters guarded by a single lock.
/// No method holds the lock beyond its own check-and-mutate.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct Shared {
    state: Mutex<State>,
}

impl Shared {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // plain integers, consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> bool {
        let mut state = self.lock();
        if state.count > 0 {
            state.count -= 1;
            true
        } else {
            false
        }
    }

    pub fn peek(&self) -> bool {
        self.lock().count > 0
    }

    pub fn set_max(&self, capacity: u64) {
        self.lock().capacity = capacity;
    }

    pub fn set_count(&self, count: u64) {
        self.lock().count = count;
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    pub fn capacity(&self) -> u64 {
        self.lock().capacity
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    /// One refill step: add a token unless the bucket is at capacity.
    /// Returns whether a token was added.
    pub(crate) fn refill(&self) -> bool {
        let mut state = self.lock();
        if state.count < state.capacity {
            state.count += 1;
            trace!("Refilled token, {}/{}", state.count, state.capacity);
            true
        } else {
            false
        }
    }
}

/// Consumer and control API common to [`TokenBucket`](sync::TokenBucket)
/// and [`TokenBucketAsync`](tokio::TokenBucketAsync).
pub trait Bucket {
    fn shared(&self) -> &Shared;

    /// Take a token from the bucket, if available.
    /// Returns true if a token was subtracted.
    fn get(&self) -> bool {
        self.shared().get()
    }

    /// See if a token is available without taking it.
    /// Advisory only: another caller may take the last token before
    /// a following `get`.
    fn peek(&self) -> bool {
        self.shared().peek()
    }

    /// Set the maximum number of tokens refill will fill up to.
    /// An existing count above the new capacity is left as is.
    fn set_max(&self, capacity: u64) {
        self.shared().set_max(capacity)
    }

    /// Set the number of tokens in the bucket, bypassing the capacity.
    /// Useful for initialization together with `set_max` before `start`.
    fn set_count(&self, count: u64) {
        self.shared().set_count(count)
    }

    fn count(&self) -> u64 {
        self.shared().count()
    }

    fn capacity(&self) -> u64 {
        self.shared().capacity()
    }

    fn is_running(&self) -> bool {
        self.shared().is_running()
    }
}

pub(crate) fn check_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        let msg = "Refill interval must be positive".to_string();
        error!("{msg}");
        return Err(Error::Config(msg));
    }
    Ok(())
}
