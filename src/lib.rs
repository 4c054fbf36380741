//! A thread-safe token bucket.
//!
//! A bucket holds up to `capacity` tokens. Once started, a background
//! worker adds one token per interval until the bucket is full, and
//! callers poll it with [`Bucket::get`] / [`Bucket::peek`] instead of
//! blocking. [`TokenBucket`] refills from an OS thread and stops
//! synchronously; [`TokenBucketAsync`] refills from a tokio task.
//!
//! ```no_run
//! use std::time::Duration;
//! use tokenbucket::{Bucket, TokenBucket};
//!
//! let bucket = TokenBucket::new();
//! bucket.set_max(5);
//! bucket.start(Duration::from_millis(200))?;
//! if bucket.get() {
//!     // admitted
//! }
//! bucket.stop()?;
//! # Ok::<(), tokenbucket::Error>(())
//! ```
mod bucket;
pub mod config;
mod error;
pub mod options;
pub mod utils;

pub use crate::bucket::sync::TokenBucket;
pub use crate::bucket::tokio::TokenBucketAsync;
pub use crate::bucket::Bucket;
#[doc(hidden)]
pub use crate::bucket::Shared;
pub use crate::error::{Error, Result};
