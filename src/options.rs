use std::time::Duration;

use crate::config::BucketConfig;
use crate::{Bucket, Result, TokenBucket, TokenBucketAsync};

#[derive(Debug, Clone, Default)]
pub struct BucketOptions {
    config: BucketConfig,
}

impl BucketOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_config(config: BucketConfig) -> Self {
        Self { config }
    }

    pub fn validate(self) -> Result<Self> {
        self.config.validate()?;
        Ok(self)
    }

    /// Build a blocking bucket, starting it if `autostart` is set.
    pub fn spawn_sync(&self) -> Result<TokenBucket> {
        self.config.validate()?;
        let bucket = TokenBucket::new();
        self.apply(&bucket);
        if self.autostarts() {
            bucket.start(self.config.interval())?;
        }
        Ok(bucket)
    }

    /// Build a tokio bucket, starting it on the current runtime
    /// if `autostart` is set.
    pub async fn spawn_async(&self) -> Result<TokenBucketAsync> {
        self.config.validate()?;
        let bucket = TokenBucketAsync::new();
        self.apply(&bucket);
        if self.autostarts() {
            bucket.start(self.config.interval()).await?;
        }
        Ok(bucket)
    }

    fn apply<B: Bucket>(&self, bucket: &B) {
        bucket.set_max(self.config.capacity);
        if let Some(count) = self.config.count {
            bucket.set_count(count);
        }
    }

    fn autostarts(&self) -> bool {
        self.config.autostart.unwrap_or(false)
    }

    /// Maximum number of tokens.
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Tokens available right after the bucket is built.
    /// Not clamped to capacity.
    pub fn count(mut self, count: u64) -> Self {
        self.config.count = Some(count);
        self
    }

    /// Time between two refills. Truncated to whole milliseconds.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn autostart(mut self, autostart: bool) -> Self {
        self.config.autostart = Some(autostart);
        self
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;

    #[test]
    fn test_spawn_sync_applies_config() {
        let bucket = BucketOptions::new()
            .capacity(4)
            .count(2)
            .interval(Duration::from_millis(10))
            .spawn_sync()
            .unwrap();
        assert_eq!(bucket.capacity(), 4);
        assert_eq!(bucket.count(), 2);
        assert!(!bucket.is_running());
    }

    #[test]
    fn test_spawn_sync_autostart() {
        let bucket = BucketOptions::new()
            .capacity(1)
            .interval(Duration::from_millis(1))
            .autostart(true)
            .spawn_sync()
            .unwrap();
        assert!(bucket.is_running());
        bucket.stop().unwrap();
    }

    #[test]
    fn test_sub_millisecond_interval_rejected() {
        let res = BucketOptions::new()
            .capacity(1)
            .interval(Duration::from_micros(10))
            .validate();
        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_spawn_async_autostart() {
        let bucket = BucketOptions::new()
            .capacity(2)
            .count(1)
            .interval(Duration::from_millis(1))
            .autostart(true)
            .spawn_async()
            .await
            .unwrap();
        assert!(bucket.is_running());
        assert!(bucket.get());
        bucket.stop().await.unwrap();
    }
}
