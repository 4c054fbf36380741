use log::*;
use std::time::{Duration, Instant};
use tokenbucket::{config::BucketConfig, options::BucketOptions, Bucket};

// how often an idle caller polls the bucket
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize env logger
    let _ = env_logger::builder().is_test(false).try_init();

    /* ############ configurations begin ############ */
    // first argument is a JSON config file, environment otherwise
    let config = match std::env::args().nth(1) {
        Some(path) => BucketConfig::from_file(path)?,
        None => BucketConfig::from_env()?,
    };
    // number of operations to pace
    let ops: u64 = std::env::var("THROTTLE_OPS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    /* ############ configurations end ############ */

    let interval = config.interval();
    let bucket = BucketOptions::from_config(config).validate()?.spawn_sync()?;
    if !can_admit(&bucket, ops) {
        warn!(
            "Bucket with capacity 0 and {} tokens can never admit {ops} operations, exiting",
            bucket.count()
        );
        if bucket.is_running() {
            bucket.stop()?;
        }
        return Ok(());
    }
    if !bucket.is_running() {
        bucket.start(interval)?;
    }
    info!(
        "Pacing {ops} operations, capacity {}, one token every {interval:?}",
        bucket.capacity()
    );

    let begin = Instant::now();
    let mut done = 0;
    while done < ops {
        if bucket.get() {
            done += 1;
            info!("Operation {done} admitted after {:?}", begin.elapsed());
        } else {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    bucket.stop()?;
    info!("Finished {ops} operations in {:?}", begin.elapsed());
    Ok(())
}

// Without capacity nothing is ever refilled, so only the initial tokens count.
fn can_admit<B: Bucket>(bucket: &B, ops: u64) -> bool {
    bucket.capacity() > 0 || bucket.count() >= ops
}
