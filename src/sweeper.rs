use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::scheduler::Scheduler;

/// One sweep: complete approved bookings that have ended, expire stale
/// waitlist entries. Time comes from the scheduler's clock. Returns
/// `(completed, expired)`.
pub async fn sweep_once(engine: &Engine, scheduler: &Scheduler) -> (usize, usize) {
    let now = scheduler.now();
    let mut completed = 0;
    for (booking_id, resource_id) in engine.collect_elapsed_approved(now).await {
        match scheduler.complete(engine, booking_id).await {
            Ok(_) => completed += 1,
            // A concurrent cancel may have beaten us to it.
            Err(e) => debug!("sweeper skip {booking_id} on {resource_id}: {e}"),
        }
    }

    let mut expired = 0;
    for resource in engine.list_resources().await {
        match scheduler.expire_waitlist(engine, resource.id).await {
            Ok(n) => expired += n,
            Err(e) => warn!("waitlist expiry failed for {}: {e}", resource.id),
        }
    }
    (completed, expired)
}

/// Background task that periodically runs [`sweep_once`].
pub async fn run_sweeper(engine: Arc<Engine>, scheduler: Scheduler, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let (completed, expired) = sweep_once(&engine, &scheduler).await;
        if completed + expired > 0 {
            info!("sweep: completed {completed} bookings, expired {expired} waitlist entries");
        }
    }
}

/// Background task that compacts the booking log once enough appends pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        if engine.wal_appends_since_compact().await < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!("compacted booking log"),
            Err(e) => warn!("booking log compaction failed: {e}"),
        }
    }
}
