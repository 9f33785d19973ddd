use std::net::SocketAddr;

// ── Scheduler decisions ─────────────────────────────────────────

/// Counter: bookings admitted. Labels: status (approved | pending).
pub const BOOKINGS_ADMITTED_TOTAL: &str = "campusbook_bookings_admitted_total";

/// Counter: requests refused for overlap. Labels: phase (admission | approval | store).
pub const CONFLICTS_TOTAL: &str = "campusbook_conflicts_total";

/// Counter: committed status transitions. Labels: to.
pub const TRANSITIONS_TOTAL: &str = "campusbook_transitions_total";

/// Counter: waitlist entries flagged after a slot was freed.
pub const WAITLIST_NOTIFIED_TOTAL: &str = "campusbook_waitlist_notified_total";

// ── Booking log ─────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "campusbook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "campusbook_wal_flush_batch_size";

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call more than once;
/// later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
