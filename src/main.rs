use std::sync::Arc;

use tracing::info;

use campusbook::config::Config;
use campusbook::engine::Engine;
use campusbook::scheduler::Scheduler;
use campusbook::sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    campusbook::observability::init_logging();

    let config = Config::from_env();
    campusbook::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let engine = Arc::new(Engine::new(config.wal_path())?);
    let scheduler = Scheduler::new(config.conflict_scope);

    info!("campusbook started");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  resources: {}", engine.list_resources().await.len());
    info!("  conflict scope: {:?}", config.conflict_scope);
    info!("  sweep interval: {:?}", config.sweep_interval);

    let sweep = tokio::spawn(sweeper::run_sweeper(
        engine.clone(),
        scheduler,
        config.sweep_interval,
    ));
    let compact = tokio::spawn(sweeper::run_compactor(engine.clone(), config.compact_threshold));

    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    sweep.abort();
    compact.abort();
    info!("campusbook stopped");
    Ok(())
}
