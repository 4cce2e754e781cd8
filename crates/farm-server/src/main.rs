//! Farm server entry point.
//!
//! ```text
//! main()
//!  └─ load_config()
//!  └─ DbQueue::new(SpoolConnection, MonitorAlarm)
//!       ├─ queue worker       (Tokio task)
//!       └─ alarm consumer     (Tokio task)
//!  └─ stdin receive loop    (Tokio task)
//!       └─ FrameDecoder ─► Dispatcher ─► replies on stdout
//! ```
//!
//! Frames are read from standard input until the network transport exists.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use farm_server::config::{self, ServerConfig};
use farm_server::db::DbQueue;
use farm_server::dispatch::Dispatcher;
use farm_server::monitor::MonitorAlarm;
use farm_server::spool::SpoolConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config is read before logging starts so its level can be the fallback.
    let (cfg, config_warning) = match config::load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (ServerConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    // Logs go to stderr: stdout carries reply frames.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.server.log_level)),
        )
        .init();

    if let Some(e) = config_warning {
        warn!("could not load config, using defaults: {e}");
    }
    info!("farm server starting");

    // ── Monitor alarms ────────────────────────────────────────────────────────
    let (alarm, mut alarms) = MonitorAlarm::new(cfg.monitor.alarm_capacity);
    tokio::spawn(async move {
        while let Some(mut msg) = alarms.recv().await {
            match msg.as_string() {
                Ok(text) => warn!(alarm = %text, "monitor alarm"),
                Err(e) => warn!(error = %e, "unreadable monitor alarm"),
            }
        }
    });

    // ── Database queue ────────────────────────────────────────────────────────
    let spool = SpoolConnection::new(&cfg.database.spool_path);
    let (db, worker) = DbQueue::new(cfg.database.queue_config(), spool, Arc::new(alarm));
    let worker = tokio::spawn(worker.run());
    info!(
        queue = %cfg.database.queue_name,
        spool = %cfg.database.spool_path.display(),
        "database queue started"
    );

    // ── Receive loop ──────────────────────────────────────────────────────────
    let dispatcher = Dispatcher::new(db.clone());
    tokio::spawn(async move {
        let served = dispatcher
            .serve(tokio::io::stdin(), tokio::io::stdout())
            .await;
        if let Err(e) = served {
            warn!(error = %e, "stdin receive loop stopped");
        }
    });

    info!("farm server ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    db.shutdown(cfg.database.shutdown);
    let report = worker.await.context("queue worker panicked")?;
    info!(
        processed = report.processed,
        dropped = report.dropped,
        discarded = report.discarded,
        "farm server stopped"
    );
    Ok(())
}
