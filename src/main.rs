//! RECAL — Adaptive Ensemble Recalibration Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores weight state from the outcome store, and runs the periodic
//! fetch→analyze→adjust→publish loop with graceful shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use recal::config;
use recal::dashboard;
use recal::dashboard::routes::DashboardState;
use recal::engine::orchestrator::{Orchestrator, TickOutcome};
use recal::registry::WeightRegistry;
use recal::store::memory::MemoryStore;
use recal::store::persistent::PersistentStore;
use recal::store::Storage;

const BANNER: &str = r#"
 ____  _____ ____    _    _
|  _ \| ____/ ___|  / \  | |
| |_) |  _|| |     / _ \ | |
|  _ <| |__| |___ / ___ \| |___
|_| \_\_____\____/_/   \_\_____|

  Recalibrated Ensemble Confidence & Algorithm-weight Loop
  v0.1.0 — Adaptive Ensemble Engine
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;
    cfg.validate().context("invalid configuration")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        tick_interval_secs = cfg.engine.tick_interval_secs,
        algorithms = cfg.engine.algorithms.len(),
        backend = %cfg.storage.backend,
        "RECAL starting up"
    );

    // -- Storage backend -------------------------------------------------

    let storage: Arc<dyn Storage> = match cfg.storage.backend.as_str() {
        "sqlite" => {
            let path = cfg
                .storage
                .path
                .as_deref()
                .unwrap_or("recal.db");
            let store = PersistentStore::open(path)
                .await
                .with_context(|| format!("failed to open outcome store at {path}"))?;
            Arc::new(store)
        }
        _ => Arc::new(MemoryStore::new()),
    };
    info!(store = storage.name(), "Outcome store ready");

    // -- Restore or create weight state ----------------------------------

    let restored = match storage.load_weights().await {
        Ok(weights) => {
            if weights.is_empty() {
                info!("No persisted weights, starting from the neutral split");
            } else {
                info!(count = weights.len(), "Restored weight state");
            }
            weights
        }
        Err(e) => {
            warn!(error = %e, "Could not restore weights, starting neutral");
            Vec::new()
        }
    };
    let registry = Arc::new(WeightRegistry::new(cfg.engine.algorithms.clone(), restored));

    // -- Orchestrator and dashboard --------------------------------------

    let orchestrator = Arc::new(Orchestrator::new(
        storage,
        registry.clone(),
        cfg.engine.clone(),
        cfg.calibration.clone(),
    ));

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(registry.clone(), orchestrator.clone()));
        dashboard::spawn_dashboard(state, cfg.dashboard.port)?;
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.engine.tick_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.engine.tick_interval_secs,
        "Entering recalibration loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match orchestrator.run_tick().await {
                    Ok(TickOutcome::Completed(snapshot)) => {
                        info!(%snapshot, "Tick published");
                    }
                    Ok(TickOutcome::Skipped) => {}
                    Err(e) => {
                        // Consumers keep reading the last published snapshot
                        error!(error = %e, "Tick failed — continuing to next");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        ticks_published = registry.version(),
        "RECAL shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recal=info"));

    let json_logging = std::env::var("RECAL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
