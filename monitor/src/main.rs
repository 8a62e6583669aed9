mod api;
mod broadcast;
mod collector;
mod config;
mod entity;
mod error;
mod net;
mod sampler;
mod store;

use crate::api::{ApiServer, LiveSpeeds};
use crate::broadcast::SnapshotBroadcaster;
use crate::collector::UsageCollector;
use crate::config::MonitorConfig;
use crate::net::SystemCounterSource;
use crate::sampler::RateSampler;
use crate::store::UsageStore;
use anyhow::Result;
use clap::Parser;
use common::fmt::format_speed;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "netmon-monitor")]
#[command(about = "NetMon Monitor - Network usage monitoring daemon", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "monitor.toml")]
    config: String,

    /// Interface to monitor, or "All" for every interface
    #[arg(long, env = "MONITOR_INTERFACE")]
    interface: Option<String>,

    /// API listen address
    #[arg(long, env = "MONITOR_API_ADDR")]
    api_addr: Option<String>,

    /// SQLite database path
    #[arg(long, env = "MONITOR_DATABASE_PATH")]
    database_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration, writing the defaults on first run
    let first_run = !Path::new(&args.config).exists();
    let mut cfg = MonitorConfig::load(&args.config)?;
    if first_run {
        cfg.save(&args.config)?;
    }

    // Override with command line arguments
    if let Some(interface) = args.interface {
        cfg.interface = interface;
    }
    if let Some(api_addr) = args.api_addr {
        cfg.api_addr = api_addr;
    }
    if let Some(database_path) = args.database_path {
        cfg.database_path = database_path;
    }

    let _log_guard = common::init_tracing(cfg.log_dir.as_deref(), "monitor.log", &cfg.log_level);

    info!("Starting monitor with configuration: {:?}", cfg);
    if first_run {
        info!("Created default configuration at {}", args.config);
    }

    let cfg = Arc::new(cfg);

    let store = Arc::new(UsageStore::new(&cfg.database_path).await?);
    let broadcaster = Arc::new(SnapshotBroadcaster::new());
    let live = Arc::new(LiveSpeeds::new());

    // The baseline counter read happens here, so an unreadable counter
    // source aborts startup instead of producing silent zeroes.
    let source = Box::new(SystemCounterSource::new(cfg.interface.clone()));
    let sampler = RateSampler::new(source)?;

    let collector = UsageCollector::new(sampler, store.clone(), broadcaster.clone()).await?;
    let collector_handle = collector.start();

    // Feed the live endpoint from the broadcast stream
    let (live_subscriber, mut snapshots) = broadcaster.subscribe();
    let live_task = {
        let live = live.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                debug!(
                    "Live speeds: up {} down {}",
                    format_speed(snapshot.up_speed as f64),
                    format_speed(snapshot.down_speed as f64)
                );
                live.update(snapshot);
            }
        })
    };

    // Start API server
    let api_server = {
        let cfg = cfg.clone();
        let store = store.clone();
        let live = live.clone();
        tokio::spawn(async move {
            if let Err(e) = ApiServer::new(cfg, store, live).run().await {
                error!("API server error: {}", e);
            }
        })
    };

    info!("Monitor started successfully");
    info!("Monitoring interface: {}", cfg.interface);
    info!("API server listening on: {}", cfg.api_addr);

    tokio::select! {
        _ = api_server => {
            error!("API server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down monitor");
    collector_handle.stop().await;
    broadcaster.unsubscribe(live_subscriber);
    let _ = live_task.await;

    Ok(())
}
