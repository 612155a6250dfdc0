//! Truco FDP server binary.
//!
//! Restores the snapshot, opens the fixed room set, and serves the
//! HTTP/WebSocket surface until terminated. Ctrl-C persists a final
//! snapshot before exit.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use truco_fdp::config::Config;
use truco_fdp::dispatch::World;
use truco_fdp::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    truco_fdp::log();
    let world = World::new(config)?;
    snapshots(&world);
    sweeps(&world);
    shutdown(&world);
    Server::run(world).await?;
    Ok(())
}

/// Periodic snapshot writes; failures are logged and retried on the
/// next interval.
fn snapshots(world: &Arc<World>) {
    let world = Arc::clone(world);
    let every = Duration::from_millis(world.config().snapshot_interval_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = world.persist("interval").await {
                log::warn!("snapshot failed: {}", e);
            }
        }
    });
}

/// Periodic session-expiry sweep across all rooms.
fn sweeps(world: &Arc<World>) {
    let world = Arc::clone(world);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(truco_fdp::SESSION_SWEEP_MS));
        interval.tick().await;
        loop {
            interval.tick().await;
            world.sweep_all().await;
        }
    });
}

/// Persist a final snapshot and exit on ctrl-c.
fn shutdown(world: &Arc<World>) {
    let world = Arc::clone(world);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("ctrl-c handler");
        println!();
        log::warn!("termination requested, persisting snapshot");
        if let Err(e) = world.persist("shutdown").await {
            log::error!("shutdown snapshot failed: {}", e);
        }
        std::process::exit(0);
    });
}
