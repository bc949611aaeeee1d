// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Background loops.
//!
//! The idle watchdog and the device presence loop run as tokio tasks until
//! the shutdown channel flips. Each tick runs on the blocking pool because
//! it may open or close a device or write a file; a panicking tick is logged
//! and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use super::Orchestrator;

/// Run both loops until `shutdown` becomes `true` (or its sender is dropped),
/// then release the device and write any open recording.
pub async fn run(orchestrator: Arc<Orchestrator>, shutdown: watch::Receiver<bool>) {
    info!("[SYS] Starting device monitor");

    let watchdog = spawn_watchdog(orchestrator.clone(), shutdown.clone());
    let presence = spawn_presence(orchestrator.clone(), shutdown);

    for (name, handle) in [("watchdog", watchdog), ("presence", presence)] {
        if let Err(e) = handle.await {
            error!("[ERR] {} loop ended abnormally: {}", name, e);
        }
    }

    let closing = orchestrator.clone();
    if let Err(e) = task::spawn_blocking(move || closing.shutdown()).await {
        error!("[ERR] Shutdown: {}", e);
    }
    info!("[SYS] Exited");
}

fn spawn_watchdog(orchestrator: Arc<Orchestrator>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(orchestrator.watchdog_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    let o = orchestrator.clone();
                    if let Err(e) = task::spawn_blocking(move || o.watchdog_tick()).await {
                        error!("[ERR] Watchdog: {}", e);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

fn spawn_presence(orchestrator: Arc<Orchestrator>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while !*shutdown.borrow() {
            let o = orchestrator.clone();
            let delay: Duration = match task::spawn_blocking(move || o.presence_tick()).await {
                Ok(delay) => delay,
                Err(e) => {
                    error!("[ERR] Device monitor: {}", e);
                    orchestrator.retry_backoff()
                }
            };

            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }
    })
}
