// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chordrec::midi::{print_sources, DeviceBackend, MidirBackend};
use chordrec::orchestrator::{self, Orchestrator};
use chordrec::RecorderConfig;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when no --config is given
const DEFAULT_CONFIG_FILE: &str = "chordrec.toml";

fn print_usage() {
    println!("CHORDREC - Hands-free MIDI recorder");
    println!();
    println!("Usage: chordrec [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>     Load settings from a TOML file (default: ./chordrec.toml if present)");
    println!("  --device <NAME>     Record from the first source whose name contains NAME");
    println!("  --dir <PATH>        Write recordings to PATH (default: ./recordings)");
    println!("  --list-sources      List available MIDI sources (inputs) and exit");
    println!("  --help              Show this help message");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=debug) to change log verbosity.");
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    device: Option<String>,
    dir: Option<PathBuf>,
    list_sources: bool,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config = Some(PathBuf::from(value));
            }
            "--device" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--device requires a name"))?;
                options.device = Some(value.clone());
            }
            "--dir" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--dir requires a directory path"))?;
                options.dir = Some(PathBuf::from(value));
            }
            "--list-sources" => options.list_sources = true,
            "--help" | "-h" => options.help = true,
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }

    Ok(options)
}

fn load_config(options: &CliOptions) -> Result<RecorderConfig> {
    let mut config = match &options.config {
        Some(path) => RecorderConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => RecorderConfig::load(DEFAULT_CONFIG_FILE)?,
        None => RecorderConfig::default(),
    };

    if let Some(device) = &options.device {
        config.device.name_filter = Some(device.clone());
    }
    if let Some(dir) = &options.dir {
        config.recording.directory = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("Could not listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if options.help {
        print_usage();
        return Ok(());
    }

    let backend: Arc<dyn DeviceBackend> = Arc::new(MidirBackend::default());
    if options.list_sources {
        print_sources(backend.as_ref());
        return Ok(());
    }

    let config = load_config(&options)?;
    print_sources(backend.as_ref());
    info!(
        "[SYS] Recording to {:?} (idle timeout {:?})",
        config.recording.directory,
        config.recording.idle_timeout()
    );

    let orchestrator = Orchestrator::with_backend(&config, backend);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(orchestrator::run(orchestrator, shutdown_rx));

    wait_for_signal().await;
    info!("[SYS] Signal received, shutting down");
    let _ = shutdown_tx.send(true);

    runner.await?;
    Ok(())
}
