//! Subcommand implementations

use anyhow::{bail, Context, Result};
use opencrol_client::HttpClient;
use opencrol_config::OpenCtrolConfig;
use opencrol_coordinator::Coordinator;
use std::sync::Arc;
use tracing::{info, warn};

fn coordinator(config: &OpenCtrolConfig) -> Result<Coordinator> {
    let settings = config.client_settings()?;
    Ok(Coordinator::new(HttpClient::new(settings))
        .with_client_id(config.client_id().map(str::to_string))
        .with_update_interval(config.update_interval()))
}

pub async fn run(config: &OpenCtrolConfig) -> Result<()> {
    let coordinator = Arc::new(coordinator(config)?);
    let mut updates = coordinator.subscribe();

    info!("Starting OpenCtrol monitor for {}", coordinator.client().base_url());
    coordinator.spawn_polling();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    info!(
                        status = %snapshot.status,
                        monitors = snapshot.total_monitors(),
                        current_monitor = snapshot.current_monitor,
                        master_volume = snapshot.master_volume,
                        audio_apps = snapshot.audio_apps.len(),
                        audio_devices = snapshot.audio_devices.len(),
                        screen_capture = snapshot.screen_capture_active,
                        "Snapshot updated"
                    );
                }
            }
        }
    }

    info!("Shutting down...");
    coordinator.shutdown().await;
    Ok(())
}

pub async fn status(config: &OpenCtrolConfig) -> Result<()> {
    let coordinator = coordinator(config)?;
    let result = coordinator.refresh().await;
    coordinator.shutdown().await;

    let snapshot = result.context("refreshing agent state")?;
    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    Ok(())
}

pub async fn probe(config: &OpenCtrolConfig) -> Result<()> {
    let outcome = opencrol_client::probe(&config.client_settings()?).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_ready() {
        bail!("agent at {} is not ready", config.base_url()?);
    }
    Ok(())
}

pub async fn send(config: &OpenCtrolConfig, name: &str, args: serde_json::Value) -> Result<()> {
    let coordinator = coordinator(config)?;
    if let Err(err) = coordinator.refresh().await {
        warn!("Initial refresh failed: {}", err);
    }

    let sent = coordinator.send_named(name, args).await;
    coordinator.shutdown().await;

    if !sent {
        bail!("command {} failed", name);
    }
    info!("Command {} sent", name);
    Ok(())
}
