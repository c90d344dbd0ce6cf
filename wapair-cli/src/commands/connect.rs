//! Create and pair a gateway connection

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use wapair_core::{
    BroadcastNotifier, HttpGateway, HttpStatusRecorder, LifecycleEvent, LifecycleManager,
    PairingArtifact, SessionId,
};

use crate::config::ConfigLoader;

/// Connect arguments
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Instance name for the new connection
    #[arg(long)]
    pub name: String,

    /// Gateway address, instead of a configured host
    #[arg(long, conflicts_with = "host_index")]
    pub host: Option<String>,

    /// Index into the configured hosts (see `wapair hosts`)
    #[arg(long)]
    pub host_index: Option<usize>,

    /// Write the QR code PNG to this file instead of printing the payload
    #[arg(long)]
    pub qr_out: Option<PathBuf>,
}

/// Run connect command
pub async fn run(args: ConnectArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let endpoint = resolve_host(&args, &config.gateway.hosts)?;

    let notifier = Arc::new(BroadcastNotifier::default());
    let mut events = notifier.subscribe();
    let mut builder = LifecycleManager::builder(Arc::new(HttpGateway::new(&config.gateway)?))
        .sink(notifier)
        .poll_config(config.polling.clone());
    let recording = config.record.endpoint.is_some();
    if let Some(record_endpoint) = &config.record.endpoint {
        builder = builder.recorder(Arc::new(HttpStatusRecorder::new(
            record_endpoint.clone(),
            &config.gateway,
        )?));
    }
    let manager = builder.build();

    let (id, artifact) = manager.connect(&args.name, &endpoint).await?;
    info!(session_id = %id, gateway = %endpoint, "Connection created");

    present_artifact(&artifact, args.qr_out.as_deref())?;
    println!("Waiting for the QR code to be scanned... (Ctrl+C to cancel)");

    let outcome = tokio::select! {
        outcome = wait_for_outcome(&mut events, id, recording) => outcome,
        _ = tokio::signal::ctrl_c() => {
            manager.cancel(id).await?;
            println!("Connection {} cancelled", id);
            return Ok(());
        }
    };

    manager.shutdown().await;
    outcome
}

/// Pick the gateway endpoint from the flags and configured hosts
fn resolve_host(args: &ConnectArgs, hosts: &[String]) -> Result<String> {
    if let Some(host) = &args.host {
        return Ok(host.clone());
    }

    match args.host_index {
        Some(index) => hosts.get(index).cloned().ok_or_else(|| {
            anyhow!(
                "host index {} out of range ({} hosts configured)",
                index,
                hosts.len()
            )
        }),
        None => hosts
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("no gateway hosts configured, pass --host")),
    }
}

fn present_artifact(artifact: &PairingArtifact, qr_out: Option<&Path>) -> Result<()> {
    match qr_out {
        Some(path) => {
            let png = artifact
                .decode_image()
                .context("pairing artifact is not a base64 image")?;
            std::fs::write(path, png)
                .with_context(|| format!("failed to write QR code to {}", path.display()))?;
            println!("QR code written to {}", path.display());
        }
        None => {
            println!("Pairing artifact:");
            println!("{}", artifact.as_str());
        }
    }
    Ok(())
}

/// Wait until the connection is authenticated (and recorded) or fails
async fn wait_for_outcome(
    events: &mut broadcast::Receiver<LifecycleEvent>,
    id: SessionId,
    recording: bool,
) -> Result<()> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed lifecycle events");
                continue;
            }
            Err(RecvError::Closed) => {
                bail!("lifecycle events stopped before connection {} finished", id)
            }
        };
        if event.session_id() != id {
            continue;
        }

        match &event {
            LifecycleEvent::Authenticated { .. } => {
                println!("{}", event.message());
                if !recording {
                    return Ok(());
                }
            }
            LifecycleEvent::Recorded { .. } => return Ok(()),
            LifecycleEvent::RecordFailed { .. } => {
                eprintln!("Warning: {}", event.message());
                return Ok(());
            }
            LifecycleEvent::Failed { .. } | LifecycleEvent::Cancelled { .. } => {
                bail!("{}", event.message())
            }
            _ => debug!(event = %event.message(), "Lifecycle event"),
        }
    }
}
