//! Importer controller - copies external data into annotated PersistentVolumeClaims

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use importer_common::telemetry::{init_logging, TelemetryConfig};
use importer_controller::{error_policy, log_reconcile_result, reconcile, Cli, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&TelemetryConfig {
        format: cli.log_format,
    })?;

    let config = cli.importer_config();
    tracing::info!(
        image = %config.image,
        namespace = ?cli.namespace,
        "starting importer controller"
    );

    let client = Client::try_default().await?;
    let claims: Api<PersistentVolumeClaim> = match &cli.namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let controller = Controller::new(
        claims,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    );
    let ctx = Arc::new(Context::new(client, controller.store(), config));

    controller
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(log_reconcile_result)
        .await;

    tracing::info!("importer controller stopped");
    Ok(())
}
