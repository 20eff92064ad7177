//! `bou-responder` entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: JSON logs plus optional OTLP span export
//!    (see [`telemetry`]).
//! 2. **Load configuration**: read `config.yml` (or `$BOU_CONFIG`) and
//!    validate it (see [`config`]).
//! 3. **Construct infrastructure**: the status client and the reply webhook,
//!    injected into the [`listener::EventBridge`].
//! 4. **Run until stopped**: Ctrl-C or SIGTERM shuts the bridge down cleanly;
//!    any fatal error exits with the status from [`exit`].

mod config;
mod exit;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use listener::{BrokerSettings, EventBridge};
use occupancy::StatusClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use webhook::WebhookResponder;

use crate::exit::FatalError;

#[tokio::main]
async fn main() -> ExitCode {
    let telemetry = match telemetry::init() {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {e:#}");
            return ExitCode::from(exit::SETUP_FAILURE);
        }
    };

    let status = match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            error!(error = %e, exit_code = code, "bou-responder stopped");
            ExitCode::from(code)
        }
    };

    telemetry.shutdown();
    status
}

async fn run() -> Result<(), FatalError> {
    let path = config::config_path();
    let config = config::load(&path).await?;
    info!(
        path = %path.display(),
        topic = %config.subscription_topic(),
        endpoint = %config.status_endpoint(),
        "configuration loaded"
    );

    let mut settings = BrokerSettings::default();
    if let Some(pem) = config::load_broker_ca().await? {
        info!("using configured broker CA bundle");
        settings = settings.with_ca_certificate(pem);
    }

    // One connection pool serves both the status queries and the replies.
    let http = reqwest::Client::new();
    let bridge = EventBridge::new(
        config,
        settings,
        Arc::new(StatusClient::with_client(http.clone())),
        Arc::new(WebhookResponder::with_client(http)),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            shutdown.cancel();
        }
    });

    bridge.run(shutdown).await?;
    info!("bou-responder stopped cleanly");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
