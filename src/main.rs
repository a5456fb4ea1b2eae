use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use famiglio::config::Config;
use famiglio::github::{GitHubApp, RetryConfig};
use famiglio::handlers::register_default_handlers;
use famiglio::server::{AppState, serve};
use famiglio::webhooks::{DEFAULT_QUEUE_CAPACITY, WebhookRouter, spawn_dispatcher};
use famiglio::{Result, error, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    // Configuration is validated before logging is set up, so its failures go
    // straight to stderr.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("famiglio: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init(config.log_level, config.environment) {
        eprintln!("famiglio: failed to initialise logging: {e}");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error::report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    info!(
        environment = ?config.environment,
        app_id = %config.github.app_id,
        api_url = %config.github.api_url,
        "Starting famiglio"
    );

    let app = GitHubApp::from_config(&config.github);
    let mut webhooks = WebhookRouter::new();
    register_default_handlers(&mut webhooks, app, RetryConfig::DEFAULT);

    let shutdown = CancellationToken::new();
    let (queue, dispatcher) = spawn_dispatcher(webhooks, DEFAULT_QUEUE_CAPACITY, shutdown.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        famiglio::Error::internal("Failed to bind HTTP listener")
            .with_detail("port", config.port)
            .with_source(e)
    })?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let state = AppState::new(config.github.webhook_secret.into_bytes(), queue);
    let served = serve(listener, state, shutdown.clone()).await;

    // The server may have stopped on its own; stop the dispatcher either way.
    shutdown.cancel();
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "Dispatcher task did not complete");
    }

    served
}
