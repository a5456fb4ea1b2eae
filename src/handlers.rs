//! Default webhook handlers.
//!
//! These cover the app lifecycle events every GitHub App receives: the `ping`
//! sent when a webhook is configured, and installation changes. Handlers must
//! tolerate redelivery; none of these keep state.

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::info;

use crate::github::{GitHubApp, RetryConfig, retry_with_backoff};
use crate::types::InstallationId;
use crate::webhooks::{WebhookDelivery, WebhookRouter};

#[derive(Debug, Deserialize)]
struct PingPayload {
    zen: Option<String>,
    hook_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Installation {
    id: InstallationId,
    account: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct InstallationPayload {
    installation: Installation,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct InstallationRepositoriesPayload {
    installation: Installation,
    #[serde(default)]
    repositories_added: Vec<Repository>,
    #[serde(default)]
    repositories_removed: Vec<Repository>,
}

fn parse<T: serde::de::DeserializeOwned>(delivery: &WebhookDelivery) -> anyhow::Result<T> {
    T::deserialize(&delivery.payload)
        .with_context(|| format!("malformed {} payload", delivery.name))
}

fn full_names(repos: &[Repository]) -> Vec<&str> {
    repos.iter().map(|r| r.full_name.as_str()).collect()
}

fn account_login(installation: &Installation) -> &str {
    installation
        .account
        .as_ref()
        .map_or("<unknown>", |a| a.login.as_str())
}

/// Registers the default handlers on `router`.
///
/// `retry` governs token issuance in the `installation.created` handler.
pub fn register_default_handlers(router: &mut WebhookRouter, app: GitHubApp, retry: RetryConfig) {
    router.on("ping", |delivery| async move { on_ping(&delivery) });

    router.on("installation.created", move |delivery| {
        let app = app.clone();
        async move { on_installation_created(&app, &delivery, retry).await }
    });

    router.on("installation.deleted", |delivery| async move {
        on_installation_deleted(&delivery)
    });

    router.on("installation_repositories", |delivery| async move {
        on_installation_repositories(&delivery)
    });
}

/// Logs the zen phrase GitHub sends when a webhook is first configured.
pub fn on_ping(delivery: &WebhookDelivery) -> anyhow::Result<()> {
    let ping: PingPayload = parse(delivery)?;
    info!(
        delivery_id = %delivery.id,
        zen = ping.zen.as_deref().unwrap_or_default(),
        hook_id = ping.hook_id,
        "Received ping"
    );
    Ok(())
}

/// Confirms a new installation is usable by issuing a token for it.
///
/// Transient issuance failures are retried per `retry`.
pub async fn on_installation_created(
    app: &GitHubApp,
    delivery: &WebhookDelivery,
    retry: RetryConfig,
) -> anyhow::Result<()> {
    let payload: InstallationPayload = parse(delivery)?;
    let installation = &payload.installation;

    let token = retry_with_backoff(retry, || app.installation_token(installation.id))
        .await
        .with_context(|| format!("installation {} is not usable", installation.id))?;

    info!(
        installation_id = %installation.id,
        account = account_login(installation),
        token_expires_at = %token.expires_at,
        "App installed"
    );
    Ok(())
}

pub fn on_installation_deleted(delivery: &WebhookDelivery) -> anyhow::Result<()> {
    let payload: InstallationPayload = parse(delivery)?;
    info!(
        installation_id = %payload.installation.id,
        account = account_login(&payload.installation),
        "App uninstalled"
    );
    Ok(())
}

pub fn on_installation_repositories(delivery: &WebhookDelivery) -> anyhow::Result<()> {
    let payload: InstallationRepositoriesPayload = parse(delivery)?;
    if payload.repositories_added.is_empty() && payload.repositories_removed.is_empty() {
        bail!("installation_repositories delivery lists no repositories");
    }

    info!(
        installation_id = %payload.installation.id,
        action = delivery.action().unwrap_or_default(),
        added = ?full_names(&payload.repositories_added),
        removed = ?full_names(&payload.repositories_removed),
        "Installation repositories changed"
    );
    Ok(())
}
