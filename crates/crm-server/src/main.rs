//! CRM Server: application entry point.

use std::sync::Arc;

use anyhow::Context;
use crm_db::{DbManager, run_migrations};
use crm_leads::{LogNotifier, Notifier, SmtpNotifier};
use crm_server::Crm;
use crm_server::config::{AppConfig, NotifierConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    let default_directive = config.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .json()
        .init();

    info!("Starting CRM server...");

    let manager = DbManager::connect(&config.database)
        .await
        .context("failed to connect to SurrealDB")?;
    run_migrations(manager.client())
        .await
        .context("failed to run migrations")?;

    match &config.notifier {
        NotifierConfig::Log => run(&manager, &config, Arc::new(LogNotifier)).await,
        NotifierConfig::Smtp(smtp) => {
            let notifier = SmtpNotifier::new(smtp).context("invalid SMTP configuration")?;
            run(&manager, &config, Arc::new(notifier)).await
        }
    }
}

async fn run<N: Notifier + 'static>(
    manager: &DbManager,
    config: &AppConfig,
    notifier: Arc<N>,
) -> anyhow::Result<()> {
    let _crm = Crm::new(
        manager.client().clone(),
        config.password_pepper.clone(),
        notifier,
        config.leads.clone(),
    );

    info!("CRM services ready");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("CRM server stopped.");
    Ok(())
}
