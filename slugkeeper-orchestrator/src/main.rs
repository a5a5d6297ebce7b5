use std::sync::Arc;

use clap::Parser;
use slugkeeper_orchestrator::provider_manager::ProviderManager;
use slugkeeper_orchestrator::settings;
use slugkeeper_orchestrator::{reconciliation_job, Reconciler, Settings, WebhookNotifier};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::try_parse() {
        Ok(settings) => settings,
        Err(e) => {
            let _ = e.print();
            std::process::exit(settings::parse_exit_code(&e));
        }
    };
    if let Err(e) = run(settings).await {
        tracing::error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let provider = ProviderManager::get_provider(&settings)?;
    let desired = Arc::new(settings.desired_state()?);

    tracing::info!("🚀 Slug keeper started (provider: {})", settings.provider);
    tracing::info!(
        "Configuration: slug={}, regions={}, image={}, desired_count={}, listing_policy={:?}",
        desired.slug,
        desired.joined_regions(),
        desired.image,
        desired.desired_count,
        settings.listing_policy
    );
    if let Some(prefix) = &desired.name_prefix {
        tracing::info!("Droplet name prefix: {}", prefix);
    }
    match &desired.webhook {
        Some(target) => tracing::info!(
            "Webhook notifications enabled: {} (format: {:?})",
            target.url,
            target.format
        ),
        None => tracing::info!(
            "Webhook notifications disabled. Set WEBHOOK_URL or pass --webhook-url to enable."
        ),
    }

    let notifier = Arc::new(WebhookNotifier::new(desired.webhook.clone())?);
    let reconciler = Arc::new(Reconciler::new(
        desired,
        provider,
        settings.listing_policy,
        notifier,
    ));

    reconciliation_job::run(reconciler, settings.interval()).await;
    Ok(())
}
