use std::time::Duration;

use clap::error::ErrorKind;
use clap::Parser;
use reqwest::Url;
use slugkeeper_common::{parse_list, ConfigError, DesiredState, WebhookFormat, WebhookTarget};

use crate::inventory::ListingPolicy;

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/v2";
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Process exit code for any invalid or incomplete configuration.
pub const CONFIG_EXIT_CODE: i32 = 1;

/// Host of chat webhooks that expect a `{ "text": ... }` body.
const SLACK_WEBHOOK_HOST: &str = "hooks.slack.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WebhookFormatArg {
    /// Chat format for Slack webhook hosts, raw JSON otherwise.
    #[default]
    Auto,
    Json,
    Slack,
}

/// Command line and environment surface. Flags win over environment variables;
/// a `.env` file is loaded before parsing.
#[derive(Parser, Clone)]
#[command(
    name = "slugkeeper",
    version,
    about = "Keeps a target number of droplets of one size running in each region"
)]
pub struct Settings {
    /// Droplet size slug (e.g. gpu-h100x8-640gb)
    #[arg(long, env = "SLUG")]
    pub slug: String,

    /// Region(s) to deploy droplets in (repeatable or comma-separated, e.g. tor1,nyc2)
    #[arg(long = "region", env = "REGION", value_delimiter = ',', required = true, num_args = 1..)]
    pub regions: Vec<String>,

    /// Image to use for the droplets (e.g. gpu-h100x8-base)
    #[arg(long, env = "IMAGE")]
    pub image: String,

    /// Desired number of droplets to maintain per region
    #[arg(long, alias = "desired_count", env = "DESIRED_COUNT")]
    pub desired_count: u32,

    /// Comma-separated list of SSH key IDs or fingerprints to add to new droplets
    #[arg(long, alias = "ssh_keys", env = "SSH_KEYS")]
    pub ssh_keys: Option<String>,

    /// Webhook URL notified when droplets are created
    #[arg(long, alias = "webhook_url", env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Webhook body format
    #[arg(long, env = "WEBHOOK_FORMAT", value_enum, default_value_t = WebhookFormatArg::Auto)]
    pub webhook_format: WebhookFormatArg,

    /// Droplet name prefix (defaults to the slug)
    #[arg(long, alias = "name_prefix", env = "NAME_PREFIX")]
    pub name_prefix: Option<String>,

    /// Milliseconds between reconciliation passes
    #[arg(
        long,
        env = "RECONCILE_INTERVAL_MS",
        default_value_t = DEFAULT_INTERVAL_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,

    /// How a failed inventory page is treated
    #[arg(long, env = "LISTING_POLICY", value_enum, default_value_t = ListingPolicy::FailOpen)]
    pub listing_policy: ListingPolicy,

    /// DigitalOcean API base URL
    #[arg(long, env = "DO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Provider backend (digitalocean or mock)
    #[arg(long, env = "PROVIDER", default_value = "digitalocean")]
    pub provider: String,

    #[arg(long, env = "DO_API_TOKEN", hide = true, hide_env_values = true)]
    pub api_token: Option<String>,
}

/// Exit code for a failed parse: `--help` and `--version` are successful exits,
/// every other parse error is a configuration error.
pub fn parse_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => CONFIG_EXIT_CODE,
    }
}

impl Settings {
    /// Bearer token for the provider API; absent or blank is fatal.
    pub fn api_token(&self) -> Result<&str, ConfigError> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingCredential)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Resolves the webhook body format once, from the configured URL.
    pub fn webhook_target(&self) -> Result<Option<WebhookTarget>, ConfigError> {
        let Some(raw) = self.webhook_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidWebhookUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidWebhookUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let format = match self.webhook_format {
            WebhookFormatArg::Json => WebhookFormat::Json,
            WebhookFormatArg::Slack => WebhookFormat::Slack,
            WebhookFormatArg::Auto if url.host_str() == Some(SLACK_WEBHOOK_HOST) => WebhookFormat::Slack,
            WebhookFormatArg::Auto => WebhookFormat::Json,
        };
        Ok(WebhookTarget::new(Some(raw), format))
    }

    pub fn desired_state(&self) -> Result<DesiredState, ConfigError> {
        let ssh_keys = self
            .ssh_keys
            .as_deref()
            .map(|raw| parse_list(&[raw]))
            .unwrap_or_default();

        Ok(
            DesiredState::new(&self.slug, &self.image, parse_list(&self.regions), self.desired_count)?
                .with_ssh_keys(ssh_keys)
                .with_name_prefix(self.name_prefix.clone())
                .with_webhook(self.webhook_target()?),
        )
    }
}
