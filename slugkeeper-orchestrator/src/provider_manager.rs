use std::sync::Arc;

use slugkeeper_common::ConfigError;
#[cfg(feature = "provider-digitalocean")]
use slugkeeper_providers::digitalocean::DigitalOceanProvider;
#[cfg(feature = "provider-mock")]
use slugkeeper_providers::mock::MockProvider;
use slugkeeper_providers::CloudProvider;

use crate::settings::Settings;

pub struct ProviderManager;

impl ProviderManager {
    pub fn get_provider(settings: &Settings) -> anyhow::Result<Arc<dyn CloudProvider>> {
        match settings.provider.trim().to_lowercase().as_str() {
            #[cfg(feature = "provider-digitalocean")]
            "digitalocean" | "do" => {
                let token = settings.api_token()?;
                Ok(Arc::new(DigitalOceanProvider::new(&settings.api_url, token)?))
            }
            #[cfg(feature = "provider-mock")]
            "mock" => Ok(Arc::new(MockProvider::new())),
            // Add other providers here.
            other => Err(ConfigError::UnknownProvider(other.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn settings(provider: &str, token: Option<&str>) -> Settings {
        let mut argv = vec![
            "slugkeeper",
            "--slug",
            "s",
            "--image",
            "i",
            "--desired-count",
            "1",
            "--region",
            "tor1",
            "--provider",
            provider,
        ];
        if let Some(token) = token {
            argv.extend(["--api-token", token]);
        }
        crate::settings::tests::isolate_env();
        match Settings::try_parse_from(argv) {
            Ok(s) => s,
            Err(e) => panic!("parse failed: {}", e),
        }
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = ProviderManager::get_provider(&settings("ovh", Some("t"))).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownProvider(name)) if name == "ovh"
        ));
    }

    #[cfg(feature = "provider-digitalocean")]
    #[test]
    fn digitalocean_requires_a_token() {
        let err = ProviderManager::get_provider(&settings("digitalocean", Some(" "))).err().unwrap();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::MissingCredential)));
        assert!(ProviderManager::get_provider(&settings("DigitalOcean", Some("t"))).is_ok());
    }

    #[cfg(feature = "provider-mock")]
    #[test]
    fn mock_needs_no_token() {
        assert!(ProviderManager::get_provider(&settings("mock", Some(" "))).is_ok());
    }
}
