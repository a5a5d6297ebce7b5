use crate::{CloudProvider, CreateInstanceRequest, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use slugkeeper_common::Instance;
use std::time::Duration;

pub struct DigitalOceanProvider {
    client: Client,
    base_url: String,
    token: String,
}

impl DigitalOceanProvider {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ProviderError> {
        // Default reqwest client has no overall timeout. If the API stalls, a pass can hang forever.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let token = token.into().trim().to_string();
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn droplets_url(&self) -> String {
        format!("{}/droplets", self.base_url)
    }
}

#[async_trait]
impl CloudProvider for DigitalOceanProvider {
    async fn list_instances(&self, page: u32, per_page: u32) -> Result<Vec<Instance>, ProviderError> {
        let url = self.droplets_url();
        tracing::debug!("[DigitalOcean API] GET {} page={} per_page={}", url, page, per_page);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                operation: "list_droplets",
                status: status.as_u16(),
                body,
            });
        }

        let json_resp: Value = resp.json().await?;
        let droplets = match json_resp.get("droplets") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let mut out = Vec::with_capacity(droplets.len());
        for droplet in droplets {
            match droplet_from_json(droplet, None) {
                Ok(instance) => out.push(instance),
                Err(e) => tracing::warn!("[DigitalOcean API] Skipping unreadable droplet: {}", e),
            }
        }
        Ok(out)
    }

    async fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, ProviderError> {
        let url = self.droplets_url();
        tracing::info!(
            "[DigitalOcean API] POST {} - Creating droplet: name={}, size={}, image={}, region={}",
            url,
            request.name,
            request.size,
            request.image,
            request.region
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                "[DigitalOcean API] POST {} failed: status={}, response={}",
                url,
                status.as_u16(),
                body
            );
            return Err(ProviderError::Status {
                operation: "create_droplet",
                status: status.as_u16(),
                body,
            });
        }

        let mut json_resp: Value = resp.json().await?;
        let droplet = json_resp
            .get_mut("droplet")
            .map(Value::take)
            .ok_or_else(|| ProviderError::Decode("no droplet in create response".to_string()))?;
        droplet_from_json(droplet, Some(&request.region))
    }
}

/// Map a droplet object onto `Instance`, keeping unknown fields as attributes.
///
/// The create response may not carry a resolved region yet; `fallback_region` fills it in.
fn droplet_from_json(value: Value, fallback_region: Option<&str>) -> Result<Instance, ProviderError> {
    let Value::Object(mut attributes) = value else {
        return Err(ProviderError::Decode("droplet is not an object".to_string()));
    };

    let id = attributes
        .remove("id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProviderError::Decode("droplet without numeric id".to_string()))?;
    let name = attributes
        .remove("name")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let size = attributes
        .remove("size_slug")
        .and_then(|v| v.as_str().map(str::to_string))
        .or_else(|| {
            attributes
                .get("size")
                .and_then(|s| s.get("slug"))
                .and_then(|s| s.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default();
    let region = match attributes.remove("region") {
        Some(Value::Object(r)) => r.get("slug").and_then(|s| s.as_str()).map(str::to_string),
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
    .or_else(|| fallback_region.map(str::to_string))
    .unwrap_or_default();

    Ok(Instance {
        id,
        name,
        region,
        size,
        attributes,
    })
}
