use async_trait::async_trait;
use serde::Serialize;
use slugkeeper_common::{DesiredState, Instance};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{operation} failed: status={status} body={body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// HTTP status of the failed call, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::Transport(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Decode(_) => None,
        }
    }
}

/// Body of a droplet creation request.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    /// Tagged with the size slug for easier identification.
    pub tags: Vec<String>,
    pub ssh_keys: Vec<String>,
}

impl CreateInstanceRequest {
    pub fn new(desired: &DesiredState, region: &str, name: String) -> Self {
        Self {
            name,
            region: region.to_string(),
            size: desired.slug.clone(),
            image: desired.image.clone(),
            tags: vec![desired.slug.clone()],
            ssh_keys: desired.ssh_keys.clone(),
        }
    }
}

#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// One page (1-based) of every instance visible to the account.
    async fn list_instances(&self, page: u32, per_page: u32) -> Result<Vec<Instance>, ProviderError>;

    async fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, ProviderError>;
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "digitalocean")]
pub mod digitalocean;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_tags_with_slug() {
        let desired = DesiredState::new("gpu-h100x8", "gpu-h100x8-base", vec!["tor1".into()], 2)
            .unwrap()
            .with_ssh_keys(vec!["123".into(), "ab:cd".into()]);
        let req = CreateInstanceRequest::new(&desired, "tor1", "gpu-h100x8-tor1-1".into());
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "name": "gpu-h100x8-tor1-1",
                "region": "tor1",
                "size": "gpu-h100x8",
                "image": "gpu-h100x8-base",
                "tags": ["gpu-h100x8"],
                "ssh_keys": ["123", "ab:cd"],
            })
        );
    }

    #[test]
    fn status_is_exposed_for_http_failures() {
        let e = ProviderError::Status {
            operation: "create_droplet",
            status: 422,
            body: "{}".into(),
        };
        assert_eq!(e.status(), Some(422));
        assert_eq!(ProviderError::Decode("x".into()).status(), None);
    }
}
