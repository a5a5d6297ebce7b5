use serde::{Deserialize, Serialize};

pub mod events;
pub mod settings;

pub use events::{EventConfiguration, NotificationEvent};
pub use settings::{parse_list, ConfigError, WebhookFormat, WebhookTarget};

// --- Provider entities ---

/// A droplet as reported by the provider.
///
/// Only the fields the reconciler filters on are typed; everything else the provider
/// returned is kept in `attributes` so webhook payloads carry the full object.
/// The provider's nested region object is reduced to its code.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Instance {
    pub id: u64,
    pub name: String,
    /// Region code (e.g. `tor1`).
    pub region: String,
    /// Size slug (e.g. `gpu-h100x8-640gb`).
    #[serde(rename = "size_slug")]
    pub size: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Instance {
    pub fn new(id: u64, name: impl Into<String>, region: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            region: region.into(),
            size: size.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

// --- Desired state ---

/// Immutable fleet target, built once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub slug: String,
    pub image: String,
    pub regions: Vec<String>,
    /// Target count, applied to every region independently.
    pub desired_count: u32,
    pub ssh_keys: Vec<String>,
    pub name_prefix: Option<String>,
    pub webhook: Option<WebhookTarget>,
}

impl DesiredState {
    pub fn new(
        slug: impl Into<String>,
        image: impl Into<String>,
        regions: Vec<String>,
        desired_count: u32,
    ) -> Result<Self, ConfigError> {
        let slug = slug.into().trim().to_string();
        let image = image.into().trim().to_string();
        if slug.is_empty() {
            return Err(ConfigError::MissingValue("slug"));
        }
        if image.is_empty() {
            return Err(ConfigError::MissingValue("image"));
        }

        let regions: Vec<String> = regions
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }

        Ok(Self {
            slug,
            image,
            regions,
            desired_count,
            ssh_keys: Vec::new(),
            name_prefix: None,
            webhook: None,
        })
    }

    pub fn with_ssh_keys(mut self, ssh_keys: Vec<String>) -> Self {
        self.ssh_keys = ssh_keys;
        self
    }

    pub fn with_name_prefix(mut self, prefix: Option<String>) -> Self {
        self.name_prefix = prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }

    pub fn with_webhook(mut self, webhook: Option<WebhookTarget>) -> Self {
        self.webhook = webhook;
        self
    }

    /// Configured name prefix, falling back to the slug.
    pub fn name_prefix(&self) -> &str {
        self.name_prefix.as_deref().unwrap_or(&self.slug)
    }

    /// Name for the `ordinal`-th droplet of a region (1-based): `{prefix}-{region}-{ordinal}`.
    pub fn instance_name(&self, region: &str, ordinal: u64) -> String {
        format!("{}-{}-{}", self.name_prefix(), region, ordinal)
    }

    /// Comma-joined configured regions, as reported in batch summaries.
    pub fn joined_regions(&self) -> String {
        self.regions.join(",")
    }

    pub fn event_configuration(&self, region: &str) -> EventConfiguration {
        EventConfiguration {
            slug: Some(self.slug.clone()),
            region: Some(region.to_string()),
            image: Some(self.image.clone()),
        }
    }
}

// --- Reconciliation results ---

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreationFailure {
    /// Zero-based creation index within the region's deficit.
    pub index: u32,
    pub name: String,
    pub error: String,
}

/// Result of one region within one reconciliation pass.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RegionOutcome {
    pub region: String,
    pub existing: usize,
    pub deficit: u32,
    pub created: Vec<Instance>,
    pub failures: Vec<CreationFailure>,
}

impl RegionOutcome {
    pub fn converged(region: &str, existing: usize) -> Self {
        Self {
            region: region.to_string(),
            existing,
            deficit: 0,
            created: Vec::new(),
            failures: Vec::new(),
        }
    }
}
