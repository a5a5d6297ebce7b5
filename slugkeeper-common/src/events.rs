use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{DesiredState, Instance, RegionOutcome};

// -----------------------------------------------------------------------------
// Event names (wire values of the `event` field)
// -----------------------------------------------------------------------------

pub const EVENT_DROPLET_CREATED: &str = "droplet_created";
pub const EVENT_DROPLETS_CREATED_SUMMARY: &str = "droplets_created_summary";
pub const EVENT_RECONCILE_ABORTED: &str = "reconcile_aborted";

/// Label used when an event has no dedicated chat rendering.
pub const GENERIC_NOTIFICATION_LABEL: &str = "Slug keeper notification:";

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct EventConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

// -----------------------------------------------------------------------------
// Reconciliation events
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "event")]
pub enum NotificationEvent {
    #[serde(rename = "droplet_created")]
    InstanceCreated {
        #[serde(rename = "droplet")]
        instance: Instance,
        region: String,
        timestamp: DateTime<Utc>,
        configuration: EventConfiguration,
    },
    #[serde(rename = "droplets_created_summary", rename_all = "camelCase")]
    BatchSummary {
        created_count: usize,
        existing_count: usize,
        #[serde(rename = "dropletIds")]
        created_ids: Vec<u64>,
        regions: Vec<String>,
        timestamp: DateTime<Utc>,
        configuration: EventConfiguration,
    },
    #[serde(rename = "reconcile_aborted")]
    PassAborted {
        reason: String,
        timestamp: DateTime<Utc>,
        configuration: EventConfiguration,
    },
}

impl NotificationEvent {
    pub fn instance_created(desired: &DesiredState, region: &str, instance: Instance) -> Self {
        NotificationEvent::InstanceCreated {
            instance,
            region: region.to_string(),
            timestamp: Utc::now(),
            configuration: desired.event_configuration(region),
        }
    }

    /// Aggregates every region of a pass. The region field lists the configured
    /// regions, not only those that created something.
    pub fn batch_summary(desired: &DesiredState, outcomes: &[RegionOutcome]) -> Self {
        let created_ids: Vec<u64> = outcomes
            .iter()
            .flat_map(|o| o.created.iter().map(|i| i.id))
            .collect();
        NotificationEvent::BatchSummary {
            created_count: created_ids.len(),
            existing_count: outcomes.iter().map(|o| o.existing).sum(),
            created_ids,
            regions: desired.regions.clone(),
            timestamp: Utc::now(),
            configuration: desired.event_configuration(&desired.joined_regions()),
        }
    }

    pub fn pass_aborted(desired: &DesiredState, reason: impl Into<String>) -> Self {
        NotificationEvent::PassAborted {
            reason: reason.into(),
            timestamp: Utc::now(),
            configuration: desired.event_configuration(&desired.joined_regions()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::InstanceCreated { .. } => EVENT_DROPLET_CREATED,
            NotificationEvent::BatchSummary { .. } => EVENT_DROPLETS_CREATED_SUMMARY,
            NotificationEvent::PassAborted { .. } => EVENT_RECONCILE_ABORTED,
        }
    }

    /// Human-readable one-liner for chat webhooks.
    pub fn chat_text(&self) -> String {
        match self {
            NotificationEvent::InstanceCreated {
                instance,
                configuration,
                ..
            } => render_instance_created(instance, configuration),
            NotificationEvent::BatchSummary {
                created_count,
                existing_count,
                created_ids,
                configuration,
                ..
            } => render_batch_summary(*created_count, *existing_count, created_ids, configuration),
            other => render_generic(other),
        }
    }
}

fn render_instance_created(instance: &Instance, configuration: &EventConfiguration) -> String {
    format!(
        "Droplet created: {} (ID: {}) in {} using {}.",
        instance.name,
        instance.id,
        configuration.region.as_deref().unwrap_or("unknown region"),
        configuration.slug.as_deref().unwrap_or("unknown size"),
    )
}

fn render_batch_summary(
    created_count: usize,
    existing_count: usize,
    created_ids: &[u64],
    configuration: &EventConfiguration,
) -> String {
    let ids = if created_ids.is_empty() {
        "n/a".to_string()
    } else {
        created_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Created {} droplets (existing: {}) for slug {} in {}. IDs: {}.",
        created_count,
        existing_count,
        configuration.slug.as_deref().unwrap_or("unknown"),
        configuration.region.as_deref().unwrap_or("unknown region"),
        ids,
    )
}

fn render_generic(event: &NotificationEvent) -> String {
    let body = serde_json::to_string_pretty(event).unwrap_or_default();
    format!("{}\n```\n{}\n```", GENERIC_NOTIFICATION_LABEL, body)
}
