use std::sync::Arc;

use slugkeeper_common::{CreationFailure, DesiredState, NotificationEvent, RegionOutcome};
use slugkeeper_providers::{CloudProvider, CreateInstanceRequest, ProviderError};

use crate::inventory::{self, InventoryClient, ListingPolicy};
use crate::notifier::EventSink;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("inventory listing failed while reconciling {region}: {source}")]
    Listing {
        region: String,
        #[source]
        source: ProviderError,
    },
}

/// Closes the gap between the desired count and what the provider reports, region by region.
pub struct Reconciler {
    desired: Arc<DesiredState>,
    provider: Arc<dyn CloudProvider>,
    inventory: InventoryClient,
    events: Arc<dyn EventSink>,
}

impl Reconciler {
    pub fn new(
        desired: Arc<DesiredState>,
        provider: Arc<dyn CloudProvider>,
        listing_policy: ListingPolicy,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let inventory = InventoryClient::new(provider.clone(), listing_policy);
        Self {
            desired,
            provider,
            inventory,
            events,
        }
    }

    pub fn desired(&self) -> &DesiredState {
        &self.desired
    }

    /// One pass over every configured region, in declared order.
    ///
    /// Creation failures are recorded per index and never abort the pass. Only a
    /// listing failure under [`ListingPolicy::Strict`] does.
    pub async fn reconcile(&self) -> Result<Vec<RegionOutcome>, ReconcileError> {
        let mut outcomes = Vec::with_capacity(self.desired.regions.len());

        for region in &self.desired.regions {
            match self.reconcile_region(region).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("[Reconciliation] Pass aborted: {}", e);
                    self.events
                        .notify(&NotificationEvent::pass_aborted(&self.desired, e.to_string()))
                        .await;
                    return Err(e);
                }
            }
        }

        let created: usize = outcomes.iter().map(|o| o.created.len()).sum();
        if created > 1 {
            self.events
                .notify(&NotificationEvent::batch_summary(&self.desired, &outcomes))
                .await;
        }

        Ok(outcomes)
    }

    async fn reconcile_region(&self, region: &str) -> Result<RegionOutcome, ReconcileError> {
        let desired = &self.desired;
        tracing::info!("[Reconciliation] Checking for {} droplets in {}...", desired.slug, region);

        let instances = self
            .inventory
            .list_instances()
            .await
            .map_err(|source| ReconcileError::Listing {
                region: region.to_string(),
                source,
            })?;
        let existing = inventory::count_matching(&instances, &desired.slug, Some(region));
        let to_create = deficit(desired.desired_count, existing);

        tracing::info!(
            "[Reconciliation] Found {} existing {} droplets in {}. Desired count: {}",
            existing,
            desired.slug,
            region,
            desired.desired_count
        );

        if to_create == 0 {
            tracing::info!(
                "[Reconciliation] No new droplets needed in {}. Current count: {}, desired: {}",
                region,
                existing,
                desired.desired_count
            );
            return Ok(RegionOutcome::converged(region, existing));
        }

        tracing::info!("[Reconciliation] Creating {} new {} droplets in {}...", to_create, desired.slug, region);

        let mut outcome = RegionOutcome {
            region: region.to_string(),
            existing,
            deficit: to_create,
            created: Vec::new(),
            failures: Vec::new(),
        };

        for (index, name) in planned_names(desired, region, existing, to_create)
            .into_iter()
            .enumerate()
        {
            let request = CreateInstanceRequest::new(desired, region, name);
            match self.provider.create_instance(&request).await {
                Ok(instance) => {
                    tracing::info!("[Reconciliation] Created droplet: {} (ID: {})", instance.name, instance.id);
                    self.events
                        .notify(&NotificationEvent::instance_created(desired, region, instance.clone()))
                        .await;
                    outcome.created.push(instance);
                }
                Err(e) => {
                    tracing::error!("[Reconciliation] Error creating droplet {}: {}", request.name, e);
                    outcome.failures.push(CreationFailure {
                        index: index as u32,
                        name: request.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "[Reconciliation] Successfully created {} of {} new droplets in {}.",
            outcome.created.len(),
            to_create,
            region
        );
        Ok(outcome)
    }
}

/// `max(0, desired - existing)`.
pub fn deficit(desired_count: u32, existing: usize) -> u32 {
    (desired_count as usize).saturating_sub(existing) as u32
}

/// Names for one region's deficit, numbered on from the count observed before the
/// pass. A failed index keeps its name, so later indices never shift.
pub fn planned_names(desired: &DesiredState, region: &str, existing: usize, deficit: u32) -> Vec<String> {
    (0..deficit as u64)
        .map(|i| desired.instance_name(region, existing as u64 + i + 1))
        .collect()
}
