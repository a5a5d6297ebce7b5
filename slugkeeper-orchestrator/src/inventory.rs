use std::sync::Arc;

use slugkeeper_common::Instance;
use slugkeeper_providers::{CloudProvider, ProviderError};

/// Page size requested from the provider. A shorter page marks the end of data.
pub const PAGE_SIZE: u32 = 100;

/// What a failed page request means for the listing as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ListingPolicy {
    /// Stop paging and return what was gathered so far. Under-reporting makes the
    /// reconciler create rather than stall, at the risk of over-provisioning.
    #[default]
    FailOpen,
    /// Surface the error; the reconciler aborts the pass.
    Strict,
}

pub struct InventoryClient {
    provider: Arc<dyn CloudProvider>,
    policy: ListingPolicy,
    page_size: u32,
}

impl InventoryClient {
    pub fn new(provider: Arc<dyn CloudProvider>, policy: ListingPolicy) -> Self {
        Self {
            provider,
            policy,
            page_size: PAGE_SIZE,
        }
    }

    /// Every instance on the account, paging from 1 until a short page.
    pub async fn list_instances(&self) -> Result<Vec<Instance>, ProviderError> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            match self.provider.list_instances(page, self.page_size).await {
                Ok(batch) => {
                    let has_more = batch.len() as u32 >= self.page_size;
                    all.extend(batch);
                    if !has_more {
                        break;
                    }
                    page += 1;
                }
                Err(e) => match self.policy {
                    ListingPolicy::FailOpen => {
                        tracing::warn!(
                            "[Inventory] Error fetching droplets (page {}): {}; continuing with {} listed",
                            page,
                            e,
                            all.len()
                        );
                        break;
                    }
                    ListingPolicy::Strict => {
                        tracing::error!("[Inventory] Error fetching droplets (page {}): {}", page, e);
                        return Err(e);
                    }
                },
            }
        }

        tracing::debug!("[Inventory] Listed {} droplets over {} page(s)", all.len(), page);
        Ok(all)
    }
}

/// Instances of exactly `type_id`, restricted to `region` when given.
pub fn matching<'a>(instances: &'a [Instance], type_id: &str, region: Option<&str>) -> Vec<&'a Instance> {
    instances
        .iter()
        .filter(|i| i.size == type_id && region.map_or(true, |r| i.region == r))
        .collect()
}

pub fn count_matching(instances: &[Instance], type_id: &str, region: Option<&str>) -> usize {
    matching(instances, type_id, region).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugkeeper_providers::mock::MockProvider;

    fn inventory() -> Vec<Instance> {
        vec![
            Instance::new(1, "a", "tor1", "gpu-h100x8"),
            Instance::new(2, "b", "tor1", "gpu-h100x8-640gb"),
            Instance::new(3, "c", "nyc1", "gpu-h100x8"),
            Instance::new(4, "d", "TOR1", "gpu-h100x8"),
        ]
    }

    #[test]
    fn counting_is_exact_on_type_and_region() {
        let all = inventory();
        assert_eq!(count_matching(&all, "gpu-h100x8", Some("tor1")), 1);
        assert_eq!(count_matching(&all, "gpu-h100x8", Some("nyc1")), 1);
        assert_eq!(count_matching(&all, "gpu-h100x8", None), 3);
        assert_eq!(count_matching(&all, "gpu-h100x8-640gb", Some("tor1")), 1);
        assert_eq!(count_matching(&all, "gpu", None), 0);
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let provider = Arc::new(MockProvider::new());
        provider.seed("tor1", "gpu", 250);
        let client = InventoryClient::new(provider.clone(), ListingPolicy::FailOpen);

        assert_eq!(client.list_instances().await.unwrap().len(), 250);
        assert_eq!(provider.list_calls(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size_needs_one_empty_page() {
        let provider = Arc::new(MockProvider::new());
        provider.seed("tor1", "gpu", 200);
        let client = InventoryClient::new(provider.clone(), ListingPolicy::FailOpen);

        assert_eq!(client.list_instances().await.unwrap().len(), 200);
        assert_eq!(provider.list_calls(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn fail_open_keeps_pages_gathered_before_the_error() {
        let provider = Arc::new(MockProvider::new());
        provider.seed("tor1", "gpu", 150).fail_listing_from_page(2);
        let client = InventoryClient::new(provider.clone(), ListingPolicy::FailOpen);

        assert_eq!(client.list_instances().await.unwrap().len(), 100);
        assert_eq!(provider.list_calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn strict_policy_surfaces_the_error() {
        let provider = Arc::new(MockProvider::new());
        provider.seed("tor1", "gpu", 150).fail_listing_from_page(2);
        let client = InventoryClient::new(provider, ListingPolicy::Strict);

        let err = client.list_instances().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }
}
