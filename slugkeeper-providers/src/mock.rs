use crate::{CloudProvider, CreateInstanceRequest, ProviderError};
use async_trait::async_trait;
use slugkeeper_common::Instance;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// In-memory provider for local dry runs and tests.
///
/// Created droplets are added to the inventory, so consecutive passes converge.
/// Listing and creation failures can be scripted.
pub struct MockProvider {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    instances: Vec<Instance>,
    next_id: u64,
    fail_listing_from_page: Option<u32>,
    fail_listing_after_calls: Option<usize>,
    failing_names: HashSet<String>,
    failing_regions: HashSet<String>,
    list_calls: Vec<u32>,
    create_requests: Vec<CreateInstanceRequest>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..MockState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded calls from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add `count` existing droplets of `size` in `region`.
    pub fn seed(&self, region: &str, size: &str, count: usize) -> &Self {
        let mut state = self.state();
        for _ in 0..count {
            let id = state.next_id;
            state.next_id += 1;
            state
                .instances
                .push(Instance::new(id, format!("seed-{}", id), region, size));
        }
        self
    }

    /// Every listing request for `page` or later fails with a 503.
    pub fn fail_listing_from_page(&self, page: u32) -> &Self {
        self.state().fail_listing_from_page = Some(page);
        self
    }

    pub fn fail_listing(&self) -> &Self {
        self.fail_listing_from_page(1)
    }

    /// The first `calls` listing requests succeed, every later one fails with a 503.
    pub fn fail_listing_after_calls(&self, calls: usize) -> &Self {
        self.state().fail_listing_after_calls = Some(calls);
        self
    }

    pub fn restore_listing(&self) -> &Self {
        let mut state = self.state();
        state.fail_listing_from_page = None;
        state.fail_listing_after_calls = None;
        self
    }

    /// Creation of a droplet with this exact name is rejected.
    pub fn fail_creation_of(&self, name: &str) -> &Self {
        self.state().failing_names.insert(name.to_string());
        self
    }

    /// Every creation in `region` is rejected.
    pub fn fail_creations_in(&self, region: &str) -> &Self {
        self.state().failing_regions.insert(region.to_string());
        self
    }

    pub fn instances(&self) -> Vec<Instance> {
        self.state().instances.clone()
    }

    /// Page indices requested so far, in call order.
    pub fn list_calls(&self) -> Vec<u32> {
        self.state().list_calls.clone()
    }

    /// Every creation request received, including rejected ones.
    pub fn create_requests(&self) -> Vec<CreateInstanceRequest> {
        self.state().create_requests.clone()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.create_requests().into_iter().map(|r| r.name).collect()
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn list_instances(&self, page: u32, per_page: u32) -> Result<Vec<Instance>, ProviderError> {
        let mut state = self.state();
        state.list_calls.push(page);

        let calls = state.list_calls.len();
        if state.fail_listing_from_page.is_some_and(|from| page >= from)
            || state.fail_listing_after_calls.is_some_and(|allowed| calls > allowed)
        {
            return Err(ProviderError::Status {
                operation: "list_droplets",
                status: 503,
                body: "mock: listing unavailable".to_string(),
            });
        }

        let per_page = per_page.max(1) as usize;
        let start = (page.saturating_sub(1) as usize).saturating_mul(per_page);
        Ok(state
            .instances
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect())
    }

    async fn create_instance(&self, request: &CreateInstanceRequest) -> Result<Instance, ProviderError> {
        let mut state = self.state();
        state.create_requests.push(request.clone());

        if state.failing_names.contains(&request.name) || state.failing_regions.contains(&request.region) {
            return Err(ProviderError::Status {
                operation: "create_droplet",
                status: 422,
                body: format!("mock: no capacity for {} in {}", request.size, request.region),
            });
        }

        let id = state.next_id;
        state.next_id += 1;
        let mut instance = Instance::new(id, request.name.clone(), request.region.clone(), request.size.clone());
        instance
            .attributes
            .insert("status".to_string(), serde_json::json!("new"));
        instance
            .attributes
            .insert("image".to_string(), serde_json::json!(request.image));
        state.instances.push(instance.clone());
        Ok(instance)
    }
}
