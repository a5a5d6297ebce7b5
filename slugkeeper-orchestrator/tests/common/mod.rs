// Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use slugkeeper_common::{DesiredState, NotificationEvent};
use slugkeeper_orchestrator::{EventSink, ListingPolicy, Reconciler};
use slugkeeper_providers::mock::MockProvider;
use std::sync::{Arc, Mutex};

pub const SLUG: &str = "gpu-h100x8";
pub const IMAGE: &str = "gpu-h100x8-base";

/// A delivered event, with the number of creation requests the provider had seen at that moment.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub event: NotificationEvent,
    pub creations_so_far: usize,
}

pub struct RecordingSink {
    provider: Arc<MockProvider>,
    recorded: Mutex<Vec<Recorded>>,
}

impl RecordingSink {
    pub fn new(provider: Arc<MockProvider>) -> Self {
        Self {
            provider,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.recorded().into_iter().map(|r| r.event).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == name).count()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn notify(&self, event: &NotificationEvent) -> bool {
        let creations_so_far = self.provider.create_requests().len();
        self.recorded.lock().unwrap().push(Recorded {
            event: event.clone(),
            creations_so_far,
        });
        true
    }
}

pub fn desired(regions: &[&str], count: u32) -> DesiredState {
    DesiredState::new(SLUG, IMAGE, regions.iter().map(|r| r.to_string()).collect(), count)
        .expect("valid desired state")
}

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub sink: Arc<RecordingSink>,
    pub reconciler: Reconciler,
}

pub fn harness(desired: DesiredState, policy: ListingPolicy) -> Harness {
    let provider = Arc::new(MockProvider::new());
    harness_with(desired, policy, provider)
}

pub fn harness_with(desired: DesiredState, policy: ListingPolicy, provider: Arc<MockProvider>) -> Harness {
    let sink = Arc::new(RecordingSink::new(provider.clone()));
    let reconciler = Reconciler::new(Arc::new(desired), provider.clone(), policy, sink.clone());
    Harness {
        provider,
        sink,
        reconciler,
    }
}
