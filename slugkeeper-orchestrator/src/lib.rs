pub mod inventory;
pub mod notifier;
pub mod provider_manager;
pub mod reconciliation;
pub mod reconciliation_job;
pub mod scheduler;
pub mod settings;

pub use inventory::{InventoryClient, ListingPolicy};
pub use notifier::{EventSink, WebhookNotifier};
pub use reconciliation::{ReconcileError, Reconciler};
pub use settings::Settings;
