use std::sync::Arc;

use crate::config;
use crate::events::{EventBus, TracingNotifier};
use crate::guard::GuardPipeline;
use crate::services::GovernanceServices;
use crate::store::Stores;

/// Shared application state: store handles, governance services, the guard
/// pipeline, and the notification bus.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub services: GovernanceServices,
    pub guard: Arc<GuardPipeline>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(stores: Stores) -> Self {
        let events = EventBus::new().with_sink(Arc::new(TracingNotifier));
        Self::with_events(stores, events)
    }

    pub fn with_events(stores: Stores, events: EventBus) -> Self {
        let services = GovernanceServices::new(
            stores.clone(),
            events.clone(),
            config::config().governance.clone(),
        );
        let guard = Arc::new(GuardPipeline::new(stores.clone()));
        Self {
            stores,
            services,
            guard,
            events,
        }
    }

    /// State backed by the in-memory registry (development and tests).
    pub fn in_memory() -> Self {
        Self::new(Stores::in_memory())
    }
}
