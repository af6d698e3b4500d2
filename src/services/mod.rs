pub mod locks;
pub mod maturity;
pub mod provisioning;
pub mod role_requests;

use std::sync::Arc;

use crate::config::GovernanceConfig;
use crate::events::EventBus;
use crate::store::Stores;

pub use locks::TenantLocks;
pub use maturity::{evaluate, Evaluation, MaturityService};
pub use provisioning::{ProvisioningService, SignupOutcome};
pub use role_requests::{Resolution, ResolutionOutcome, RoleRequestService};

/// The governance services, sharing one lock registry and one event bus.
#[derive(Clone)]
pub struct GovernanceServices {
    pub maturity: Arc<MaturityService>,
    pub role_requests: Arc<RoleRequestService>,
    pub provisioning: Arc<ProvisioningService>,
}

impl GovernanceServices {
    pub fn new(stores: Stores, events: EventBus, defaults: GovernanceConfig) -> Self {
        let locks = Arc::new(TenantLocks::new());
        let maturity = Arc::new(MaturityService::new(
            stores.clone(),
            locks.clone(),
            events.clone(),
        ));
        let role_requests = Arc::new(RoleRequestService::new(
            stores.clone(),
            locks.clone(),
            events.clone(),
            maturity.clone(),
        ));
        let provisioning = Arc::new(ProvisioningService::new(
            stores,
            locks,
            events,
            maturity.clone(),
            defaults,
        ));

        Self {
            maturity,
            role_requests,
            provisioning,
        }
    }
}
