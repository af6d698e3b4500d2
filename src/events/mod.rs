// Governance events: the auditable causal trail for membership changes and
// maturity transitions, and the fire-and-forget hook the notification
// collaborators (email/Slack/Teams) consume.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{GlobalRole, RequestStatus, RequestedRole};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GovernanceEvent {
    /// A membership was created or its role rewritten. Every publisher of
    /// this event has already run the update-then-evaluate sequence under
    /// the tenant lock; the event records the cause, it does not drive it.
    MembershipChanged {
        tenant_id: Uuid,
        domain: String,
        user_id: Uuid,
        role: GlobalRole,
    },
    TenantPromoted {
        tenant_id: Uuid,
        domain: String,
        forced: bool,
    },
    RoleRequestSubmitted {
        request_id: Uuid,
        tenant_id: Uuid,
        domain: String,
        user_id: Uuid,
        requested_role: RequestedRole,
    },
    RoleRequestResolved {
        request_id: Uuid,
        tenant_id: Uuid,
        domain: String,
        user_id: Uuid,
        outcome: RequestStatus,
        resolved_by: Uuid,
    },
}

impl GovernanceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceEvent::MembershipChanged { .. } => "membership_changed",
            GovernanceEvent::TenantPromoted { .. } => "tenant_promoted",
            GovernanceEvent::RoleRequestSubmitted { .. } => "role_request_submitted",
            GovernanceEvent::RoleRequestResolved { .. } => "role_request_resolved",
        }
    }
}

/// Delivery seam for the out-of-scope notification collaborators.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, event: &GovernanceEvent) -> anyhow::Result<()>;
}

/// Sink that records events in the service log. Stands in for the external
/// email/Slack/Teams transports.
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn deliver(&self, event: &GovernanceEvent) -> anyhow::Result<()> {
        tracing::info!(
            kind = event.kind(),
            payload = %serde_json::to_string(event).unwrap_or_default(),
            "governance event"
        );
        Ok(())
    }
}

/// Synchronous fan-out to the registered sinks. A failing sink is logged and
/// never surfaces to the operation that emitted the event: state transitions
/// must not block or roll back on notification failure.
#[derive(Clone, Default)]
pub struct EventBus {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub async fn publish(&self, event: GovernanceEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(&event).await {
                tracing::warn!(
                    sink = sink.name(),
                    kind = event.kind(),
                    "notification delivery failed: {}",
                    e
                );
            }
        }
    }
}
