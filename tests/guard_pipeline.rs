// End-to-end guard ordering scenarios: every tenant-scoped request passes
// the full pipeline, and the first failing check decides the redirect.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use quorum_api::domain::{DomainApprovalStatus, GlobalRole};
use quorum_api::state::AppState;
use quorum_api::store::{DomainApprovalStore, MemoryStore, StoreError, Stores};

use common::{body_json, location, master_token, test_app, test_app_with_state};

#[tokio::test]
async fn anonymous_request_redirects_to_tenant_login() {
    let app = test_app();
    app.seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;

    let res = app.get("/acme.com/decisions", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/acme.com/login");
}

#[tokio::test]
async fn master_account_is_denied_tenant_data() {
    let app = test_app();
    app.seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;

    let res = app
        .get("/acme.com/decisions", Some(&master_token()))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/admin");
}

#[tokio::test]
async fn cross_tenant_member_is_sent_home() {
    let app = test_app();
    app.seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let beta = app
        .seed_tenant("beta.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (_, token) = app.seed_member(&beta, GlobalRole::User).await;

    let res = app.get("/acme.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/beta.com");
}

#[tokio::test]
async fn pending_domain_redirects_to_status_page() {
    let app = test_app();
    let tenant = app
        .seed_tenant("pending.com", Some(DomainApprovalStatus::Pending), 0)
        .await;
    let (_, token) = app.seed_member(&tenant, GlobalRole::User).await;

    let res = app.get("/pending.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/pending.com/status/pending");
}

#[tokio::test]
async fn rejected_domain_redirects_to_status_page() {
    let app = test_app();
    let tenant = app
        .seed_tenant("rejected.com", Some(DomainApprovalStatus::Rejected), 0)
        .await;
    let (_, token) = app.seed_member(&tenant, GlobalRole::User).await;

    let res = app.get("/rejected.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/rejected.com/status/rejected");
}

#[tokio::test]
async fn approved_member_reaches_tenant_data() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (_, token) = app.seed_member(&tenant, GlobalRole::User).await;

    let res = app.get("/acme.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["tenant"]["domain"], "acme.com");
}

#[tokio::test]
async fn legacy_tenant_without_ledger_entry_is_served() {
    let app = test_app();
    let tenant = app.seed_tenant("legacy.com", None, 0).await;
    let (_, token) = app.seed_member(&tenant, GlobalRole::User).await;

    let res = app.get("/legacy.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_tenant_fails_closed() {
    let app = test_app();
    let beta = app
        .seed_tenant("beta.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (_, token) = app.seed_member(&beta, GlobalRole::User).await;

    // A foreign member bounces off the cross-tenant check first.
    let res = app.get("/ghost.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    // A member of the missing domain itself gets the hard NotFound: a
    // tenant deleted mid-flight fails closed, never partially succeeds.

    let token = quorum_api::auth::generate_jwt(&quorum_api::auth::Claims::member(
        uuid::Uuid::new_v4(),
        "ghost".into(),
        "ghost.com".into(),
    ))
    .unwrap();
    let res = app.get("/ghost.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

struct UnreachableLedger;

#[async_trait]
impl DomainApprovalStore for UnreachableLedger {
    async fn status(&self, _domain: &str) -> Result<DomainApprovalStatus, StoreError> {
        Err(StoreError::Unavailable("ledger offline".into()))
    }

    async fn set_status(
        &self,
        _domain: &str,
        _status: DomainApprovalStatus,
        _now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("ledger offline".into()))
    }
}

#[tokio::test]
async fn unreachable_approval_ledger_fails_open() {
    let memory = Arc::new(MemoryStore::new());
    let stores = Stores {
        tenants: memory.clone(),
        memberships: memory.clone(),
        role_requests: memory,
        approvals: Arc::new(UnreachableLedger),
    };
    let app = test_app_with_state(AppState::new(stores));

    let tenant = app.seed_tenant("acme.com", None, 0).await;
    let (_, token) = app.seed_member(&tenant, GlobalRole::User).await;

    let res = app.get("/acme.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_surface_requires_the_admin_gate() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (_, user_token) = app.seed_member(&tenant, GlobalRole::User).await;
    let (_, steward_token) = app.seed_member(&tenant, GlobalRole::Steward).await;
    let (_, provisional_token) = app
        .seed_member(&tenant, GlobalRole::ProvisionalAdmin)
        .await;

    // Plain members and stewards bounce off role-gated resources.
    for token in [&user_token, &steward_token] {
        let res = app.get("/acme.com/settings", Some(token)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/acme.com");
    }

    // Provisional admin counts as admin for the gate.
    let res = app.get("/acme.com/settings", Some(&provisional_token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["restricted"], true);
}

#[tokio::test]
async fn authorize_endpoint_reports_the_verdict_without_redirecting() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (_, token) = app.seed_member(&tenant, GlobalRole::User).await;

    let res = app.get("/acme.com/authorize", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["allowed"], true);

    let res = app.get("/acme.com/authorize?role=admin", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["allowed"], false);
    assert_eq!(body["data"]["reason"], "insufficient_role");
    assert_eq!(body["data"]["redirect"], "/acme.com");

    let res = app.get("/acme.com/authorize", None).await;
    let body = body_json(res).await;
    assert_eq!(body["data"]["allowed"], false);
    assert_eq!(body["data"]["reason"], "unauthenticated");
}

#[tokio::test]
async fn member_surface_rejects_members_without_store_records() {
    let app = test_app();
    app.seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;

    // Valid token, but no membership behind it.
    let token = quorum_api::auth::generate_jwt(&quorum_api::auth::Claims::member(
        uuid::Uuid::new_v4(),
        "stale".into(),
        "acme.com".into(),
    ))
    .unwrap();

    let res = app.get("/acme.com/decisions", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/acme.com/login");
}
