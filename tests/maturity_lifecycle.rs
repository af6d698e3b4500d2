// Maturity lifecycle over the HTTP surface: forced promotion, thresholds,
// age-based promotion on read, monotonicity, and signup provisioning.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use quorum_api::domain::{DomainApprovalStatus, GlobalRole};

use common::{body_json, master_token, test_app};

#[tokio::test]
async fn force_promote_is_superadmin_scoped_and_idempotent() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (founder_id, founder_token) = app
        .seed_member(&tenant, GlobalRole::ProvisionalAdmin)
        .await;

    // Member tokens are rejected at the master gate.
    let res = app
        .post("/admin/tenants/acme.com/promote", Some(&founder_token), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = app
        .post("/admin/tenants/acme.com/promote", None, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let master = master_token();
    let res = app
        .post("/admin/tenants/acme.com/promote", Some(&master), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "mature");

    // The founder's provisional trust became full admin with the transition.
    let founder = app
        .state
        .stores
        .memberships
        .find(founder_id, tenant.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(founder.role, GlobalRole::Admin);

    // Promoting again is a no-op, not an error.
    let res = app
        .post("/admin/tenants/acme.com/promote", Some(&master), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "mature");
}

#[tokio::test]
async fn threshold_update_validates_ranges_and_persists_nothing_on_failure() {
    let app = test_app();
    app.seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let master = master_token();

    let res = app
        .put(
            "/admin/tenants/acme.com/thresholds",
            Some(&master),
            json!({"age_days_threshold": -10}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["age_days_threshold"].is_string());

    // No state change from the rejected update.
    let res = app.get("/admin/tenants/acme.com", Some(&master)).await;
    let body = body_json(res).await;
    assert_eq!(body["data"]["thresholds"]["age_days_threshold"], 30);

    // A valid update lands.
    let res = app
        .put(
            "/admin/tenants/acme.com/thresholds",
            Some(&master),
            json!({"age_days_threshold": 60, "admin_threshold": 3}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["thresholds"]["age_days_threshold"], 60);
    assert_eq!(body["data"]["thresholds"]["admin_threshold"], 3);
}

#[tokio::test]
async fn aged_tenant_promotes_on_read() {
    let app = test_app();
    // Backdated past the 30-day default threshold; only one provisional
    // admin, so neither count-based disjunct holds.
    let tenant = app
        .seed_tenant("old.com", Some(DomainApprovalStatus::Approved), 45)
        .await;
    app.seed_member(&tenant, GlobalRole::ProvisionalAdmin).await;

    let res = app
        .get("/admin/tenants/old.com", Some(&master_token()))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "mature");
}

#[tokio::test]
async fn young_tenant_stays_bootstrap_on_read() {
    let app = test_app();
    let tenant = app
        .seed_tenant("young.com", Some(DomainApprovalStatus::Approved), 29)
        .await;
    app.seed_member(&tenant, GlobalRole::ProvisionalAdmin).await;

    let res = app
        .get("/admin/tenants/young.com", Some(&master_token()))
        .await;
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "bootstrap");
}

#[tokio::test]
async fn maturity_is_monotonic() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    app.seed_member(&tenant, GlobalRole::ProvisionalAdmin).await;
    let master = master_token();

    app.post("/admin/tenants/acme.com/promote", Some(&master), json!({}))
        .await;

    // Raising every threshold afterwards cannot demote the tenant.
    app.put(
        "/admin/tenants/acme.com/thresholds",
        Some(&master),
        json!({"age_days_threshold": 365, "admin_threshold": 10}),
    )
    .await;

    let res = app.get("/admin/tenants/acme.com", Some(&master)).await;
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "mature");
}

#[tokio::test]
async fn lowering_thresholds_can_promote_immediately() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    app.seed_member(&tenant, GlobalRole::ProvisionalAdmin).await;
    let master = master_token();

    // One admin exists; dropping the admin threshold to 1 completes the
    // corroboration on the spot.
    let res = app
        .put(
            "/admin/tenants/acme.com/thresholds",
            Some(&master),
            json!({"admin_threshold": 1}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "mature");
}

#[tokio::test]
async fn signup_founds_bootstrap_tenant_with_provisional_admin() {
    let app = test_app();

    let res = app
        .post(
            "/signup",
            None,
            json!({"email": "casey@newco.com", "name": "Casey"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["tenant"]["maturity"], "bootstrap");
    assert_eq!(body["data"]["membership"]["role"], "provisional_admin");
    assert!(body["data"]["token"].is_string());

    // The new domain entered the ledger as pending.
    let status = app
        .state
        .stores
        .approvals
        .status("newco.com")
        .await
        .unwrap();
    assert_eq!(status, DomainApprovalStatus::Pending);

    // The second user joins as a plain member.
    let res = app
        .post(
            "/signup",
            None,
            json!({"email": "river@newco.com", "name": "River"}),
        )
        .await;
    let body = body_json(res).await;
    assert_eq!(body["data"]["membership"]["role"], "user");
}

#[tokio::test]
async fn signup_rejects_bad_emails_and_rejected_domains() {
    let app = test_app();

    let res = app
        .post("/signup", None, json!({"email": "not-an-email", "name": "X"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    app.state
        .stores
        .approvals
        .set_status("blocked.com", DomainApprovalStatus::Rejected, chrono::Utc::now())
        .await
        .unwrap();
    let res = app
        .post(
            "/signup",
            None,
            json!({"email": "casey@blocked.com", "name": "Casey"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn settings_lock_is_enforced_server_side() {
    let app = test_app();
    let tenant = app
        .seed_tenant("acme.com", Some(DomainApprovalStatus::Approved), 0)
        .await;
    let (_, provisional_token) = app
        .seed_member(&tenant, GlobalRole::ProvisionalAdmin)
        .await;

    // Locked while bootstrap.
    let res = app
        .put(
            "/acme.com/settings",
            Some(&provisional_token),
            json!({"auth_method": "sso"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // After promotion the same caller (now a full admin) may write.
    app.post(
        "/admin/tenants/acme.com/promote",
        Some(&master_token()),
        json!({}),
    )
    .await;

    let res = app
        .put(
            "/acme.com/settings",
            Some(&provisional_token),
            json!({"auth_method": "sso", "self_registration": false}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["settings"]["auth_method"], "sso");
    assert_eq!(body["data"]["settings"]["self_registration"], false);
}

#[tokio::test]
async fn testing_fixtures_seed_and_override() {
    let app = test_app();

    let res = app
        .post(
            "/testing/seed",
            None,
            json!({"domain": "fixture.com", "name": "Robin", "role": "admin", "approval_status": "approved"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let res = app.get("/fixture.com/settings", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .put(
            "/testing/tenants/fixture.com/maturity",
            None,
            json!({"maturity": "mature"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["maturity"], "mature");
}
