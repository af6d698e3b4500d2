#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use quorum_api::app;
use quorum_api::auth::{generate_jwt, Claims};
use quorum_api::domain::{DomainApprovalStatus, GlobalRole, Membership, Tenant};
use quorum_api::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Full application over the in-memory store. APP_ENV is unset in tests, so
/// the development config applies (test endpoints on, dev JWT secret).
pub fn test_app() -> TestApp {
    let state = AppState::in_memory();
    TestApp {
        router: app::router(state.clone()),
        state,
    }
}

pub fn test_app_with_state(state: AppState) -> TestApp {
    TestApp {
        router: app::router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response<Body> {
        self.request("GET", path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.request("POST", path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.request("PUT", path, token, Some(body)).await
    }

    /// Seed a tenant directly through the store, optionally with a ledger
    /// entry and a backdated creation time.
    pub async fn seed_tenant(
        &self,
        domain: &str,
        approval: Option<DomainApprovalStatus>,
        age_days: i64,
    ) -> Tenant {
        let created = Utc::now() - chrono::Duration::days(age_days);
        let tenant = self
            .state
            .stores
            .tenants
            .create(Tenant::provision(domain, 30, 0, 2, created))
            .await
            .unwrap();
        if let Some(status) = approval {
            self.state
                .stores
                .approvals
                .set_status(domain, status, Utc::now())
                .await
                .unwrap();
        }
        tenant
    }

    /// Seed a member with a role and return their id and bearer token.
    pub async fn seed_member(&self, tenant: &Tenant, role: GlobalRole) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        self.state
            .stores
            .memberships
            .insert(Membership::new(user_id, tenant.id, role, Utc::now()))
            .await
            .unwrap();
        let token = generate_jwt(&Claims::member(
            user_id,
            "member".into(),
            tenant.domain.clone(),
        ))
        .unwrap();
        (user_id, token)
    }
}

pub fn master_token() -> String {
    generate_jwt(&Claims::master()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
