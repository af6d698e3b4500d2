// Router assembly. Tenant-scoped routes sit behind the guard pipeline
// (member or admin flavor); the superadmin surface sits behind the master
// gate; the principal middleware wraps everything.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{admin, public, requests, tenant, testing};
use crate::middleware::{admin_guard, member_guard, principal_middleware, require_master};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/signup", post(public::signup))
        // Authorization check for collaborator routes; answers JSON instead
        // of redirecting, so it runs outside the guard middleware.
        .route("/:domain/authorize", get(tenant::authorize))
        // Tenant-scoped
        .merge(member_routes(state.clone()))
        .merge(admin_gated_routes(state.clone()))
        // Superadmin
        .merge(master_routes());

    if crate::config::config().governance.enable_test_endpoints {
        app = app.merge(testing_routes());
    }

    app
        // Global middleware
        .layer(middleware::from_fn(principal_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn member_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:domain/decisions", get(tenant::decisions_index))
        .route(
            "/:domain/requests",
            post(requests::submit).get(requests::list),
        )
        .route("/:domain/requests/:id/resolve", post(requests::resolve))
        .route_layer(middleware::from_fn_with_state(state, member_guard))
}

fn admin_gated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:domain/settings",
            get(tenant::settings_get).put(tenant::settings_put),
        )
        .route_layer(middleware::from_fn_with_state(state, admin_guard))
}

fn master_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/tenants", get(admin::tenants_list))
        .route("/admin/tenants/:domain", get(admin::tenant_get))
        .route("/admin/tenants/:domain/promote", post(admin::tenant_promote))
        .route("/admin/tenants/:domain/thresholds", put(admin::thresholds_put))
        .route("/admin/domains/:domain/approval", put(admin::domain_approval_put))
        .route_layer(middleware::from_fn(require_master))
}

fn testing_routes() -> Router<AppState> {
    Router::new()
        .route("/testing/seed", post(testing::seed))
        .route("/testing/tenants/:domain/maturity", put(testing::set_maturity))
}
