use quorum_api::state::AppState;
use quorum_api::store::{PgStore, Stores};
use quorum_api::{app, config};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Quorum governance API in {:?} mode", config.environment);

    let stores = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, config.database.max_connections)
                .await
                .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
            Stores::postgres(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory registry");
            Stores::in_memory()
        }
    };

    let app = app::router(AppState::new(stores));

    // Allow tests or deployments to override port via env
    let port = std::env::var("QUORUM_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Quorum governance API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
