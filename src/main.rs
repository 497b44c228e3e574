use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, routing::post, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use lead_portal_api::audit::{AuditLogger, AuditSeverity};
use lead_portal_api::config;
use lead_portal_api::crm::{DynamicsClient, EnvTokenProvider, RetryPolicy};
use lead_portal_api::handlers::{self, AppState};
use lead_portal_api::identity::{GroupResolver, InitiativeDirectory};
use lead_portal_api::middleware::auth::session_auth_middleware;
use lead_portal_api::services::LeadQueryService;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up CRM_BASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting lead portal API in {:?} mode", config.environment);

    // The initiative directory is loaded once and shared read-only for the
    // process lifetime.
    let directory_path = std::env::var("INITIATIVE_CONFIG_PATH")
        .unwrap_or_else(|_| "config/initiatives.yaml".to_string());
    let directory = match InitiativeDirectory::from_yaml_file(&directory_path) {
        Ok(directory) => Arc::new(directory),
        Err(e) => {
            tracing::error!("Failed to load initiative directory from {}: {}", directory_path, e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        initiatives = directory.initiative_count(),
        "Initiative directory loaded"
    );

    let audit = AuditLogger::new(AuditSeverity::parse(&config.audit.min_severity));
    let tokens = Arc::new(EnvTokenProvider::new("CRM_ACCESS_TOKEN"));
    let client = match DynamicsClient::new(
        &config.crm,
        RetryPolicy::from_config(&config.retry),
        tokens,
        audit.clone(),
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build CRM client: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        leads: Arc::new(LeadQueryService::new(
            client,
            directory.clone(),
            audit.clone(),
            config.query.clone(),
        )),
        resolver: Arc::new(GroupResolver::new(directory.clone(), audit.clone())),
        audit,
    };

    let app = app(state, directory);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Lead portal API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState, directory: Arc<InitiativeDirectory>) -> Router {
    let protected = Router::new()
        .route("/api/leads", get(handlers::leads::leads_list))
        .route("/api/leads/:id", get(handlers::leads::lead_get))
        .layer(axum_middleware::from_fn(session_auth_middleware))
        .with_state(state.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(move || health(directory.clone())))
        .route("/auth/session", post(handlers::session::session_create))
        .with_state(state)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Lead Portal API",
            "version": version,
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "session": "/auth/session (public - session token exchange)",
                "leads": "/api/leads[/:id] (protected)",
            }
        }
    }))
}

async fn health(directory: Arc<InitiativeDirectory>) -> axum::response::Json<Value> {
    let now = chrono::Utc::now();

    axum::response::Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": now,
            "initiatives": directory.initiative_count(),
        }
    }))
}
