use axum::{middleware, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use inkline_api::handlers::{protected, public};
use inkline_api::middleware::{jwt_auth_middleware, validate_shop_middleware};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = inkline_api::config::config();
    tracing::info!("Starting Inkline API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("INKLINE_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Inkline API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhooks/billing", axum::routing::post(public::webhooks::billing_post))
        // Authenticated but not shop-scoped (shop provisioning)
        .merge(provisioning_routes())
        // Shop-scoped API
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn provisioning_routes() -> Router {
    use axum::routing::post;
    use protected::shop;

    Router::new()
        .route("/api/shops", post(shop::create))
        .layer(middleware::from_fn(jwt_auth_middleware))
}

fn api_routes() -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(shop_routes())
        .merge(client_routes())
        .merge(worker_routes())
        .merge(appointment_routes())
        .merge(dashboard_routes())
        // Innermost layer added last runs first: JWT, then membership check
        .layer(middleware::from_fn(validate_shop_middleware))
        .layer(middleware::from_fn(jwt_auth_middleware))
}

fn auth_routes() -> Router {
    use protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn shop_routes() -> Router {
    use axum::routing::delete;
    use protected::shop;

    Router::new()
        .route("/api/shop", get(shop::show).patch(shop::rename))
        .route("/api/shop/members", get(shop::members).post(shop::add_member))
        .route("/api/shop/members/:user_id", delete(shop::remove_member))
}

fn client_routes() -> Router {
    use axum::routing::post;
    use protected::clients;

    Router::new()
        // Collection operations
        .route("/api/clients", get(clients::list).post(clients::create))
        // Record operations
        .route(
            "/api/clients/:id",
            get(clients::get)
                .patch(clients::update)
                .delete(clients::delete),
        )
        // Drag-and-drop reorder target
        .route("/api/clients/:id/move", post(clients::move_client))
}

fn worker_routes() -> Router {
    use protected::workers;

    Router::new()
        .route("/api/workers", get(workers::list).post(workers::create))
        .route(
            "/api/workers/:id",
            axum::routing::patch(workers::update).delete(workers::delete),
        )
}

fn appointment_routes() -> Router {
    use axum::routing::post;
    use protected::appointments;

    Router::new()
        .route(
            "/api/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route("/api/appointments/:id/cancel", post(appointments::cancel))
        .route("/api/appointments/:id/complete", post(appointments::complete))
}

fn dashboard_routes() -> Router {
    use protected::dashboard;

    Router::new().route("/api/dashboard", get(dashboard::stats))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Inkline API",
            "version": version,
            "description": "Tattoo studio management API - pipeline, scheduling, billing",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "webhooks": "/webhooks/billing (public - signed)",
                "shops": "/api/shops (protected - provisioning)",
                "shop": "/api/shop, /api/shop/members (protected)",
                "clients": "/api/clients[/:id[/move]] (protected)",
                "workers": "/api/workers[/:id] (protected)",
                "appointments": "/api/appointments[/:id/cancel|complete] (protected)",
                "dashboard": "/api/dashboard (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match inkline_api::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
