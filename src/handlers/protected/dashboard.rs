use axum::Extension;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, ValidatedShop};
use crate::services::dashboard_service::{self, DashboardStats};

/// GET /api/dashboard - per-shop aggregates
pub async fn stats(Extension(shop): Extension<ValidatedShop>) -> ApiResult<DashboardStats> {
    let pool = DatabaseManager::pool().await?;
    let limit = config::config().api.dashboard_upcoming_limit;
    let stats = dashboard_service::dashboard_stats(&pool, shop.id, limit).await?;
    Ok(ApiResponse::success(stats))
}
