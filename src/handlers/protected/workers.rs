use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::Worker;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedShop};
use crate::services::worker_service::{self, NewWorker, WorkerChanges};

/// GET /api/workers - artist roster
pub async fn list(Extension(shop): Extension<ValidatedShop>) -> ApiResult<Vec<Worker>> {
    let pool = DatabaseManager::pool().await?;
    let workers = worker_service::list_workers(&pool, shop.id).await?;
    Ok(ApiResponse::success(workers))
}

/// POST /api/workers
pub async fn create(
    Extension(shop): Extension<ValidatedShop>,
    Json(input): Json<NewWorker>,
) -> ApiResult<Worker> {
    let pool = DatabaseManager::pool().await?;
    let worker = worker_service::create_worker(&pool, shop.id, input).await?;
    Ok(ApiResponse::created(worker))
}

/// PATCH /api/workers/:id
pub async fn update(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
    Json(changes): Json<WorkerChanges>,
) -> ApiResult<Worker> {
    let pool = DatabaseManager::pool().await?;
    let worker = worker_service::update_worker(&pool, shop.id, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Worker not found: {}", id)))?;
    Ok(ApiResponse::success(worker))
}

/// DELETE /api/workers/:id - deletes, or deactivates when history exists
pub async fn delete(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    let removed = worker_service::remove_worker(&pool, shop.id, id).await?;
    if !removed {
        return Err(ApiError::not_found(format!("Worker not found: {}", id)));
    }
    Ok(ApiResponse::<()>::no_content())
}
