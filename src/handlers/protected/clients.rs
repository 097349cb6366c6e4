use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::Client;
use crate::middleware::{ApiResponse, ApiResult, ValidatedShop};
use crate::services::pipeline_service::{self, ClientChanges, NewClient};
use crate::types::PipelineStage;

/// GET /api/clients - full pipeline board for the shop
pub async fn list(Extension(shop): Extension<ValidatedShop>) -> ApiResult<Vec<Client>> {
    let pool = DatabaseManager::pool().await?;
    let clients = pipeline_service::list_clients(&pool, shop.id).await?;
    Ok(ApiResponse::success(clients))
}

/// POST /api/clients - add a client to the pipeline
pub async fn create(
    Extension(shop): Extension<ValidatedShop>,
    Json(input): Json<NewClient>,
) -> ApiResult<Client> {
    let pool = DatabaseManager::pool().await?;
    let client = pipeline_service::create_client(&pool, shop.id, input).await?;
    Ok(ApiResponse::created(client))
}

/// GET /api/clients/:id
pub async fn get(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
) -> ApiResult<Client> {
    let pool = DatabaseManager::pool().await?;
    let client = pipeline_service::get_client(&pool, shop.id, id).await?;
    Ok(ApiResponse::success(client))
}

/// PATCH /api/clients/:id - contact fields and notes
pub async fn update(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
    Json(changes): Json<ClientChanges>,
) -> ApiResult<Client> {
    let pool = DatabaseManager::pool().await?;
    let client = pipeline_service::update_client(&pool, shop.id, id, changes).await?;
    Ok(ApiResponse::success(client))
}

/// DELETE /api/clients/:id
pub async fn delete(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    pipeline_service::delete_client(&pool, shop.id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub stage: PipelineStage,
    pub position: i32,
}

/// POST /api/clients/:id/move - drag-and-drop reorder target
///
/// Returns the post-move record; the optimistic UI reconciles against it or
/// reverts on error.
pub async fn move_client(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Client> {
    let pool = DatabaseManager::pool().await?;
    let client =
        pipeline_service::move_client(&pool, shop.id, id, req.stage, req.position).await?;
    Ok(ApiResponse::success(client))
}
