use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Membership, Shop};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedShop};
use crate::services::shop_service;
use crate::types::MemberRole;

#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
}

/// POST /api/shops - provision a shop; the caller becomes its owner.
/// Mounted outside the shop-validation layer: the caller has no shop yet.
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateShopRequest>,
) -> ApiResult<Shop> {
    let pool = DatabaseManager::pool().await?;
    let shop =
        shop_service::create_shop(&pool, &req.name, auth_user.user_id, &auth_user.email).await?;
    Ok(ApiResponse::created(shop))
}

/// GET /api/shop - the caller's current shop
pub async fn show(Extension(shop): Extension<ValidatedShop>) -> ApiResult<Shop> {
    let pool = DatabaseManager::pool().await?;
    let shop = shop_service::get_shop(&pool, shop.id).await?;
    Ok(ApiResponse::success(shop))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// PATCH /api/shop - shop settings (owner/manager only)
pub async fn rename(
    Extension(shop): Extension<ValidatedShop>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Shop> {
    require_manager(&shop)?;
    let pool = DatabaseManager::pool().await?;
    let shop = shop_service::rename_shop(&pool, shop.id, &req.name).await?;
    Ok(ApiResponse::success(shop))
}

/// GET /api/shop/members
pub async fn members(Extension(shop): Extension<ValidatedShop>) -> ApiResult<Vec<Membership>> {
    let pool = DatabaseManager::pool().await?;
    let members = shop_service::list_members(&pool, shop.id).await?;
    Ok(ApiResponse::success(members))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub email: String,
    pub role: MemberRole,
}

/// POST /api/shop/members (owner/manager only)
pub async fn add_member(
    Extension(shop): Extension<ValidatedShop>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Membership> {
    require_manager(&shop)?;
    let pool = DatabaseManager::pool().await?;
    let membership =
        shop_service::add_member(&pool, shop.id, req.user_id, &req.email, req.role).await?;
    Ok(ApiResponse::created(membership))
}

/// DELETE /api/shop/members/:user_id (owner/manager only)
pub async fn remove_member(
    Extension(shop): Extension<ValidatedShop>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<()> {
    require_manager(&shop)?;
    let pool = DatabaseManager::pool().await?;
    shop_service::remove_member(&pool, shop.id, user_id).await?;
    Ok(ApiResponse::<()>::no_content())
}

fn require_manager(shop: &ValidatedShop) -> Result<(), ApiError> {
    if !shop.role.can_manage() {
        return Err(ApiError::forbidden("Requires owner or manager role"));
    }
    Ok(())
}
