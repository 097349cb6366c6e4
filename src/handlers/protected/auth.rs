use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedShop};

/// GET /api/auth/whoami - authenticated caller and shop context
pub async fn whoami(
    Extension(auth_user): Extension<AuthUser>,
    Extension(shop): Extension<ValidatedShop>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user": {
            "id": auth_user.user_id,
            "email": auth_user.email,
            "role": shop.role,
        },
        "shop": {
            "id": shop.id,
            "name": shop.name,
            "slug": shop.slug,
            "subscription_tier": shop.subscription_tier,
            "subscription_status": shop.subscription_status,
        }
    })))
}
