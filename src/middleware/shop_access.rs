use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::types::MemberRole;

/// Validated shop context, injected by middleware after the membership check
#[derive(Clone, Debug)]
pub struct ValidatedShop {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: String,
    pub subscription_status: String,
    /// Caller's role within this shop, from the membership row
    pub role: MemberRole,
}

/// The caller's role in a shop, if any membership row links the two.
pub async fn membership_role(
    pool: &PgPool,
    user_id: Uuid,
    shop_id: Uuid,
) -> Result<Option<MemberRole>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT role FROM memberships WHERE user_id = $1 AND shop_id = $2",
    )
    .bind(user_id)
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(role,)| MemberRole::parse(&role)))
}

/// Membership predicate: true iff a membership row links the user to the
/// shop. Callers decide how to treat lookup errors; request paths go through
/// [`fail_closed`].
pub async fn verify_shop_access(
    pool: &PgPool,
    user_id: Uuid,
    shop_id: Uuid,
) -> Result<bool, sqlx::Error> {
    Ok(membership_role(pool, user_id, shop_id).await?.is_some())
}

/// Collapse a guard lookup to a deny-on-error boolean. Access control fails
/// closed: a database error is treated the same as a missing membership.
pub fn fail_closed(result: Result<bool, sqlx::Error>) -> bool {
    match result {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!("Shop access lookup failed, denying: {}", e);
            false
        }
    }
}

/// Middleware that validates the shop from JWT claims: the shop must exist
/// and be live, and the caller must hold a membership in it. Runs after
/// `jwt_auth_middleware` and injects [`ValidatedShop`] into the request.
pub async fn validate_shop_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let auth_user = request.extensions().get::<AuthUser>()
        .ok_or_else(|| {
            let api_error = ApiError::unauthorized("JWT authentication required before shop validation");
            (
                StatusCode::from_u16(api_error.status_code()).unwrap(),
                Json(api_error.to_json()),
            )
        })?
        .clone();

    let pool = DatabaseManager::pool().await
        .map_err(|e| {
            let api_error: ApiError = e.into();
            (
                StatusCode::from_u16(api_error.status_code()).unwrap(),
                Json(api_error.to_json()),
            )
        })?;

    // The guard: a membership row must link the caller to the shop, and any
    // lookup failure denies
    if !fail_closed(verify_shop_access(&pool, auth_user.user_id, auth_user.shop_id).await) {
        tracing::warn!(
            "Shop access denied: user '{}' is not a member of shop '{}'",
            auth_user.user_id,
            auth_user.shop_id
        );
        let api_error = ApiError::forbidden("Not a member of this shop");
        return Err((
            StatusCode::from_u16(api_error.status_code()).unwrap(),
            Json(api_error.to_json()),
        ));
    }

    // The membership row's role is authoritative over whatever the token
    // carries; a failure here after the guard passed still denies
    let role = match membership_role(&pool, auth_user.user_id, auth_user.shop_id).await {
        Ok(Some(role)) => role,
        Ok(None) | Err(_) => {
            let api_error = ApiError::forbidden("Not a member of this shop");
            return Err((
                StatusCode::from_u16(api_error.status_code()).unwrap(),
                Json(api_error.to_json()),
            ));
        }
    };

    // Shop must exist and not be soft-deleted
    let shop_row: Option<(Uuid, String, String, String, String)> = {
        let lookup = sqlx::query_as(
            r#"
            SELECT id, name, slug, subscription_tier, subscription_status
            FROM shops
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(auth_user.shop_id)
        .fetch_optional(&pool)
        .await;

        match lookup {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Shop lookup failed, denying: {}", e);
                None
            }
        }
    };

    let shop_row = shop_row.ok_or_else(|| {
        tracing::warn!("Shop validation failed: shop '{}' not found", auth_user.shop_id);
        let api_error = ApiError::forbidden("Shop does not exist or is not active");
        (
            StatusCode::from_u16(api_error.status_code()).unwrap(),
            Json(api_error.to_json()),
        )
    })?;

    let (id, name, slug, subscription_tier, subscription_status) = shop_row;
    let validated_shop = ValidatedShop {
        id,
        name,
        slug,
        subscription_tier,
        subscription_status,
        role,
    };

    tracing::debug!("Shop validation successful: {} ({})", validated_shop.name, validated_shop.id);

    request.extensions_mut().insert(validated_shop);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_closed_passes_through_ok() {
        assert!(fail_closed(Ok(true)));
        assert!(!fail_closed(Ok(false)));
    }

    #[test]
    fn fail_closed_denies_on_error() {
        assert!(!fail_closed(Err(sqlx::Error::RowNotFound)));
        assert!(!fail_closed(Err(sqlx::Error::PoolTimedOut)));
    }
}
