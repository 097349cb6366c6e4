use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Membership, Shop};
use crate::types::{MemberRole, SubscriptionTier};

#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error("Shop not found: {0}")]
    NotFound(Uuid),
    #[error("Shop slug already in use: {0}")]
    SlugTaken(String),
    #[error("Invalid shop name: {0}")]
    InvalidName(String),
    #[error("User is already a member")]
    AlreadyMember,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Validate shop name follows rules
fn validate_shop_name(name: &str) -> Result<(), ShopError> {
    let trimmed = name.trim();
    if trimmed.len() < 2 {
        return Err(ShopError::InvalidName("Shop name must be at least 2 characters".to_string()));
    }
    if trimmed.len() > 100 {
        return Err(ShopError::InvalidName("Shop name must be less than 100 characters".to_string()));
    }
    Ok(())
}

/// Derive a URL slug from the shop name
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Create a shop and make the creator its owner, atomically.
pub async fn create_shop(
    pool: &PgPool,
    name: &str,
    owner_user_id: Uuid,
    owner_email: &str,
) -> Result<Shop, ShopError> {
    validate_shop_name(name)?;
    let slug = slugify(name);

    let mut tx = pool.begin().await?;

    let taken: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM shops WHERE slug = $1 AND deleted_at IS NULL",
    )
    .bind(&slug)
    .fetch_one(&mut *tx)
    .await?;
    if taken.0 > 0 {
        return Err(ShopError::SlugTaken(slug));
    }

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        INSERT INTO shops (id, name, slug, subscription_tier, subscription_status)
        VALUES ($1, $2, $3, $4, 'active')
        RETURNING id, name, slug, subscription_tier, subscription_status,
                  billing_customer_id, billing_subscription_id,
                  created_at, updated_at, deleted_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name.trim())
    .bind(&slug)
    .bind(SubscriptionTier::Free.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO memberships (id, shop_id, user_id, email, role) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(shop.id)
    .bind(owner_user_id)
    .bind(owner_email)
    .bind(MemberRole::Owner.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(shop)
}

pub async fn get_shop(pool: &PgPool, shop_id: Uuid) -> Result<Shop, ShopError> {
    sqlx::query_as::<_, Shop>(
        r#"
        SELECT id, name, slug, subscription_tier, subscription_status,
               billing_customer_id, billing_subscription_id,
               created_at, updated_at, deleted_at
        FROM shops
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(shop_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ShopError::NotFound(shop_id))
}

pub async fn rename_shop(pool: &PgPool, shop_id: Uuid, name: &str) -> Result<Shop, ShopError> {
    validate_shop_name(name)?;

    sqlx::query_as::<_, Shop>(
        r#"
        UPDATE shops SET name = $2, updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING id, name, slug, subscription_tier, subscription_status,
                  billing_customer_id, billing_subscription_id,
                  created_at, updated_at, deleted_at
        "#,
    )
    .bind(shop_id)
    .bind(name.trim())
    .fetch_optional(pool)
    .await?
    .ok_or(ShopError::NotFound(shop_id))
}

pub async fn list_members(pool: &PgPool, shop_id: Uuid) -> Result<Vec<Membership>, ShopError> {
    let members = sqlx::query_as::<_, Membership>(
        r#"
        SELECT id, shop_id, user_id, email, role, created_at
        FROM memberships
        WHERE shop_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

pub async fn add_member(
    pool: &PgPool,
    shop_id: Uuid,
    user_id: Uuid,
    email: &str,
    role: MemberRole,
) -> Result<Membership, ShopError> {
    let existing: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM memberships WHERE shop_id = $1 AND user_id = $2",
    )
    .bind(shop_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    if existing.0 > 0 {
        return Err(ShopError::AlreadyMember);
    }

    let membership = sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO memberships (id, shop_id, user_id, email, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, shop_id, user_id, email, role, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(shop_id)
    .bind(user_id)
    .bind(email)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    Ok(membership)
}

pub async fn remove_member(
    pool: &PgPool,
    shop_id: Uuid,
    user_id: Uuid,
) -> Result<(), ShopError> {
    // The last owner cannot be removed; a shop without owners is orphaned
    sqlx::query(
        r#"
        DELETE FROM memberships
        WHERE shop_id = $1 AND user_id = $2
          AND NOT (
            role = 'owner'
            AND (SELECT COUNT(*) FROM memberships WHERE shop_id = $1 AND role = 'owner') = 1
          )
        "#,
    )
    .bind(shop_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_flattens_punctuation_and_case() {
        assert_eq!(slugify("Iron & Ink Tattoo"), "iron-ink-tattoo");
        assert_eq!(slugify("  Needle's Edge  "), "needle-s-edge");
        assert_eq!(slugify("studio27"), "studio27");
    }

    #[test]
    fn shop_names_are_validated() {
        assert!(validate_shop_name("Iron & Ink").is_ok());
        assert!(validate_shop_name("x").is_err());
        assert!(validate_shop_name(&"n".repeat(101)).is_err());
    }
}
