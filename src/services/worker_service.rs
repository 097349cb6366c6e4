use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Worker;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewWorker {
    pub name: String,
    pub specialty: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct WorkerChanges {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_workers(pool: &PgPool, shop_id: Uuid) -> Result<Vec<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(
        r#"
        SELECT id, shop_id, name, specialty, email, phone, is_active, created_at, updated_at
        FROM workers
        WHERE shop_id = $1
        ORDER BY is_active DESC, name
        "#,
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await
}

pub async fn create_worker(
    pool: &PgPool,
    shop_id: Uuid,
    input: NewWorker,
) -> Result<Worker, sqlx::Error> {
    sqlx::query_as::<_, Worker>(
        r#"
        INSERT INTO workers (id, shop_id, name, specialty, email, phone, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, true)
        RETURNING id, shop_id, name, specialty, email, phone, is_active, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(shop_id)
    .bind(&input.name)
    .bind(&input.specialty)
    .bind(&input.email)
    .bind(&input.phone)
    .fetch_one(pool)
    .await
}

pub async fn update_worker(
    pool: &PgPool,
    shop_id: Uuid,
    worker_id: Uuid,
    changes: WorkerChanges,
) -> Result<Option<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(
        r#"
        UPDATE workers SET
            name = COALESCE($3, name),
            specialty = COALESCE($4, specialty),
            email = COALESCE($5, email),
            phone = COALESCE($6, phone),
            is_active = COALESCE($7, is_active),
            updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING id, shop_id, name, specialty, email, phone, is_active, created_at, updated_at
        "#,
    )
    .bind(worker_id)
    .bind(shop_id)
    .bind(&changes.name)
    .bind(&changes.specialty)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await
}

/// Remove a worker. Workers referenced by appointments are deactivated
/// instead, so history stays intact.
pub async fn remove_worker(
    pool: &PgPool,
    shop_id: Uuid,
    worker_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let referenced: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM appointments WHERE shop_id = $1 AND worker_id = $2",
    )
    .bind(shop_id)
    .bind(worker_id)
    .fetch_one(pool)
    .await?;

    let result = if referenced.0 > 0 {
        sqlx::query(
            "UPDATE workers SET is_active = false, updated_at = NOW() WHERE id = $1 AND shop_id = $2",
        )
        .bind(worker_id)
        .bind(shop_id)
        .execute(pool)
        .await?
    } else {
        sqlx::query("DELETE FROM workers WHERE id = $1 AND shop_id = $2")
            .bind(worker_id)
            .bind(shop_id)
            .execute(pool)
            .await?
    };

    Ok(result.rows_affected() > 0)
}
