use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Appointment;
use crate::types::AppointmentStatus;

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(Uuid),
    #[error("Worker {worker_id} already booked in that window")]
    WorkerUnavailable { worker_id: Uuid },
    #[error("Appointment must end after it starts")]
    InvalidWindow,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewAppointment {
    pub client_id: Uuid,
    pub worker_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Create an appointment, rejecting overlaps with the worker's existing
/// scheduled sessions.
pub async fn create_appointment(
    pool: &PgPool,
    shop_id: Uuid,
    input: NewAppointment,
) -> Result<Appointment, AppointmentError> {
    if input.ends_at <= input.starts_at {
        return Err(AppointmentError::InvalidWindow);
    }

    let mut tx = pool.begin().await?;

    let overlapping: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM appointments
        WHERE shop_id = $1 AND worker_id = $2 AND status = 'scheduled'
          AND starts_at < $4 AND ends_at > $3
        "#,
    )
    .bind(shop_id)
    .bind(input.worker_id)
    .bind(input.starts_at)
    .bind(input.ends_at)
    .fetch_one(&mut *tx)
    .await?;

    if overlapping.0 > 0 {
        return Err(AppointmentError::WorkerUnavailable { worker_id: input.worker_id });
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments (id, shop_id, client_id, worker_id, starts_at, ends_at, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, 'scheduled', $7)
        RETURNING id, shop_id, client_id, worker_id, starts_at, ends_at, status, notes, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(shop_id)
    .bind(input.client_id)
    .bind(input.worker_id)
    .bind(input.starts_at)
    .bind(input.ends_at)
    .bind(&input.notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(appointment)
}

/// Upcoming scheduled appointments, soonest first.
pub async fn list_upcoming(
    pool: &PgPool,
    shop_id: Uuid,
    limit: i64,
) -> Result<Vec<Appointment>, AppointmentError> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, shop_id, client_id, worker_id, starts_at, ends_at, status, notes, created_at, updated_at
        FROM appointments
        WHERE shop_id = $1 AND status = 'scheduled' AND starts_at >= NOW()
        ORDER BY starts_at
        LIMIT $2
        "#,
    )
    .bind(shop_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// All appointments in a day window, for the calendar view.
pub async fn list_between(
    pool: &PgPool,
    shop_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Appointment>, AppointmentError> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, shop_id, client_id, worker_id, starts_at, ends_at, status, notes, created_at, updated_at
        FROM appointments
        WHERE shop_id = $1 AND starts_at < $3 AND ends_at > $2
        ORDER BY starts_at
        "#,
    )
    .bind(shop_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn set_status(
    pool: &PgPool,
    shop_id: Uuid,
    appointment_id: Uuid,
    status: AppointmentStatus,
) -> Result<Appointment, AppointmentError> {
    sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointments SET status = $3, updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING id, shop_id, client_id, worker_id, starts_at, ends_at, status, notes, created_at, updated_at
        "#,
    )
    .bind(appointment_id)
    .bind(shop_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(AppointmentError::NotFound(appointment_id))
}
