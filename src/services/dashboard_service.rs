use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::Appointment;
use crate::services::appointment_service::{self, AppointmentError};
use crate::types::PipelineStage;

/// Per-shop aggregates backing the dashboard view.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub pipeline_counts: HashMap<String, i64>,
    pub active_workers: i64,
    pub upcoming_appointment_count: i64,
    pub upcoming_appointments: Vec<Appointment>,
}

pub async fn dashboard_stats(
    pool: &PgPool,
    shop_id: Uuid,
    upcoming_limit: i64,
) -> Result<DashboardStats, AppointmentError> {
    let stage_rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT stage, COUNT(*) FROM clients WHERE shop_id = $1 GROUP BY stage",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    // Every stage appears in the response, even when empty
    let mut pipeline_counts: HashMap<String, i64> = PipelineStage::ALL
        .iter()
        .map(|stage| (stage.as_str().to_string(), 0))
        .collect();
    for (stage, count) in stage_rows {
        pipeline_counts.insert(stage, count);
    }

    let (active_workers,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM workers WHERE shop_id = $1 AND is_active = true",
    )
    .bind(shop_id)
    .fetch_one(pool)
    .await?;

    let (upcoming_appointment_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM appointments WHERE shop_id = $1 AND status = 'scheduled' AND starts_at >= NOW()",
    )
    .bind(shop_id)
    .fetch_one(pool)
    .await?;

    let upcoming_appointments =
        appointment_service::list_upcoming(pool, shop_id, upcoming_limit).await?;

    Ok(DashboardStats {
        pipeline_counts,
        active_workers,
        upcoming_appointment_count,
        upcoming_appointments,
    })
}
