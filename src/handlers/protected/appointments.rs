use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::Appointment;
use crate::middleware::{ApiResponse, ApiResult, ValidatedShop};
use crate::notify;
use crate::services::appointment_service::{self, NewAppointment};
use crate::services::pipeline_service;
use crate::types::AppointmentStatus;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /api/appointments - upcoming by default, or a calendar window
pub async fn list(
    Extension(shop): Extension<ValidatedShop>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Appointment>> {
    let pool = DatabaseManager::pool().await?;

    let appointments = match (query.from, query.to) {
        (Some(from), Some(to)) => {
            appointment_service::list_between(&pool, shop.id, from, to).await?
        }
        _ => {
            let limit = config::config().api.dashboard_upcoming_limit.max(50);
            appointment_service::list_upcoming(&pool, shop.id, limit).await?
        }
    };

    Ok(ApiResponse::success(appointments))
}

/// POST /api/appointments - book a session and queue the SMS reminder
pub async fn create(
    Extension(shop): Extension<ValidatedShop>,
    Json(input): Json<NewAppointment>,
) -> ApiResult<Appointment> {
    let pool = DatabaseManager::pool().await?;
    let appointment = appointment_service::create_appointment(&pool, shop.id, input).await?;

    // Reminder is best effort and must not hold up the response
    if let Ok(client) = pipeline_service::get_client(&pool, shop.id, appointment.client_id).await {
        if let Some(phone) = client.phone {
            let body = notify::appointment_reminder(&shop.name, &client.name, appointment.starts_at);
            tokio::spawn(async move {
                let notifier = notify::notifier_from_config();
                notify::send_reminder(notifier.as_ref(), &phone, &body).await;
            });
        }
    }

    Ok(ApiResponse::created(appointment))
}

/// POST /api/appointments/:id/cancel
pub async fn cancel(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
) -> ApiResult<Appointment> {
    let pool = DatabaseManager::pool().await?;
    let appointment =
        appointment_service::set_status(&pool, shop.id, id, AppointmentStatus::Canceled).await?;
    Ok(ApiResponse::success(appointment))
}

/// POST /api/appointments/:id/complete
pub async fn complete(
    Extension(shop): Extension<ValidatedShop>,
    Path(id): Path<Uuid>,
) -> ApiResult<Appointment> {
    let pool = DatabaseManager::pool().await?;
    let appointment =
        appointment_service::set_status(&pool, shop.id, id, AppointmentStatus::Completed).await?;
    Ok(ApiResponse::success(appointment))
}
