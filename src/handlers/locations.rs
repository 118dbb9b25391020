use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::locations::{insert_location, reports_since};
use crate::entities::location;
use crate::error::{AppError, AppResult};
use crate::group::{compute_status, RiderPosition};
use crate::utils::geo::is_valid_coordinate;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub id: i32,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<location::Model> for LocationResponse {
    fn from(report: location::Model) -> Self {
        Self {
            id: report.id,
            user_id: report.user_id,
            latitude: report.latitude,
            longitude: report.longitude,
            timestamp: report.timestamp.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RiderInfo {
    pub id: Uuid,
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<RiderPosition> for RiderInfo {
    fn from(rider: RiderPosition) -> Self {
        Self {
            id: rider.user_id,
            lat: rider.latitude,
            lon: rider.longitude,
            timestamp: rider.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupStatusResponse {
    pub total_riders: usize,
    pub distance_meters: f64,
    pub front_user: RiderInfo,
    pub last_user: RiderInfo,
    pub group_last_updated: DateTime<Utc>,
}

/// Record the caller's current position
pub async fn create_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateLocationRequest>,
) -> AppResult<(StatusCode, Json<LocationResponse>)> {
    if !is_valid_coordinate(payload.latitude, payload.longitude) {
        return Err(AppError::BadRequest(
            "Latitude must be within [-90, 90] and longitude within [-180, 180]".to_string(),
        ));
    }

    let report = insert_location(
        &state.db,
        claims.sub,
        payload.latitude,
        payload.longitude,
        Utc::now(),
    )
    .await?;

    tracing::info!(user_id = %report.user_id, report_id = report.id, "Location recorded");

    Ok((StatusCode::CREATED, Json(report.into())))
}

/// Farthest-apart pair among riders active in the window
pub async fn group_status(State(state): State<AppState>) -> AppResult<Json<GroupStatusResponse>> {
    let now = Utc::now();
    let window = state.config.activity_window;

    let reports = reports_since(&state.db, window.cutoff(now)).await?;
    let status = compute_status(reports.into_iter().map(RiderPosition::from), now, window)?;

    tracing::debug!(
        total_riders = status.total_riders,
        distance_meters = status.pair.distance_meters,
        window_hours = window.hours(),
        "Group status computed"
    );

    let distance_meters = status.pair.rounded_distance();

    Ok(Json(GroupStatusResponse {
        total_riders: status.total_riders,
        distance_meters,
        front_user: status.pair.front.into(),
        last_user: status.pair.back.into(),
        group_last_updated: status.computed_at,
    }))
}
