//! Check-ins.

use super::{AppState, auth::AuthContext};
use crate::{
    core::{
        attendance::{self, AttendanceFilter, CheckInReceipt, CheckInRequest},
        user::Capability,
    },
    entities::{attendance as attendance_entity, student_credit},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(list_attendance).post(check_in))
        .route("/attendance/{attendance_id}", delete(undo_check_in))
}

async fn list_attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(filter): Query<AttendanceFilter>,
) -> Result<Json<Vec<attendance_entity::Model>>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        attendance::list_attendance(&state.db, school_id, filter).await?,
    ))
}

async fn check_in(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(request): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<CheckInReceipt>)> {
    auth.authorize(&state, school_id, Capability::RecordAttendance)
        .await?;
    let receipt = attendance::check_in(&state.db, school_id, request, Some(auth.user.id)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn undo_check_in(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, attendance_id)): Path<(i64, i64)>,
) -> Result<Json<student_credit::Model>> {
    auth.authorize(&state, school_id, Capability::RecordAttendance)
        .await?;
    Ok(Json(
        attendance::undo_check_in(&state.db, school_id, attendance_id).await?,
    ))
}
