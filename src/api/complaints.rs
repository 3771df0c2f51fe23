//! Complaint API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{field, param, require_fields, success, success_with_message, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Complaint, ComplaintQuery, CreateComplaintRequest, NewComplaint, UpdateStatusRequest,
};
use crate::AppState;

/// `{"complaints": [...]}` payload.
#[derive(Debug, Serialize)]
pub struct ComplaintList {
    pub complaints: Vec<Complaint>,
}

/// `{"complaint": ...}` payload.
#[derive(Debug, Serialize)]
pub struct ComplaintPayload {
    pub complaint: Complaint,
}

/// GET /api/complaints - List complaints, filtered by user and/or sector.
pub async fn list_complaints(
    State(state): State<AppState>,
    Query(query): Query<ComplaintQuery>,
) -> ApiResult<ComplaintList> {
    let user = param(query.user_id.as_ref()).or(param(query.username.as_ref()));
    let sector = param(query.sector.as_ref());

    let complaints = match (user, sector) {
        (Some(user), Some(sector)) => {
            let mut complaints = state.repo.list_complaints_by_user(user).await?;
            complaints.retain(|c| c.sector.eq_ignore_ascii_case(sector));
            complaints
        }
        (Some(user), None) => state.repo.list_complaints_by_user(user).await?,
        (None, Some(sector)) => state.repo.list_complaints_by_sector(sector).await?,
        (None, None) => state.repo.list_complaints().await?,
    };

    success(ComplaintList { complaints })
}

/// POST /api/complaints - File a complaint.
pub async fn create_complaint(
    State(state): State<AppState>,
    payload: Result<Json<CreateComplaintRequest>, JsonRejection>,
) -> ApiResult<ComplaintPayload> {
    let Json(request) = payload?;

    require_fields(&[
        ("userId", request.user_id.as_deref()),
        ("sector", request.sector.as_deref()),
        ("subject", request.subject.as_deref()),
        ("description", request.description.as_deref()),
        ("location", request.location.as_deref()),
        ("priority", request.priority.as_deref()),
    ])?;

    let new = NewComplaint {
        user_id: field(request.user_id),
        username: request.username,
        sector: field(request.sector),
        subject: field(request.subject),
        description: field(request.description),
        location: field(request.location),
        priority: field(request.priority),
    };

    let complaint = state.repo.create_complaint(&new).await?;
    success_with_message(ComplaintPayload { complaint }, "Complaint filed successfully")
}

/// GET /api/complaints/:id - Get a single complaint.
pub async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ComplaintPayload> {
    match state.repo.get_complaint(id).await? {
        Some(complaint) => success(ComplaintPayload { complaint }),
        None => Err(AppError::NotFound("Complaint not found".to_string())),
    }
}

/// PUT /api/complaints/:id/status - Change a complaint's status.
///
/// The value is not checked against the known statuses.
pub async fn update_complaint_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<ComplaintPayload> {
    let Json(request) = payload?;

    require_fields(&[("status", request.status.as_deref())])?;

    let status = field(request.status);
    let complaint = state.repo.update_complaint_status(id, &status).await?;
    success_with_message(
        ComplaintPayload { complaint },
        &format!("Complaint ID {} updated to status: {}", id, status),
    )
}
