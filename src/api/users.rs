//! Registration and login endpoints for citizens and officials.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;

use super::{field, require_fields, success_with_message, ApiResult};
use crate::errors::AppError;
use crate::models::{
    LoginRequest, NewCitizen, NewOfficial, OfficialLoginRequest, RegisterCitizenRequest,
    RegisterOfficialRequest, User,
};
use crate::AppState;

/// `{"user": ...}` payload for citizen endpoints.
#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: User,
}

/// `{"official": ...}` payload for official endpoints.
#[derive(Debug, Serialize)]
pub struct OfficialPayload {
    pub official: User,
}

/// POST /api/register - Register a citizen.
pub async fn register_citizen(
    State(state): State<AppState>,
    payload: Result<Json<RegisterCitizenRequest>, JsonRejection>,
) -> ApiResult<UserPayload> {
    let Json(request) = payload?;

    require_fields(&[
        ("name", request.name.as_deref()),
        ("phone", request.phone.as_deref()),
        ("password", request.password.as_deref()),
        ("aadhaar", request.aadhaar.as_deref()),
    ])?;

    let new = NewCitizen {
        name: field(request.name),
        phone: field(request.phone),
        password: request.password.unwrap_or_default(),
        aadhaar: field(request.aadhaar),
        email: request.email,
        address: request.address,
    };

    let user = state.repo.register_citizen(&new).await?;
    success_with_message(UserPayload { user }, "Registration successful")
}

/// POST /api/login - Log a citizen in by phone number.
pub async fn login_citizen(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<UserPayload> {
    let Json(request) = payload?;

    let (Some(phone), Some(password)) = (request.phone, request.password) else {
        return Err(AppError::Validation(
            "Phone and password are required".to_string(),
        ));
    };

    let user = state
        .repo
        .authenticate_citizen(phone.trim(), &password)
        .await?;
    success_with_message(UserPayload { user }, "Login successful")
}

/// POST /api/official/register - Register an official.
pub async fn register_official(
    State(state): State<AppState>,
    payload: Result<Json<RegisterOfficialRequest>, JsonRejection>,
) -> ApiResult<OfficialPayload> {
    let Json(request) = payload?;

    require_fields(&[
        ("empId", request.emp_id.as_deref()),
        ("name", request.name.as_deref()),
        ("department", request.department.as_deref()),
        ("category", request.category.as_deref()),
        ("password", request.password.as_deref()),
    ])?;

    let new = NewOfficial {
        emp_id: field(request.emp_id),
        name: field(request.name),
        department: field(request.department),
        category: field(request.category),
        password: request.password.unwrap_or_default(),
    };

    let official = state.repo.register_official(&new).await?;
    success_with_message(OfficialPayload { official }, "Official registered successfully")
}

/// POST /api/official/login - Log an official in by employee id.
pub async fn login_official(
    State(state): State<AppState>,
    payload: Result<Json<OfficialLoginRequest>, JsonRejection>,
) -> ApiResult<OfficialPayload> {
    let Json(request) = payload?;

    let (Some(emp_id), Some(password)) = (request.emp_id, request.password) else {
        return Err(AppError::Validation(
            "Employee ID and password are required".to_string(),
        ));
    };

    let official = state
        .repo
        .authenticate_official(emp_id.trim(), &password)
        .await?;
    success_with_message(OfficialPayload { official }, "Login successful")
}
