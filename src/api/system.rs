//! Health, notification, location and voice endpoints.

use axum::extract::{multipart::MultipartRejection, Multipart, Query, State};
use serde::Serialize;

use super::{param, success, success_with_message, ApiResult};
use crate::errors::AppError;
use crate::models::{HealthStatus, Location, Notification, NotificationQuery, VoiceTranscript};
use crate::AppState;

/// Transcript returned until speech recognition is wired in.
pub const PLACEHOLDER_TRANSCRIPT: &str = "Transcription is not implemented in this demo.";

/// `{"notifications": [...]}` payload.
#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
}

/// GET /api/health - Liveness check.
pub async fn health_check() -> ApiResult<HealthStatus> {
    success_with_message(
        HealthStatus {
            status: "ok".to_string(),
        },
        "Server is running",
    )
}

/// GET /api/notifications - Fixed welcome notifications for a user.
pub async fn list_notifications(
    Query(query): Query<NotificationQuery>,
) -> ApiResult<NotificationList> {
    let user_id = param(query.user_id.as_ref()).unwrap_or("anonymous");

    let notifications = vec![
        Notification {
            id: 1,
            title: "Welcome".to_string(),
            message: "Welcome to DigiGov!".to_string(),
            user_id: user_id.to_string(),
        },
        Notification {
            id: 2,
            title: "Tips".to_string(),
            message: "You can upload important documents in Documents tab.".to_string(),
            user_id: user_id.to_string(),
        },
    ];
    success(NotificationList { notifications })
}

/// GET /api/location - Approximate coordinates of the server.
pub async fn get_location(State(state): State<AppState>) -> ApiResult<Location> {
    let location = state.locator.locate().await?;
    success(location)
}

/// POST /api/voice - Accept an `audio` upload and return a placeholder transcript.
pub async fn process_voice(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<VoiceTranscript> {
    let Ok(mut multipart) = multipart else {
        return Err(AppError::Validation("No audio provided".to_string()));
    };
    let mut audio_bytes = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("audio") {
            audio_bytes = Some(field.bytes().await?.len());
        }
    }

    let Some(size) = audio_bytes else {
        return Err(AppError::Validation("No audio provided".to_string()));
    };

    tracing::debug!(size, "Received voice sample");
    success(VoiceTranscript {
        transcript: PLACEHOLDER_TRANSCRIPT.to_string(),
    })
}
