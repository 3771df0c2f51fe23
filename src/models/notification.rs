//! Small payloads for the auxiliary endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub user_id: String,
}

/// Query string for notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

/// Approximate coordinates of the server's public IP.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceTranscript {
    pub transcript: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
