//! Complaint model.

use serde::{Deserialize, Serialize};

/// Status assigned to every newly filed complaint.
pub const STATUS_PENDING: &str = "Pending";

/// A grievance filed by a citizen against a public-service sector.
///
/// `status` is free text. The frontend uses `Pending`, `In Process`,
/// `Resolved` and `Verified`, but any value is stored as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: i64,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub sector: String,
    pub subject: String,
    pub description: String,
    pub location: String,
    pub priority: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for filing a complaint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, alias = "complaint_text")]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// Validated complaint fields.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub user_id: String,
    pub username: Option<String>,
    pub sector: String,
    pub subject: String,
    pub description: String,
    pub location: String,
    pub priority: String,
}

/// Request body for changing a complaint's status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

/// Query string for listing complaints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub sector: Option<String>,
}
