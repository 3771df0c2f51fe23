//! Uploaded document metadata.

use serde::{Deserialize, Serialize};

/// Metadata for one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub user_id: String,
    /// Name on disk, possibly suffixed with `_N` to avoid collisions
    pub name: String,
    pub original_name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub upload_date: String,
}

/// Fields recorded when a file has been written to disk.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: String,
    pub name: String,
    pub original_name: String,
    pub path: String,
    pub doc_type: String,
}

/// Query string for listing documents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}
