//! Complaint registry.

use chrono::Utc;
use sqlx::Row;

use super::repository::{non_blank, Repository};
use crate::errors::AppError;
use crate::models::{Complaint, NewComplaint, STATUS_PENDING};

const COMPLAINT_COLUMNS: &str = "id, user_id, username, sector, subject, description, location, priority, status, created_at, updated_at";

impl Repository {
    // ==================== COMPLAINT OPERATIONS ====================

    /// File a new complaint with status `Pending`.
    pub async fn create_complaint(&self, new: &NewComplaint) -> Result<Complaint, AppError> {
        let now = Utc::now().to_rfc3339();
        let username = non_blank(new.username.as_deref());

        let result = sqlx::query(
            "INSERT INTO complaints (user_id, username, sector, subject, description, location, priority, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&new.user_id)
        .bind(&username)
        .bind(&new.sector)
        .bind(&new.subject)
        .bind(&new.description)
        .bind(&new.location)
        .bind(&new.priority)
        .bind(STATUS_PENDING)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(complaint_id = id, sector = %new.sector, "Complaint filed");

        Ok(Complaint {
            id,
            user_id: new.user_id.clone(),
            username,
            sector: new.sector.clone(),
            subject: new.subject.clone(),
            description: new.description.clone(),
            location: new.location.clone(),
            priority: new.priority.clone(),
            status: STATUS_PENDING.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List all complaints, oldest first.
    pub async fn list_complaints(&self) -> Result<Vec<Complaint>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM complaints ORDER BY id",
            COMPLAINT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(complaint_from_row).collect())
    }

    /// List complaints whose user id or username matches.
    pub async fn list_complaints_by_user(&self, user: &str) -> Result<Vec<Complaint>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM complaints WHERE user_id = ? OR username = ? ORDER BY id",
            COMPLAINT_COLUMNS
        ))
        .bind(user)
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(complaint_from_row).collect())
    }

    /// List complaints for a sector, ignoring case.
    pub async fn list_complaints_by_sector(
        &self,
        sector: &str,
    ) -> Result<Vec<Complaint>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM complaints WHERE sector = ? COLLATE NOCASE ORDER BY id",
            COMPLAINT_COLUMNS
        ))
        .bind(sector.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(complaint_from_row).collect())
    }

    /// Get a complaint by ID.
    pub async fn get_complaint(&self, id: i64) -> Result<Option<Complaint>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM complaints WHERE id = ?",
            COMPLAINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(complaint_from_row))
    }

    /// Set a complaint's status. Any status text is accepted.
    pub async fn update_complaint_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<Complaint, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE complaints SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Complaint not found".to_string()));
        }

        tracing::info!(complaint_id = id, status, "Complaint status updated");

        self.get_complaint(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Complaint not found".to_string()))
    }
}

fn complaint_from_row(row: &sqlx::sqlite::SqliteRow) -> Complaint {
    Complaint {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        sector: row.get("sector"),
        subject: row.get("subject"),
        description: row.get("description"),
        location: row.get("location"),
        priority: row.get("priority"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
