//! Document registry metadata.

use sqlx::Row;

use super::repository::Repository;
use crate::errors::AppError;
use crate::models::{Document, NewDocument};

const DOCUMENT_COLUMNS: &str = "id, user_id, name, original_name, path, doc_type, upload_date";

impl Repository {
    // ==================== DOCUMENT OPERATIONS ====================

    /// Record an uploaded file.
    pub async fn create_document(&self, new: &NewDocument) -> Result<Document, AppError> {
        let upload_date = chrono::Local::now().format("%Y-%m-%d").to_string();

        let result = sqlx::query(
            "INSERT INTO documents (user_id, name, original_name, path, doc_type, upload_date) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&new.user_id)
        .bind(&new.name)
        .bind(&new.original_name)
        .bind(&new.path)
        .bind(&new.doc_type)
        .bind(&upload_date)
        .execute(&self.pool)
        .await?;

        Ok(Document {
            id: result.last_insert_rowid(),
            user_id: new.user_id.clone(),
            name: new.name.clone(),
            original_name: new.original_name.clone(),
            path: new.path.clone(),
            doc_type: new.doc_type.clone(),
            upload_date,
        })
    }

    /// List documents, optionally only those owned by `user_id`.
    pub async fn list_documents(&self, user_id: Option<&str>) -> Result<Vec<Document>, AppError> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {} FROM documents WHERE user_id = ? ORDER BY id",
                    DOCUMENT_COLUMNS
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM documents ORDER BY id",
                    DOCUMENT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(document_from_row).collect())
    }

    /// Get a document by ID.
    pub async fn get_document(&self, id: i64) -> Result<Option<Document>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(document_from_row))
    }

    /// Delete a document's metadata.
    pub async fn delete_document(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Not found".to_string()));
        }
        Ok(())
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        original_name: row.get("original_name"),
        path: row.get("path"),
        doc_type: row.get("doc_type"),
        upload_date: row.get("upload_date"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_repository;

    fn document(user_id: &str, name: &str) -> NewDocument {
        NewDocument {
            user_id: user_id.to_string(),
            name: name.to_string(),
            original_name: name.to_string(),
            path: format!("uploads/{}/{}", user_id, name),
            doc_type: "Identity".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let (repo, _dir) = test_repository().await;

        let a = repo.create_document(&document("1", "a.pdf")).await.unwrap();
        let b = repo.create_document(&document("1", "b.pdf")).await.unwrap();
        repo.delete_document(b.id).await.unwrap();
        let c = repo.create_document(&document("1", "c.pdf")).await.unwrap();

        assert!(c.id > b.id);
        assert_ne!(c.id, a.id);
        assert!(repo.get_document(b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filter_by_user() {
        let (repo, _dir) = test_repository().await;

        repo.create_document(&document("1", "a.pdf")).await.unwrap();
        repo.create_document(&document("2", "b.pdf")).await.unwrap();

        assert_eq!(repo.list_documents(None).await.unwrap().len(), 2);
        let mine = repo.list_documents(Some("2")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "b.pdf");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (repo, _dir) = test_repository().await;
        let err = repo.delete_document(7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
