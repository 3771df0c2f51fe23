//! One-time import of the flat JSON files used before the SQLite store.
//!
//! Reads `users.json`, `complaints.json` and `documents.json` from a legacy
//! directory inside one transaction. The import is recorded in `meta` and
//! never runs twice.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{Row, Sqlite, Transaction};

use super::repository::{is_unique_violation, non_blank, Repository};
use crate::errors::AppError;
use crate::models::{Role, STATUS_PENDING};
use crate::storage::UploadStore;

/// Counts of what a legacy import brought over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyImportReport {
    pub citizens: usize,
    pub officials: usize,
    pub complaints: usize,
    pub documents: usize,
    pub skipped: usize,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyUsersFile {
    #[serde(default)]
    users: HashMap<String, LegacyUser>,
    #[serde(default)]
    officials: HashMap<String, LegacyUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyUser {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    aadhaar: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    emp_id: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    hashed_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyComplaint {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "userId")]
    user_id: Option<Value>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default, alias = "complaint_text")]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "userId")]
    user_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    original_name: Option<String>,
    #[serde(default, rename = "type")]
    doc_type: Option<String>,
    #[serde(default, alias = "uploadDate")]
    upload_date: Option<String>,
}

impl Repository {
    /// Import legacy JSON files from `legacy_dir` unless an import already ran.
    ///
    /// Returns `None` when the import had already been recorded.
    pub async fn import_legacy(
        &self,
        legacy_dir: &Path,
        uploads: &UploadStore,
    ) -> Result<Option<LegacyImportReport>, AppError> {
        let mut tx = self.pool.begin().await?;

        let imported_at: Option<String> =
            sqlx::query("SELECT legacy_imported_at FROM meta WHERE id = 1")
                .fetch_one(&mut *tx)
                .await?
                .get("legacy_imported_at");
        if let Some(at) = imported_at {
            tracing::debug!("Legacy data already imported at {}", at);
            return Ok(None);
        }

        let mut report = LegacyImportReport::default();

        let users: LegacyUsersFile = read_legacy_file(&legacy_dir.join("users.json"))
            .await?
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        import_users(&mut tx, users, &mut report).await?;

        if let Some(value) = read_legacy_file(&legacy_dir.join("complaints.json")).await? {
            for complaint in complaint_records(value)? {
                import_complaint(&mut tx, complaint, &mut report).await?;
            }
        }

        if let Some(value) = read_legacy_file(&legacy_dir.join("documents.json")).await? {
            let documents = match value {
                Value::Object(mut map) => map.remove("documents").unwrap_or(Value::Null),
                other => other,
            };
            let documents: Vec<LegacyDocument> = match documents {
                Value::Null => Vec::new(),
                other => serde_json::from_value(other)?,
            };
            for document in documents {
                import_document(&mut tx, document, uploads, &mut report).await?;
            }
        }

        sqlx::query("UPDATE meta SET legacy_imported_at = ? WHERE id = 1")
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            citizens = report.citizens,
            officials = report.officials,
            complaints = report.complaints,
            documents = report.documents,
            skipped = report.skipped,
            "Imported legacy data from {}",
            legacy_dir.display()
        );

        Ok(Some(report))
    }
}

/// Read a legacy JSON file. Missing or blank files yield `None`.
async fn read_legacy_file(path: &Path) -> Result<Option<Value>, AppError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&content).map_err(|e| {
        AppError::Internal(format!("Malformed legacy file {}: {}", path.display(), e))
    })?;
    Ok(Some(value))
}

/// Accept both `{"complaints": [...]}` and `{"<id>": {...}}`.
fn complaint_records(value: Value) -> Result<Vec<LegacyComplaint>, AppError> {
    let records = match value {
        Value::Object(mut map) => match map.remove("complaints") {
            Some(Value::Array(list)) => list,
            Some(other) => {
                return Err(AppError::Internal(format!(
                    "Unexpected legacy complaints value: {}",
                    other
                )))
            }
            None => {
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by_key(|(key, _)| key.parse::<i64>().unwrap_or(i64::MAX));
                entries.into_iter().map(|(_, v)| v).collect()
            }
        },
        Value::Array(list) => list,
        Value::Null => Vec::new(),
        other => {
            return Err(AppError::Internal(format!(
                "Unexpected legacy complaints file: {}",
                other
            )))
        }
    };

    records
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(AppError::from))
        .collect()
}

async fn import_users(
    tx: &mut Transaction<'_, Sqlite>,
    file: LegacyUsersFile,
    report: &mut LegacyImportReport,
) -> Result<(), AppError> {
    let mut users: Vec<LegacyUser> = sorted_by_key(file.users)
        .into_iter()
        .map(|(key, mut user)| {
            if user.id.is_none() {
                user.id = Some(Value::String(key));
            }
            user
        })
        .collect();

    let mut known_emp_ids: Vec<String> = users.iter().filter_map(|u| u.emp_id.clone()).collect();

    // Officials kept in the separate map are merged in with fresh ids
    for (_, mut official) in sorted_by_key(file.officials) {
        if let Some(emp_id) = &official.emp_id {
            if known_emp_ids.contains(emp_id) {
                report.skipped += 1;
                continue;
            }
            known_emp_ids.push(emp_id.clone());
        }
        official.id = None;
        official.role = Some(Role::Official.as_str().to_string());
        users.push(official);
    }

    for user in users {
        import_user(tx, user, report).await?;
    }
    Ok(())
}

async fn import_user(
    tx: &mut Transaction<'_, Sqlite>,
    user: LegacyUser,
    report: &mut LegacyImportReport,
) -> Result<(), AppError> {
    // Records written before roles existed are citizens
    let role = user
        .role
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(Role::Citizen);

    let (Some(name), Some(hash)) = (non_blank(user.name.as_deref()), user.hashed_password) else {
        tracing::warn!("Skipping legacy user without name or password hash");
        report.skipped += 1;
        return Ok(());
    };

    let id = free_id(tx, "users", value_as_i64(user.id.as_ref())).await?;
    let created_at = user.created_at.unwrap_or_else(|| Utc::now().to_rfc3339());

    let result = sqlx::query(
        "INSERT INTO users (id, role, name, phone, aadhaar, email, address, emp_id, department, category, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(id)
    .bind(role.as_str())
    .bind(&name)
    .bind(non_blank(user.phone.as_deref()))
    .bind(non_blank(user.aadhaar.as_deref()))
    .bind(non_blank(user.email.as_deref()))
    .bind(non_blank(user.address.as_deref()))
    .bind(non_blank(user.emp_id.as_deref()))
    .bind(non_blank(user.department.as_deref()))
    .bind(non_blank(user.category.as_deref()))
    .bind(&hash)
    .bind(&created_at)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(_) => {
            match role {
                Role::Citizen => report.citizens += 1,
                Role::Official => report.officials += 1,
            }
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => {
            tracing::warn!("Skipping legacy {} '{}': already registered", role.as_str(), name);
            report.skipped += 1;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn import_complaint(
    tx: &mut Transaction<'_, Sqlite>,
    complaint: LegacyComplaint,
    report: &mut LegacyImportReport,
) -> Result<(), AppError> {
    let (Some(user_id), Some(sector)) = (
        value_as_string(complaint.user_id.as_ref()),
        non_blank(complaint.sector.as_deref()),
    ) else {
        tracing::warn!("Skipping legacy complaint without user or sector");
        report.skipped += 1;
        return Ok(());
    };

    let id = free_id(tx, "complaints", value_as_i64(complaint.id.as_ref())).await?;
    let created_at = complaint
        .created_at
        .unwrap_or_else(|| Utc::now().to_rfc3339());
    let status = non_blank(complaint.status.as_deref()).unwrap_or_else(|| STATUS_PENDING.to_string());

    sqlx::query(
        "INSERT INTO complaints (id, user_id, username, sector, subject, description, location, priority, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(id)
    .bind(&user_id)
    .bind(non_blank(complaint.username.as_deref()))
    .bind(&sector)
    .bind(complaint.subject.unwrap_or_default())
    .bind(complaint.description.unwrap_or_default())
    .bind(complaint.location.unwrap_or_default())
    .bind(value_as_string(complaint.priority.as_ref()).unwrap_or_default())
    .bind(&status)
    .bind(&created_at)
    .bind(&created_at)
    .execute(&mut **tx)
    .await?;

    report.complaints += 1;
    Ok(())
}

async fn import_document(
    tx: &mut Transaction<'_, Sqlite>,
    document: LegacyDocument,
    uploads: &UploadStore,
    report: &mut LegacyImportReport,
) -> Result<(), AppError> {
    let Some(name) = non_blank(document.name.as_deref()) else {
        tracing::warn!("Skipping legacy document without a stored name");
        report.skipped += 1;
        return Ok(());
    };

    let user_id = value_as_string(document.user_id.as_ref()).unwrap_or_default();
    let original_name = non_blank(document.original_name.as_deref()).unwrap_or_else(|| name.clone());
    // Files are expected to have been moved into the configured upload tree
    let path = uploads.path_for(&user_id, &name);
    let upload_date = document
        .upload_date
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

    // Old ids were `count + 1` and can repeat after deletions
    let id = free_id(tx, "documents", value_as_i64(document.id.as_ref())).await?;

    sqlx::query(
        "INSERT INTO documents (id, user_id, name, original_name, path, doc_type, upload_date) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(id)
    .bind(&user_id)
    .bind(&name)
    .bind(&original_name)
    .bind(path.to_string_lossy().to_string())
    .bind(document.doc_type.unwrap_or_default())
    .bind(&upload_date)
    .execute(&mut **tx)
    .await?;

    report.documents += 1;
    Ok(())
}

/// Map entries ordered by their numeric key.
fn sorted_by_key<T>(map: HashMap<String, T>) -> Vec<(String, T)> {
    let mut entries: Vec<(String, T)> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| {
        let key = |k: &str| k.trim().parse::<i64>().unwrap_or(i64::MAX);
        key(a).cmp(&key(b)).then_with(|| a.cmp(b))
    });
    entries
}

/// Keep `wanted` if no row in `table` uses it yet, otherwise let SQLite pick.
async fn free_id(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    wanted: Option<i64>,
) -> Result<Option<i64>, AppError> {
    let Some(wanted) = wanted.filter(|id| *id > 0) else {
        return Ok(None);
    };

    let taken = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = ?", table))
        .bind(wanted)
        .fetch_optional(&mut **tx)
        .await?
        .is_some();

    Ok(if taken { None } else { Some(wanted) })
}

fn value_as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
