//! Credential store: citizen and official accounts.

use chrono::Utc;
use sqlx::Row;

use super::repository::{is_unique_violation, non_blank, Repository};
use crate::auth;
use crate::errors::AppError;
use crate::models::{NewCitizen, NewOfficial, Role, User};

pub const DUPLICATE_PHONE: &str = "Phone number already registered";
pub const DUPLICATE_EMP_ID: &str = "Employee ID already registered";
pub const USER_NOT_FOUND: &str = "User not found";
pub const OFFICIAL_NOT_FOUND: &str = "Official not found";
pub const INVALID_PASSWORD: &str = "Invalid password";

const USER_COLUMNS: &str = "id, role, name, phone, aadhaar, email, address, emp_id, department, category, password_hash, created_at";

impl Repository {
    // ==================== USER OPERATIONS ====================

    /// Register a citizen. The phone number must not belong to another citizen.
    pub async fn register_citizen(&self, new: &NewCitizen) -> Result<User, AppError> {
        if self.find_citizen_by_phone(&new.phone).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_PHONE.to_string()));
        }

        let password_hash = auth::hash_password(&new.password)?;
        let now = Utc::now().to_rfc3339();
        let email = non_blank(new.email.as_deref());
        let address = non_blank(new.address.as_deref());

        let result = sqlx::query(
            "INSERT INTO users (role, name, phone, aadhaar, email, address, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(Role::Citizen.as_str())
        .bind(&new.name)
        .bind(&new.phone)
        .bind(&new.aadhaar)
        .bind(&email)
        .bind(&address)
        .bind(&password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        // A concurrent registration may have claimed the phone since the check above
        let result = match result {
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(DUPLICATE_PHONE.to_string()))
            }
            other => other?,
        };

        let id = result.last_insert_rowid();
        tracing::info!(user_id = id, "Registered citizen");

        Ok(User {
            id: id.to_string(),
            role: Role::Citizen,
            name: new.name.clone(),
            phone: Some(new.phone.clone()),
            aadhaar: Some(new.aadhaar.clone()),
            email,
            address,
            emp_id: None,
            department: None,
            category: None,
            created_at: now,
        })
    }

    /// Register an official. The employee id must not belong to another official.
    pub async fn register_official(&self, new: &NewOfficial) -> Result<User, AppError> {
        if self.find_official_by_emp_id(&new.emp_id).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_EMP_ID.to_string()));
        }

        let password_hash = auth::hash_password(&new.password)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (role, name, emp_id, department, category, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(Role::Official.as_str())
        .bind(&new.name)
        .bind(&new.emp_id)
        .bind(&new.department)
        .bind(&new.category)
        .bind(&password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(DUPLICATE_EMP_ID.to_string()))
            }
            other => other?,
        };

        let id = result.last_insert_rowid();
        tracing::info!(user_id = id, "Registered official");

        Ok(User {
            id: id.to_string(),
            role: Role::Official,
            name: new.name.clone(),
            phone: None,
            aadhaar: None,
            email: None,
            address: None,
            emp_id: Some(new.emp_id.clone()),
            department: Some(new.department.clone()),
            category: Some(new.category.clone()),
            created_at: now,
        })
    }

    /// Verify a citizen's phone and password.
    pub async fn authenticate_citizen(&self, phone: &str, password: &str) -> Result<User, AppError> {
        let (user, hash) = self
            .find_citizen_by_phone(phone)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        if !auth::verify_password(password, &hash) {
            return Err(AppError::Unauthorized(INVALID_PASSWORD.to_string()));
        }
        self.upgrade_password_hash(&user.id, password, &hash).await;
        Ok(user)
    }

    /// Verify an official's employee id and password.
    pub async fn authenticate_official(
        &self,
        emp_id: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let (user, hash) = self
            .find_official_by_emp_id(emp_id)
            .await?
            .ok_or_else(|| AppError::NotFound(OFFICIAL_NOT_FOUND.to_string()))?;

        if !auth::verify_password(password, &hash) {
            return Err(AppError::Unauthorized(INVALID_PASSWORD.to_string()));
        }
        self.upgrade_password_hash(&user.id, password, &hash).await;
        Ok(user)
    }

    /// Get a user by ID.
    #[cfg(test)]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let Ok(id) = id.trim().parse::<i64>() else {
            return Ok(None);
        };

        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(|r| user_from_row(r).0))
    }

    /// Number of registered accounts of either role.
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Replace a legacy bcrypt hash after the password was verified.
    ///
    /// Failures are logged; the login itself still succeeds.
    async fn upgrade_password_hash(&self, id: &str, password: &str, stored_hash: &str) {
        if !auth::needs_rehash(stored_hash) {
            return;
        }

        let result = match auth::hash_password(password) {
            Ok(hash) => sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
                .bind(&hash)
                .bind(id.parse::<i64>().unwrap_or_default())
                .execute(&self.pool)
                .await
                .map_err(AppError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => tracing::info!(user_id = %id, "Upgraded legacy password hash"),
            Err(e) => tracing::warn!(user_id = %id, "Failed to upgrade legacy password hash: {}", e),
        }
    }

    async fn find_citizen_by_phone(&self, phone: &str) -> Result<Option<(User, String)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE role = 'citizen' AND phone = ?",
            USER_COLUMNS
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_official_by_emp_id(
        &self,
        emp_id: &str,
    ) -> Result<Option<(User, String)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE role = 'official' AND emp_id = ?",
            USER_COLUMNS
        ))
        .bind(emp_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}

/// Split a row into the public record and its password hash.
fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> (User, String) {
    let id: i64 = row.get("id");
    let role: String = row.get("role");
    let user = User {
        id: id.to_string(),
        role: Role::parse(&role).unwrap_or(Role::Citizen),
        name: row.get("name"),
        phone: row.get("phone"),
        aadhaar: row.get("aadhaar"),
        email: row.get("email"),
        address: row.get("address"),
        emp_id: row.get("emp_id"),
        department: row.get("department"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    };
    (user, row.get("password_hash"))
}
