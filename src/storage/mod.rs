//! Upload storage on the local filesystem.
//!
//! Files live at `{base}/{user}/{name}`. Names are claimed with `create_new`,
//! so two uploads of the same name for the same user never overwrite each
//! other; the later one gets a `_N` suffix before the extension.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::errors::AppError;

/// Folder used when an upload carries no user id.
pub const ANONYMOUS_FOLDER: &str = "anonymous";

/// Give up after this many suffixed candidates.
const MAX_NAME_ATTEMPTS: usize = 10_000;

/// A file written to the upload tree.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Name on disk
    pub name: String,
    /// Sanitized client-supplied name
    pub original_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, AppError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create upload directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Upload store initialized");

        Ok(Self { base_path })
    }

    /// Where a file named `name` for `user_id` lives.
    pub fn path_for(&self, user_id: &str, name: &str) -> PathBuf {
        self.base_path.join(user_folder(user_id)).join(name)
    }

    /// Write `data` into the user's folder under a free name derived from `filename`.
    pub async fn save(
        &self,
        user_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<StoredFile, AppError> {
        let original_name = sanitize_filename(filename)
            .ok_or_else(|| AppError::Validation("Empty filename".to_string()))?;

        let folder = self.base_path.join(user_folder(user_id));
        fs::create_dir_all(&folder).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = numbered_name(&original_name, attempt);
            let path = folder.join(&name);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_all(&mut file, data).await {
                drop(file);
                fs::remove_file(&path).await.ok();
                return Err(e.into());
            }

            debug!(path = %path.display(), size = data.len(), "Stored upload");
            return Ok(StoredFile {
                name,
                original_name,
                path,
            });
        }

        Err(AppError::Storage(format!(
            "No free file name for '{}'",
            original_name
        )))
    }

    /// Resolve a stored path for reading. `None` if the file no longer exists.
    pub async fn locate(&self, stored_path: &str) -> Result<Option<PathBuf>, AppError> {
        let resolved = match fs::canonicalize(stored_path).await {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let base = fs::canonicalize(&self.base_path).await?;
        if !resolved.starts_with(&base) {
            tracing::warn!(path = %stored_path, "Stored path escapes the upload directory");
            return Err(AppError::BadRequest("Invalid document path".to_string()));
        }
        Ok(Some(resolved))
    }

    /// Remove a stored file. Missing files are not an error.
    pub async fn remove(&self, stored_path: &str) -> Result<(), AppError> {
        let Some(path) = self.locate(stored_path).await? else {
            return Ok(());
        };
        fs::remove_file(&path).await?;
        debug!(path = %path.display(), "Removed upload");
        Ok(())
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Whitespace becomes `_`, anything outside `[A-Za-z0-9._-]` is dropped and
/// leading or trailing dots and underscores are trimmed.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let flattened = filename.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Owner id to record for an upload; blank ids belong to [`ANONYMOUS_FOLDER`].
///
/// The id doubles as the folder name, so anything that is not already a safe
/// path component is rejected rather than rewritten.
pub fn upload_owner(user_id: &str) -> Result<String, AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Ok(ANONYMOUS_FOLDER.to_string());
    }
    match sanitize_filename(user_id) {
        Some(clean) if clean == user_id => Ok(clean),
        _ => Err(AppError::Validation("Invalid user id".to_string())),
    }
}

/// Directory name for a user's uploads.
pub fn user_folder(user_id: &str) -> String {
    sanitize_filename(user_id).unwrap_or_else(|| ANONYMOUS_FOLDER.to_string())
}

/// `report.pdf` -> `report_2.pdf` for attempt 2; attempt 0 keeps the name.
fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &name[..dot], attempt, &name[dot..]),
        _ => format!("{}_{}", name, attempt),
    }
}

/// Types a browser would render as active content in the API's origin.
const ACTIVE_CONTENT: [&str; 7] = [
    "text/html",
    "application/xhtml+xml",
    "image/svg+xml",
    "text/javascript",
    "application/javascript",
    "text/xml",
    "application/xml",
];

/// Content type for inline viewing, guessed from the extension.
pub fn content_type_for(name: &str) -> String {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    if ACTIVE_CONTENT.contains(&mime.essence_str()) {
        return mime_guess::mime::APPLICATION_OCTET_STREAM.to_string();
    }
    mime.to_string()
}
