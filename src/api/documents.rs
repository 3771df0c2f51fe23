//! Document upload and retrieval endpoints.

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::header,
    response::Response,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use super::{param, success, success_with_message, ApiResult, Done};
use crate::errors::AppError;
use crate::models::{Document, DocumentQuery, NewDocument};
use crate::storage::{content_type_for, sanitize_filename, upload_owner};
use crate::AppState;

/// `{"documents": [...]}` payload.
#[derive(Debug, Serialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
}

/// `{"document": ...}` payload.
#[derive(Debug, Serialize)]
pub struct DocumentPayload {
    pub document: Document,
}

/// An opened document file ready to stream.
struct DocumentFile {
    document: Document,
    file: tokio::fs::File,
    len: u64,
}

/// Uploaded file pulled out of a multipart form.
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    user_id: String,
    doc_type: String,
}

/// GET /api/documents - List documents, optionally for one user.
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> ApiResult<DocumentList> {
    let documents = state
        .repo
        .list_documents(param(query.user_id.as_ref()))
        .await?;
    success(DocumentList { documents })
}

/// POST /api/documents - Upload a document (multipart: `file`, `user_id`, `type`).
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<DocumentPayload> {
    let Ok(multipart) = multipart else {
        return Err(AppError::Validation("No file uploaded".to_string()));
    };
    let form = read_upload_form(multipart).await?;

    let Some((filename, data)) = form.file else {
        return Err(AppError::Validation("No file uploaded".to_string()));
    };
    if filename.trim().is_empty() {
        return Err(AppError::Validation("Empty filename".to_string()));
    }
    let user_id = upload_owner(&form.user_id)?;

    let stored = state.uploads.save(&user_id, &filename, &data).await?;
    let stored_path = stored.path.to_string_lossy().to_string();

    let new = NewDocument {
        user_id,
        name: stored.name,
        original_name: stored.original_name,
        path: stored_path.clone(),
        doc_type: form.doc_type,
    };

    match state.repo.create_document(&new).await {
        Ok(document) => {
            tracing::info!(document_id = document.id, user_id = %document.user_id, size = data.len(), "Document uploaded");
            success_with_message(DocumentPayload { document }, "Document uploaded")
        }
        Err(e) => {
            // Do not leave an orphaned file behind
            if let Err(cleanup) = state.uploads.remove(&stored_path).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", stored_path, cleanup);
            }
            Err(e)
        }
    }
}

/// GET /api/documents/:id/download - Send the file as an attachment.
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let opened = open_document_file(&state, id).await?;
    let content_disposition = disposition("attachment", &opened.document);
    file_response(opened, "application/octet-stream".to_string(), &content_disposition)
}

/// GET /api/documents/:id/view - Send the file for inline display.
pub async fn view_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let opened = open_document_file(&state, id).await?;

    // Browsers only render PDFs inline with the exact type
    let content_type = if opened.document.name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf".to_string()
    } else {
        content_type_for(&opened.document.name)
    };
    let content_disposition = disposition("inline", &opened.document);

    file_response(opened, content_type, &content_disposition)
}

/// DELETE /api/documents/:id - Delete a document and its file.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Done> {
    let document = state
        .repo
        .get_document(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    // File removal is best-effort; the record goes regardless
    if let Err(e) = state.uploads.remove(&document.path).await {
        tracing::warn!(document_id = id, "File delete warning: {}", e);
    }

    state.repo.delete_document(id).await?;
    tracing::info!(document_id = id, "Document deleted");
    success_with_message(Done {}, "Document deleted")
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        file: None,
        user_id: String::new(),
        doc_type: String::new(),
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?;
                form.file = Some((filename, data.to_vec()));
            }
            "user_id" | "userId" => form.user_id = field.text().await?.trim().to_string(),
            "type" => form.doc_type = field.text().await?.trim().to_string(),
            _ => {}
        }
    }

    Ok(form)
}

async fn open_document_file(state: &AppState, id: i64) -> Result<DocumentFile, AppError> {
    let document = state
        .repo
        .get_document(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let file_missing = || AppError::NotFound("File missing".to_string());
    let path = state
        .uploads
        .locate(&document.path)
        .await?
        .ok_or_else(file_missing)?;

    // The file may vanish between locating and opening it
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(file_missing()),
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();

    Ok(DocumentFile {
        document,
        file,
        len,
    })
}

/// `Content-Disposition` value naming the original upload.
fn disposition(kind: &str, document: &Document) -> String {
    let filename = sanitize_filename(&document.original_name)
        .or_else(|| sanitize_filename(&document.name))
        .unwrap_or_else(|| format!("document-{}", document.id));
    format!("{}; filename=\"{}\"", kind, filename)
}

fn file_response(
    opened: DocumentFile,
    content_type: String,
    content_disposition: &str,
) -> Result<Response, AppError> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, opened.len)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from_stream(ReaderStream::new(opened.file)))
        .map_err(|e| AppError::Internal(format!("Failed to build file response: {}", e)))
}
