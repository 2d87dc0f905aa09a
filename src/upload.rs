//! Eligibility-document storage: an opaque blob store keyed by filename.
//!
//! Files land under the configured upload directory with a uuid-prefixed,
//! sanitized name; that name is what an originador record references in
//! `arquivo_elegibilidade`.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{AppError, ResultExt};
use crate::handlers::AppState;
use crate::models::UploadResponse;

/// Strips any path components and keeps a conservative character set, so a
/// client-supplied name can never escape the upload directory.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "arquivo".to_string()
    } else {
        cleaned
    }
}

/// POST /api/upload/elegibilidade
///
/// Accepts one multipart file field; the request body limit layer caps the
/// size before this handler runs.
pub async fn upload_elegibilidade(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let stored_name = format!("{}-{}", Uuid::new_v4(), sanitize_filename(&original_name));

        tokio::fs::create_dir_all(&state.config.upload_dir)
            .await
            .context("failed to create upload directory")?;

        let path = std::path::Path::new(&state.config.upload_dir).join(&stored_name);
        tokio::fs::write(&path, &data)
            .await
            .context("failed to persist uploaded file")?;

        tracing::info!(
            "User {} uploaded eligibility document {} ({} bytes)",
            user.id,
            stored_name,
            data.len()
        );

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                filename: stored_name,
                size: data.len(),
            }),
        ));
    }

    Err(AppError::BadRequest("No file field in request".to_string()))
}

/// GET /api/upload/elegibilidade/:filename
pub async fn download_elegibilidade(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Stored names never contain separators; anything else is traversal.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(AppError::BadRequest("Invalid filename".to_string()));
    }

    let path = std::path::Path::new(&state.config.upload_dir).join(&filename);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("File {} not found", filename)));
        }
        Err(e) => return Err(AppError::Internal(format!("failed to read file: {}", e))),
    };

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::sanitize_filename;

    #[test]
    fn strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\doc.pdf"), "doc.pdf");
    }

    #[test]
    fn keeps_safe_characters() {
        assert_eq!(
            sanitize_filename("relatorio_2024-01.pdf"),
            "relatorio_2024-01.pdf"
        );
    }

    #[test]
    fn degenerate_names_get_a_fallback() {
        assert_eq!(sanitize_filename("///"), "arquivo");
        assert_eq!(sanitize_filename("??!!"), "arquivo");
        assert_eq!(sanitize_filename(".."), "arquivo");
    }
}
