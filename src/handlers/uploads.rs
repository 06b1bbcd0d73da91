use axum::{
    Json,
    extract::{Multipart, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{PresignedUrlRequest, PresignedUrlResponse, UploadResponse},
};

/// Multipart field holding the uploaded file.
const FILE_FIELD: &str = "file";

/// Builds a fresh object key `uploads/<uuid>.<ext>`, taking the extension from
/// the client's filename (`bin` when it has none).
pub fn object_key_for(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string());
    format!("uploads/{}.{}", Uuid::new_v4(), extension)
}

/// upload_file
///
/// [Authenticated Route] Direct multipart upload through the server. The body
/// is capped at `MAX_UPLOAD_BYTES`; larger files are refused before storage.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing or oversized file", body = crate::error::ErrorBody)
    )
)]
pub async fn upload_file(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let key = object_key_for(field.file_name().unwrap_or_default());
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("file is empty".to_string()));
        }
        if bytes.len() > state.config.max_upload_bytes {
            return Err(ApiError::BadRequest(format!(
                "file exceeds the {} byte upload limit",
                state.config.max_upload_bytes
            )));
        }

        let size = bytes.len();
        let url = state
            .storage
            .put_object(&key, bytes.to_vec(), &content_type)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        tracing::info!(user_id = %user.id, %key, size, "file uploaded");
        return Ok(Json(UploadResponse { key, url, size }));
    }

    Err(ApiError::BadRequest("missing `file` field".to_string()))
}

/// get_presigned_url
///
/// [Authenticated Route] A short-lived URL the client can PUT the file to
/// directly, constrained to `file_type`.
#[utoipa::path(
    post,
    path = "/api/upload/presigned",
    request_body = PresignedUrlRequest,
    responses((status = 200, description = "URL", body = PresignedUrlResponse))
)]
pub async fn get_presigned_url(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let object_key = object_key_for(&payload.filename);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
