//! Document endpoints: upload, list, and update/retry

use axum::extract::{Multipart, Query, State};
use axum::Json;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::extract::FileFormat;
use crate::processing::IngestJob;
use crate::server::auth::AuthUser;
use crate::server::state::AppState;
use crate::types::document::{Document, DocumentStatus};
use crate::types::request::{DocumentListParams, DocumentUpdateRequest};
use crate::types::response::{DocumentListResponse, DocumentUpdateResponse, UploadResponse};

const DEFAULT_LIST_LIMIT: usize = 10;

/// POST /api/documents/upload - store the file and queue it for processing
pub async fn upload_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload: Option<(String, String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .unwrap_or("document")
            .to_string();
        let mime_type = field
            .content_type()
            .ok_or_else(|| Error::Validation("file content type is required".into()))?
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("failed to read upload: {e}")))?;
        upload = Some((file_name, mime_type, data));
        break;
    }

    let (file_name, mime_type, data) =
        upload.ok_or_else(|| Error::Validation("file field is required".into()))?;

    if !FileFormat::is_supported(&mime_type) {
        return Err(Error::UnsupportedFormat(mime_type));
    }
    if data.is_empty() {
        return Err(Error::Validation("uploaded file is empty".into()));
    }

    let document_id = Uuid::new_v4();
    let storage_path = format!("{user_id}/{document_id}/{file_name}");
    state.blobs().upload(&storage_path, &data).await?;

    let mut document = Document::new(
        user_id,
        file_name.clone(),
        mime_type.clone(),
        data.len() as u64,
        storage_path.clone(),
    );
    document.id = document_id;
    state.store().insert_document(&document).await?;

    state
        .queue()
        .submit(IngestJob {
            document_id,
            user_id,
            file_path: storage_path,
            file_name,
            file_type: mime_type,
            retry: false,
        })
        .await?;

    tracing::info!(document_id = %document_id, user_id = %user_id, "document uploaded and queued");
    Ok(Json(UploadResponse { document }))
}

/// GET /api/documents - list the caller's documents, newest first
pub async fn list_documents(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<DocumentListParams>,
) -> Result<Json<DocumentListResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let status = params
        .status
        .as_deref()
        .map(DocumentStatus::parse)
        .transpose()?;

    let (documents, count) = state
        .store()
        .list_documents(user_id, status, limit, offset)
        .await?;

    Ok(Json(DocumentListResponse {
        documents,
        count,
        limit,
        offset,
    }))
}

/// PATCH /api/documents - rename, override status, or retry a failed document
pub async fn update_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<DocumentUpdateRequest>,
) -> Result<Json<DocumentUpdateResponse>> {
    // Validate the mutation before touching anything
    let name = match &request.name {
        Some(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(Error::Validation("Invalid document name".into()));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };
    let status = request
        .status
        .as_deref()
        .map(DocumentStatus::parse)
        .transpose()?;

    if name.is_none() && status.is_none() && !request.retry_processing {
        return Err(Error::Validation("No valid fields to update".into()));
    }

    let document = state
        .store()
        .get_document_owned(request.id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound("Document not found or access denied".into()))?;

    let mut status = status;
    if request.retry_processing {
        if document.status != DocumentStatus::Failed {
            return Err(Error::Validation(
                "Only failed documents can be retried".into(),
            ));
        }
        // failed -> pending, then back through the queue
        status = Some(DocumentStatus::Pending);
    }

    let updated = state
        .store()
        .update_document(request.id, user_id, name.as_deref(), status)
        .await?
        .ok_or_else(|| Error::NotFound("Document not found or access denied".into()))?;

    if request.retry_processing {
        state
            .queue()
            .submit(IngestJob {
                document_id: document.id,
                user_id,
                file_path: document.storage_path.clone(),
                file_name: document.name.clone(),
                file_type: document.mime_type.clone(),
                retry: true,
            })
            .await?;
        tracing::info!(document_id = %document.id, "failed document re-queued");
    }

    Ok(Json(DocumentUpdateResponse {
        message: "Document updated successfully".into(),
        document: updated,
    }))
}
