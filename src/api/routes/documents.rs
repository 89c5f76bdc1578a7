use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::application::UploadOutcome;
use crate::domain::{ensure_pdf, DomainError, UploadedDocument};

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub phase: &'static str,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

#[derive(Debug, Serialize)]
pub struct StoredDocumentsResponse {
    pub documents: Vec<String>,
}

/// Accepts one PDF in the multipart field `file` and ingests it into the
/// session.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let handle = state.session(id).await?;
    let document = read_pdf_field(multipart).await?;

    let mut session = handle.lock().await;
    let outcome = session.upload(document).await?;

    Ok(Json(UploadResponse {
        session_id: id,
        phase: session.phase().as_str(),
        outcome,
    }))
}

/// Every file in the content directory, across all sessions.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<StoredDocumentsResponse>, ApiError> {
    let documents = state.sessions.services().documents.list().await?;
    Ok(Json(StoredDocumentsResponse { documents }))
}

async fn read_pdf_field(mut multipart: Multipart) -> Result<UploadedDocument, DomainError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| DomainError::validation("file field has no filename"))?;
        ensure_pdf(&filename, field.content_type())?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| DomainError::validation(format!("failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(DomainError::validation(format!("{filename} is empty")));
        }

        return Ok(UploadedDocument::new(filename, bytes.to_vec()));
    }

    Err(DomainError::validation(format!(
        "multipart field `{FILE_FIELD}` is required"
    )))
}
