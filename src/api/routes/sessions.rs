use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::application::SessionSnapshot;
use crate::domain::{DomainError, Message};

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub phase: &'static str,
    /// What a client should show before anything has been uploaded.
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
}

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let (session_id, handle) = state.sessions.create().await?;
    let phase = handle.lock().await.phase().as_str();

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            phase,
            message: state.config.prompts.chat.no_document_message.clone(),
        }),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = state.session(id).await?;
    let snapshot = handle.lock().await.snapshot();
    Ok(Json(snapshot))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DomainError::not_found(format!("session {id}")).into())
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let handle = state.session(id).await?;
    let messages = handle.lock().await.history().to_vec();
    Ok(Json(HistoryResponse {
        session_id: id,
        messages,
    }))
}
