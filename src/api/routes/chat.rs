use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::application::Session;
use crate::domain::{ports::TextStream, DomainError, PromptContext};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// A retrieved chunk that went into the prompt.
#[derive(Debug, Serialize)]
pub struct SourceRef {
    pub source: String,
    pub chunk_index: usize,
    pub score: f32,
}

fn sources(context: &PromptContext) -> Vec<SourceRef> {
    context
        .retrieved
        .iter()
        .map(|r| SourceRef {
            source: r.chunk.source.clone(),
            chunk_index: r.chunk.chunk_index,
            score: r.score,
        })
        .collect()
}

pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let handle = state.session(id).await?;
    let completed = handle.lock().await.answer(&request.question).await?;

    Ok(Json(ChatResponse {
        session_id: id,
        sources: sources(&completed.context),
        answer: completed.response,
    }))
}

/// Streams the answer as server-sent events: `sources` first, then one
/// `fragment` per generated piece, then `done` or `error`.
///
/// The session stays locked until the stream ends. A client that disconnects
/// mid-answer abandons it, leaving the question without a reply.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock_owned().await;
    let pending = session.ask(&request.question).await?;

    let head = Event::default()
        .event("sources")
        .json_data(json!({ "sources": sources(&pending.context) }));

    let answer = AnswerStream {
        session,
        question: pending.question,
        fragments: pending.fragments,
        response: String::new(),
        finished: false,
    };

    let body = stream::once(async move { head }).chain(stream::unfold(Some(answer), next_event));
    Ok(Sse::new(body).keep_alive(KeepAlive::default()))
}

struct AnswerStream {
    session: OwnedMutexGuard<Session>,
    question: String,
    fragments: TextStream,
    response: String,
    finished: bool,
}

impl Drop for AnswerStream {
    fn drop(&mut self) {
        if !self.finished {
            self.session
                .fail_answer(&DomainError::internal("client disconnected mid-answer"));
        }
    }
}

async fn next_event(
    answer: Option<AnswerStream>,
) -> Option<(Result<Event, axum::Error>, Option<AnswerStream>)> {
    let mut answer = answer?;

    match answer.fragments.next().await {
        Some(Ok(fragment)) => {
            let event = Event::default()
                .event("fragment")
                .json_data(json!({ "text": fragment }));
            answer.response.push_str(&fragment);
            Some((event, Some(answer)))
        }
        Some(Err(e)) => {
            answer.finished = true;
            answer.session.fail_answer(&e);
            Some((error_event(&e), None))
        }
        None => {
            answer.finished = true;
            let response = std::mem::take(&mut answer.response);
            let question = std::mem::take(&mut answer.question);
            let event = match answer.session.finish_answer(&question, &response) {
                Ok(()) => Event::default()
                    .event("done")
                    .json_data(json!({ "answer": response })),
                Err(e) => error_event(&e),
            };
            Some((event, None))
        }
    }
}

fn error_event(err: &DomainError) -> Result<Event, axum::Error> {
    Event::default()
        .event("error")
        .json_data(json!({ "error": err.to_string() }))
}
