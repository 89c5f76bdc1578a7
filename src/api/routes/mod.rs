pub mod chat;
pub mod documents;
pub mod health;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{middleware::request_logger, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let body_limit = state.config.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/{id}/history", get(sessions::get_history))
        .route("/sessions/{id}/documents", post(documents::upload_document))
        .route("/sessions/{id}/chat", post(chat::chat))
        .route("/sessions/{id}/chat/stream", post(chat::chat_stream))
        .route("/documents", get(documents::list_documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use futures::{stream, StreamExt};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::application::{DocumentService, SessionRegistry, SessionServices};
    use crate::domain::{
        ports::{DocumentStore, EmbeddingService, LlmService, TextExtractor, TextStream},
        DomainError, Embedding, PromptTemplate,
    };
    use crate::infrastructure::{AppConfig, InMemoryIndexFactory};

    struct NoStore;

    #[async_trait]
    impl DocumentStore for NoStore {
        async fn exists(&self, _name: &str) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn save(&self, name: &str, _bytes: &[u8]) -> Result<PathBuf, DomainError> {
            Ok(PathBuf::from(name))
        }

        async fn list(&self) -> Result<Vec<String>, DomainError> {
            Ok(vec!["kept.pdf".to_string()])
        }
    }

    struct Utf8Extractor;

    impl TextExtractor for Utf8Extractor {
        fn extract(&self, bytes: &[u8]) -> Result<String, DomainError> {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    struct UnitEmbedding;

    #[async_trait]
    impl EmbeddingService for UnitEmbedding {
        async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
            Ok(Embedding::new(vec![1.0, 0.0]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            Ok(texts.iter().map(|_| Embedding::new(vec![1.0, 0.0])).collect())
        }

        fn model_name(&self) -> &str {
            "unit"
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmService for EchoLlm {
        async fn generate(&self, _prompt: &str) -> Result<TextStream, DomainError> {
            let parts = vec![Ok("bl".to_string()), Ok("ue".to_string())];
            Ok(stream::iter(parts).boxed())
        }
    }

    /// Streams one fragment and then never finishes.
    struct StallingLlm;

    #[async_trait]
    impl LlmService for StallingLlm {
        async fn generate(&self, _prompt: &str) -> Result<TextStream, DomainError> {
            let head = stream::iter(vec![Ok("bl".to_string())]);
            Ok(head.chain(stream::pending()).boxed())
        }
    }

    fn test_router() -> Router {
        test_router_with(Arc::new(EchoLlm))
    }

    fn test_router_with(llm: Arc<dyn LlmService>) -> Router {
        let services = SessionServices {
            documents: Arc::new(DocumentService::new(
                Arc::new(NoStore),
                Arc::new(Utf8Extractor),
            )),
            embedding: Arc::new(UnitEmbedding),
            llm,
            index_factory: Arc::new(InMemoryIndexFactory),
            template: PromptTemplate::default(),
            top_k: 4,
        };
        let registry = SessionRegistry::new(Arc::new(services), chrono::Duration::hours(1));
        create_router(AppState::new(AppConfig::default(), registry))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(Request::post("/api/v1/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        assert_eq!(body["phase"], "awaiting_upload");
        assert_eq!(body["message"], "Please upload a PDF file.");
        body["session_id"].as_str().unwrap().to_string()
    }

    fn multipart_upload(
        session_id: &str,
        filename: &str,
        content_type: &str,
        data: &str,
    ) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n--{boundary}--\r\n"
        );
        Request::post(format!("/api/v1/sessions/{session_id}/documents"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn chat_request(session_id: &str, question: &str) -> Request<Body> {
        Request::post(format!("/api/v1/sessions/{session_id}/chat"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let response = test_router()
            .oneshot(
                Request::get(format!("/api/v1/sessions/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_before_upload_is_conflict() {
        let app = test_router();
        let id = create_session(&app).await;

        let response = app.clone().oneshot(chat_request(&id, "hi")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let history = app
            .oneshot(
                Request::get(format!("/api/v1/sessions/{id}/history"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(history).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_rejected() {
        let app = test_router();
        let id = create_session(&app).await;

        let response = app
            .oneshot(multipart_upload(&id, "notes.txt", "text/plain", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_upload_then_chat() {
        let app = test_router();
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(multipart_upload(
                &id,
                "sky.pdf",
                "application/pdf",
                "The sky is blue.",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ingested");
        assert_eq!(body["storage_name"], "sky.pdf");
        assert_eq!(body["phase"], "ready");

        let response = app
            .clone()
            .oneshot(chat_request(&id, "What color is the sky?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "blue");
        assert_eq!(body["sources"][0]["source"], "sky.pdf");

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["phase"], "ready");
        assert_eq!(body["ready"], true);
        assert_eq!(body["memory_turns"], 1);
        assert_eq!(body["history"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_chat_stream_emits_fragments_then_done() {
        let app = test_router();
        let id = create_session(&app).await;
        app.clone()
            .oneshot(multipart_upload(
                &id,
                "sky.pdf",
                "application/pdf",
                "The sky is blue.",
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::post(format!("/api/v1/sessions/{id}/chat/stream"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"question":"Color?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let sources = text.find("sources").unwrap();
        let fragment = text.find("fragment").unwrap();
        let done = text.find("done").unwrap();
        assert!(sources < fragment && fragment < done);
        assert!(text.contains(r#"{"answer":"blue"}"#));
    }

    #[tokio::test]
    async fn test_disconnect_mid_stream_abandons_answer() {
        let app = test_router_with(Arc::new(StallingLlm));
        let id = create_session(&app).await;
        app.clone()
            .oneshot(multipart_upload(
                &id,
                "sky.pdf",
                "application/pdf",
                "The sky is blue.",
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/sessions/{id}/chat/stream"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"question":"Color?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut frames = response.into_body().into_data_stream();
        let mut seen = String::new();
        while !seen.contains("fragment") {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(5), frames.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            seen.push_str(&String::from_utf8_lossy(&frame));
        }
        assert!(seen.find("sources").unwrap() < seen.find("fragment").unwrap());
        drop(frames);

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["phase"], "ready");
        assert_eq!(body["memory_turns"], 0);
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["role"], "user");
    }

    #[tokio::test]
    async fn test_list_documents() {
        let response = test_router()
            .oneshot(Request::get("/api/v1/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["documents"][0], "kept.pdf");
    }
}
