//! HTTP surface: upload, purge and chat routes over the RAG pipelines.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use pdfqa_core::config::ServerSettings;
use pdfqa_core::error::ErrorClass;
use pdfqa_core::Error;
use pdfqa_rag::{IngestionPipeline, QueryPipeline};
use pdfqa_vector::VectorIndexCache;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestionPipeline>,
    pub query: Arc<QueryPipeline>,
    pub cache: Arc<VectorIndexCache>,
}

pub fn router(state: AppState, server: &ServerSettings) -> Router {
    Router::new()
        .route("/upload-pdf", post(upload_pdf))
        .route("/delete-all-data", delete(delete_all_data))
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// JSON error body under a route-specific key (`detail` or `error`).
struct ApiError {
    status: StatusCode,
    key: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), serde_json::Value::String(self.message));
        (self.status, Json(body)).into_response()
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err.class() {
        ErrorClass::Client => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: &Error, key: &'static str) -> ApiError {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }
    ApiError { status, key, message: err.to_string() }
}

async fn upload_pdf(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<serde_json::Value>, ApiError> {
    let invalid = |msg: String| api_error(&Error::InvalidUpload(msg), "detail");
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| invalid(e.body_text()))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| invalid(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = upload.ok_or_else(|| invalid("missing multipart field `file`".to_string()))?;
    info!(filename = %filename, bytes = bytes.len(), "processing upload");

    state.ingest.ingest(&filename, bytes.to_vec()).await.map_err(|e| api_error(&e, "detail"))?;
    Ok(Json(json!({ "message": "PDF uploaded successfully" })))
}

async fn delete_all_data(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.ingest.purge().await.map_err(|e| api_error(&e, "detail"))?;
    info!(deleted, "all data deleted");
    Ok(Json(json!({ "message": "All data deleted successfully" })))
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    query: String,
}

async fn chat(State(state): State<AppState>, request: Request) -> Result<Json<serde_json::Value>, ApiError> {
    let question = read_query(request).await.map_err(|e| api_error(&e, "error"))?;
    let answer = state.query.ask(&question).await.map_err(|e| api_error(&e, "error"))?;
    Ok(Json(json!({ "response": answer.text })))
}

/// `query` from either a multipart or a urlencoded form.
async fn read_query(request: Request) -> Result<String, Error> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| Error::InvalidQuery(e.body_text()))?;
        while let Some(field) = multipart.next_field().await.map_err(|e| Error::InvalidQuery(e.body_text()))? {
            if field.name() == Some("query") {
                return field.text().await.map_err(|e| Error::InvalidQuery(e.body_text()));
            }
        }
        return Err(Error::InvalidQuery("missing form field `query`".to_string()));
    }
    let Form(form) = Form::<ChatForm>::from_request(request, &()).await.map_err(|e| Error::InvalidQuery(e.body_text()))?;
    Ok(form.query)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "cache": state.cache.state().as_str() }))
}
