// MANIMATOR HTTP Server
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::agent::pdf_tools;
use crate::agent::pipeline::{GenerationSource, DEFAULT_MAX_ATTEMPTS};
use crate::error::{ErrorKind, PipelineError};
use crate::state::AppState;

/// Upper bound on request bodies, PDF uploads included.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SceneResponse {
    pub scene_description: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::NoUsableOutput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Provider => StatusCode::BAD_GATEWAY,
        ErrorKind::Render | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<E: Into<PipelineError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: status_for(err.kind()),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("[SERVER] {} {}", self.status, self.message);
        } else {
            warn!("[SERVER] {} {}", self.status, self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-prompt-scene", post(generate_prompt_scene))
        .route("/generate-pdf-scene", post(generate_pdf_scene))
        .route("/pdf/:arxiv_id", get(generate_arxiv_scene))
        .route("/generate-animation", post(generate_animation))
        .route("/generate-pdf-animation", post(generate_pdf_animation))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let display_addr = if addr.ip().is_unspecified() {
        format!("127.0.0.1:{}", port)
    } else {
        addr.to_string()
    };
    info!("[SERVER] MANIMATOR API running on http://{}", display_addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Body of a JSON prompt request, with extractor rejections reported as
/// input errors in the usual error body.
fn prompt_body(payload: Result<Json<PromptRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    Ok(request.prompt)
}

/// First multipart field named `file`.
async fn uploaded_document(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            info!("[SERVER] PDF upload received ({} bytes)", bytes.len());
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::bad_request("missing multipart field 'file'"))
}

async fn generate_prompt_scene(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<SceneResponse>, ApiError> {
    let prompt = prompt_body(payload)?;
    let scene_description = state.pipeline.scenes().from_prompt(&prompt).await?;
    Ok(Json(SceneResponse { scene_description }))
}

async fn generate_pdf_scene(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SceneResponse>, ApiError> {
    let document = uploaded_document(multipart).await?;
    let scene_description = state.pipeline.scenes().from_document(&document).await?;
    Ok(Json(SceneResponse { scene_description }))
}

async fn generate_arxiv_scene(
    State(state): State<AppState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<SceneResponse>, ApiError> {
    let url = pdf_tools::arxiv_pdf_url(&state.arxiv_pdf_base, &arxiv_id)?;
    let document = pdf_tools::fetch_remote_pdf(&state.http, &url).await?;
    let scene_description = state.pipeline.scenes().from_document(&document).await?;
    Ok(Json(SceneResponse { scene_description }))
}

#[axum::debug_handler]
async fn generate_animation(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let prompt = prompt_body(payload)?;
    video_response(&state, GenerationSource::Prompt(prompt)).await
}

#[axum::debug_handler]
async fn generate_pdf_animation(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let document = uploaded_document(multipart).await?;
    video_response(&state, GenerationSource::Document(document)).await
}

/// Run the whole pipeline and stream the rendered file back, deleting the
/// durable copy once it has been read.
async fn video_response(state: &AppState, source: GenerationSource) -> Result<Response, ApiError> {
    let video = state
        .pipeline
        .generate_with_attempts(&source, DEFAULT_MAX_ATTEMPTS)
        .await?;

    let bytes = tokio::fs::read(&video)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read rendered video: {}", e)))?;
    if let Err(e) = tokio::fs::remove_file(&video).await {
        warn!("[SERVER] Could not remove served video {:?}: {}", video, e);
    }

    Ok(([(header::CONTENT_TYPE, "video/mp4")], bytes).into_response())
}
