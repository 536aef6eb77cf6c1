use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::extract_video_id;
use crate::render::render_summary;
use crate::summarize::Summarizer;
use crate::ui;
use crate::youtube::TranscriptFetcher;

/// Collaborators shared by every request; nothing here is mutated
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn TranscriptFetcher>,
    pub summarizer: Arc<dyn Summarizer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptRequest {
    video_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

#[derive(Debug, Default, Deserialize)]
struct SummarizeRequest {
    transcript: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: String,
    pub summary_html: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Failed to fetch transcript")]
    TranscriptFetch,

    #[error("Failed to summarize transcript")]
    Summarize { details: Value },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Missing(_) => StatusCode::BAD_REQUEST,
            ApiError::TranscriptFetch | ApiError::Summarize { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        let details = match self {
            ApiError::Summarize { details } => Some(details),
            _ => None,
        };

        let body = Json(ErrorResponse { error, details });
        if status == StatusCode::METHOD_NOT_ALLOWED {
            (status, [(header::ALLOW, "POST")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health))
        .route("/api/getTranscript", post(get_transcript).fallback(method_not_allowed))
        .route("/api/summarize", post(summarize).fallback(method_not_allowed))
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(host: &str, port: u16, state: AppState) -> eyre::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    println!("ytsum listening on http://{addr}");
    println!("  GET  /                   UI");
    println!("  POST /api/getTranscript  {{ videoId }}");
    println!("  POST /api/summarize      {{ transcript }}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Missing, empty or malformed bodies all read as "no fields"
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn get_transcript(State(state): State<AppState>, body: Bytes) -> Result<Json<TranscriptResponse>, ApiError> {
    let req: TranscriptRequest = parse_body(&body);
    let raw = non_empty(req.video_id).ok_or(ApiError::Missing("videoId"))?;
    let video_id = extract_video_id(&raw).unwrap_or(raw);
    debug!("getTranscript videoId={video_id}");

    let transcript = state.fetcher.fetch(&video_id).await.map_err(|e| {
        error!("Error fetching transcript: {e:?}");
        ApiError::TranscriptFetch
    })?;

    Ok(Json(TranscriptResponse {
        transcript: transcript.text(),
    }))
}

async fn summarize(State(state): State<AppState>, body: Bytes) -> Result<Json<SummaryResponse>, ApiError> {
    let req: SummarizeRequest = parse_body(&body);
    let transcript = non_empty(req.transcript).ok_or(ApiError::Missing("transcript"))?;

    let summary = state.summarizer.summarize(&transcript).await.map_err(|e| {
        error!("Error summarizing transcript: {e}");
        ApiError::Summarize { details: e.details() }
    })?;

    Ok(Json(SummaryResponse {
        summary_html: render_summary(&summary),
        summary,
    }))
}
