//! HTTP routes and handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::export::{to_csv, ExportFormat};
use crate::state::AppState;
use sentilens_classifiers::NormalizationReport;
use sentilens_core::{Error, JobId, Label, Record, TextInput};
use sentilens_jobs::{analytics, validate, JobView, ValidationMetrics};

pub fn create_router(state: AppState, cors_allow_any_origin: bool) -> Router {
    let cors = if cors_allow_any_origin {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let api_routes = Router::new()
        .route("/analyze", post(analyze))
        .route("/results/:id", get(get_results))
        .route("/results/:id/download", get(download_results))
        .route("/results/:id/correct", patch(correct_label))
        .route("/results/:id/validate", post(validate_job))
        .route("/validate", post(validate_predictions))
        .route("/search", get(search_texts))
        .route("/filter", get(filter_results))
        .route("/normalize", post(normalize_texts));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Sentilens sentiment analysis API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "model": state.runner.engine().status(),
        "jobs": state.store().len(),
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
}

async fn fallback() -> AppError {
    AppError::Core(Error::not_found("no such route"))
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub records: Option<Vec<TextInput>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub task_id: JobId,
    pub message: String,
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let Json(req) = payload?;

    let records = match req.records {
        Some(records) if !records.is_empty() => records,
        _ => {
            return Err(Error::invalid_argument("request must contain a non-empty 'records' list").into())
        }
    };

    let handle = state.runner.submit(records)?;
    info!(task_id = %handle.id(), "Analysis started");

    Ok(Json(AnalyzeResponse {
        task_id: handle.id(),
        message: "Analysis started".to_string(),
    }))
}

async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, AppError> {
    let id: JobId = id.parse()?;
    Ok(Json(state.runner.status(&id)?))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

async fn download_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let id: JobId = id.parse()?;
    let rows = analytics::export(state.store(), &id)?;

    let body = match query.format {
        ExportFormat::Csv => to_csv(&rows),
        ExportFormat::Json => serde_json::to_string(&rows).map_err(Error::from)?,
    };
    let disposition = format!(
        "attachment; filename=results.{}",
        query.format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, query.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub results: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub task_id: String,
    pub query: String,
    pub source: Option<String>,
}

async fn search_texts(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<RecordsResponse>, AppError> {
    let Query(query) = query?;
    let id: JobId = query.task_id.parse()?;
    let results = analytics::search(
        state.store(),
        &id,
        &query.query,
        non_empty(query.source.as_deref()),
    )?;
    Ok(Json(RecordsResponse { results }))
}

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub task_id: String,
    pub label: Option<i64>,
    pub source: Option<String>,
}

async fn filter_results(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<RecordsResponse>, AppError> {
    let Query(query) = query?;
    let id: JobId = query.task_id.parse()?;
    let label = query.label.map(Label::from_id).transpose()?;
    let results = analytics::filter(
        state.store(),
        &id,
        label,
        non_empty(query.source.as_deref()),
    )?;
    Ok(Json(RecordsResponse { results }))
}

#[derive(Debug, Deserialize)]
pub struct CorrectQuery {
    pub text_id: i64,
    pub new_label: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CorrectResponse {
    pub status: String,
    pub text_id: usize,
    pub new_label: Label,
    pub record: Record,
}

async fn correct_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<CorrectQuery>, QueryRejection>,
) -> Result<Json<CorrectResponse>, AppError> {
    let Query(query) = query?;
    let new_label = Label::from_id(query.new_label)?;
    let id: JobId = id.parse()?;

    let record = analytics::correct(state.store(), &id, query.text_id, query.new_label)?;

    Ok(Json(CorrectResponse {
        status: "updated".to_string(),
        text_id: record.index,
        new_label,
        record,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub true_labels: Vec<i64>,
    pub predicted_labels: Vec<i64>,
}

async fn validate_predictions(
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidationMetrics>, AppError> {
    let Json(req) = payload?;
    Ok(Json(validate(&req.true_labels, &req.predicted_labels)?))
}

#[derive(Debug, Deserialize)]
pub struct ValidateJobRequest {
    pub true_labels: Vec<i64>,
}

async fn validate_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ValidateJobRequest>, JsonRejection>,
) -> Result<Json<ValidationMetrics>, AppError> {
    let Json(req) = payload?;
    let id: JobId = id.parse()?;
    Ok(Json(analytics::validate_job(
        state.store(),
        &id,
        &req.true_labels,
    )?))
}

// ============================================================================
// Normalization
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub texts: Vec<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NormalizeResponse {
    pub texts: Vec<String>,
    pub report: NormalizationReport,
}

async fn normalize_texts(
    State(state): State<AppState>,
    payload: Result<Json<NormalizeRequest>, JsonRejection>,
) -> Result<Json<NormalizeResponse>, AppError> {
    let Json(req) = payload?;
    let raw: Vec<&str> = req.texts.iter().map(|t| t.as_deref().unwrap_or("")).collect();
    let (texts, report) = state.normalizer.normalize_batch(&raw);
    Ok(Json(NormalizeResponse { texts, report }))
}

/// Treat `?source=` as no source filter
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Core(Error),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Core(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_argument", msg),
            AppError::Core(err) => {
                let status = match &err {
                    Error::InvalidArgument(_) | Error::ValidationInputMismatch { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::NotReady(_) => StatusCode::CONFLICT,
                    Error::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }

        let body = json!({
            "error": {
                "kind": kind,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
