use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::consolidate::Consolidation;
use crate::error::{LabprepError, Result};
use crate::model::{PracticeSummary, UrineType};
use crate::persist::PracticeQuery;
use crate::service::PreparationService;
use crate::settings::ServerSettings;

pub const GENERATE_PATH: &str = "/api/simulador/generar";
pub const HEALTH_PATH: &str = "/api/health";
pub const PRACTICES_PATH: &str = "/api/practicas";

#[derive(Clone)]
struct AppState {
    service: Arc<PreparationService>,
    request_timeout: Duration,
}

/// Runs `work` on the blocking pool, giving up after `limit`.
///
/// A task that overruns keeps running to completion on its thread, holding
/// the store until it is done; only the response is cut short.
async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(error = %e, "Join error");
            Err(LabprepError::Execution(e.to_string()))
        }
        Err(_) => {
            let ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(ms, "blocking work timed out");
            Err(LabprepError::Timeout(ms))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    // kept loose so a non-array gets our own error body instead of a rejection
    #[serde(default)]
    pub id_practicas: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PracticeParams {
    pub buscar: Option<String>,
    pub area: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub data: Consolidation,
}

#[derive(Serialize)]
pub struct PracticeListResponse {
    pub success: bool,
    pub data: Vec<PracticeSummary>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(rename = "conflicto", skip_serializing_if = "Option::is_none")]
    pub conflict: Option<[UrineType; 2]>,
    pub timestamp: String,
    pub path: String,
    pub method: String,
}

/// A failed request, remembered together with where it happened.
#[derive(Debug)]
pub struct ApiError {
    error: LabprepError,
    method: Method,
    path: String,
}

impl ApiError {
    pub fn new(error: LabprepError, method: Method, path: impl Into<String>) -> Self {
        Self {
            error,
            method,
            path: path.into(),
        }
    }
}

pub fn status_for(error: &LabprepError) -> StatusCode {
    match error {
        LabprepError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LabprepError::NoPracticesFound => StatusCode::NOT_FOUND,
        LabprepError::NoPreparationConfigured => StatusCode::UNPROCESSABLE_ENTITY,
        LabprepError::UrineTypeConflict { .. } => StatusCode::CONFLICT,
        LabprepError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        let message = if !status.is_server_error() {
            self.error.to_string()
        } else {
            // details stay in the log
            error!(error = %self.error, path = %self.path, "request failed");
            "internal server error".to_string()
        };
        let conflict = match &self.error {
            LabprepError::UrineTypeConflict { first, second } => Some([*first, *second]),
            _ => None,
        };
        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.error.code(),
            conflict,
            timestamp: Utc::now().to_rfc3339(),
            path: self.path,
            method: self.method.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(service: Arc<PreparationService>, settings: &ServerSettings) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let cors = match &settings.cors_origin {
        Some(origin) => cors.allow_origin(HeaderValue::from_str(origin).map_err(|e| {
            LabprepError::Config(format!("invalid server.cors_origin '{origin}': {e}"))
        })?),
        None => cors.allow_origin(Any),
    };
    Ok(Router::new()
        .route(GENERATE_PATH, post(generate))
        .route(HEALTH_PATH, get(health))
        .route(PRACTICES_PATH, get(list_practices))
        .fallback(not_found)
        .with_state(AppState {
            service,
            request_timeout: settings.request_timeout(),
        })
        .layer(cors))
}

/// Resolves once `signal` fires. If the signal cannot be listened for, the
/// error is logged and this never resolves, so the server keeps serving.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "could not listen for the shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

async fn generate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> std::result::Result<Json<GenerateResponse>, ApiError> {
    let fail = |e: LabprepError| ApiError::new(e, Method::POST, GENERATE_PATH);
    let Json(request) = payload.map_err(|e| fail(LabprepError::InvalidInput(e.body_text())))?;
    let Some(Value::Array(raw_ids)) = request.id_practicas else {
        return Err(fail(LabprepError::InvalidInput(
            "id_practicas must be an array of practice identifiers".into(),
        )));
    };

    // The store is blocking, so the whole fetch + merge runs off the async workers.
    let started = Instant::now();
    let service = Arc::clone(&state.service);
    let result = run_blocking(state.request_timeout, move || service.generate(&raw_ids)).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(data) => {
            info!(ms = elapsed_ms, instructions = data.details.instruction_count, "generate complete");
            Ok(Json(GenerateResponse {
                success: true,
                data,
            }))
        }
        Err(e) => {
            warn!(ms = elapsed_ms, code = %status_for(&e).as_u16(), "generate error");
            Err(fail(e))
        }
    }
}

async fn list_practices(
    State(state): State<AppState>,
    params: std::result::Result<Query<PracticeParams>, QueryRejection>,
) -> std::result::Result<Json<PracticeListResponse>, ApiError> {
    let fail = |e: LabprepError| ApiError::new(e, Method::GET, PRACTICES_PATH);
    let Query(params) = params.map_err(|e| fail(LabprepError::InvalidInput(e.body_text())))?;
    let query =
        PracticeQuery::new(params.buscar, params.limit, params.offset).with_area(params.area);
    let service = Arc::clone(&state.service);
    let page = run_blocking(state.request_timeout, move || service.practices(&query))
        .await
        .map_err(fail)?;
    let pagination = Pagination {
        total: page.total,
        limit: page.limit,
        offset: page.offset,
        has_more: page.has_more(),
    };
    Ok(Json(PracticeListResponse {
        success: true,
        data: page.practices,
        pagination,
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "labprep is running",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found(method: Method, uri: Uri) -> Response {
    let body = ErrorResponse {
        success: false,
        error: "endpoint not found".into(),
        code: "NOT_FOUND",
        conflict: None,
        timestamp: Utc::now().to_rfc3339(),
        path: uri.path().to_string(),
        method: method.to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
