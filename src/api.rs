// 🌐 REST API - Axum router over the item ledger
//
// Store calls are synchronous SQLite transactions, so handlers run them on the
// blocking pool. Every error response is JSON with a `message` field.

use crate::error::LedgerError;
use crate::normalizer::{normalize_batch, normalize_item, LineItem, ValidationError};
use crate::stats::{batch_stats, Stats};
use crate::store::{Ledger, StoredItem};
use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or path could not be parsed
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The blocking task running a store call failed
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Ledger(LedgerError::Validation(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Ledger(LedgerError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Ledger(LedgerError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Ledger(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!("request failed: {}", message);
        } else {
            warn!("request rejected: {}", message);
        }

        (status, Json(MessageResponse { message })).into_response()
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("invalid JSON body: {}", rejection.body_text()))
}

fn bad_path(rejection: PathRejection) -> ApiError {
    ApiError::BadRequest(format!("invalid item id: {}", rejection.body_text()))
}

/// Run a store operation on the blocking pool.
async fn with_ledger<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&Ledger) -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let ledger = state.ledger.clone();
    let result = tokio::task::spawn_blocking(move || op(&ledger))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(result?)
}

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct BulkResponse {
    message: &'static str,
    batch: Stats,
    global: Stats,
}

#[derive(Serialize)]
struct DataResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    data: T,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            message: None,
            data,
        }
    }

    fn with_message(message: &'static str, data: T) -> Self {
        Self {
            message: Some(message),
            data,
        }
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /healthz
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/items/bulk - validate, persist, report batch and global stats
async fn bulk_insert(
    State(state): State<AppState>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(bad_body)?;
    let rows = normalize_batch(&request.items)?;
    let batch = batch_stats(&rows);

    // Stats are read in the saving transaction, so a 200 always means committed
    // and an error always means nothing was saved
    let (_, global) =
        with_ledger(&state, move |ledger| ledger.bulk_accumulate_with_stats(&rows)).await?;

    Ok(Json(BulkResponse {
        message: "saved",
        batch,
        global,
    }))
}

/// POST /api/items/preview - batch stats only, nothing persisted
async fn preview(payload: Result<Json<BulkRequest>, JsonRejection>) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(bad_body)?;
    let rows = normalize_batch(&request.items)?;

    Ok(Json(DataResponse::with_message("ok", batch_stats(&rows))))
}

/// GET /api/items?limit=N
async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    // Unparseable limits fall back to the default window, like out-of-range ones
    let limit = params
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    let items: Vec<StoredItem> = with_ledger(&state, move |ledger| ledger.list(limit)).await?;
    Ok(Json(DataResponse::ok(items)))
}

/// PUT /api/items/:id - edit, merging into another row on identity collision
async fn update_item(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<LineItem>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(bad_path)?;
    let Json(item) = payload.map_err(bad_body)?;
    let edit = normalize_item(&item).map_err(ValidationError::from)?;

    let outcome = with_ledger(&state, move |ledger| ledger.update_with_merge(id, &edit)).await?;
    let message = if outcome.merged { "merged" } else { "updated" };

    Ok(Json(DataResponse::with_message(message, outcome.item)))
}

/// DELETE /api/items/:id
async fn delete_item(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(bad_path)?;

    let removed = with_ledger(&state, move |ledger| ledger.delete_one(id)).await?;
    if !removed {
        return Err(LedgerError::NotFound(id).into());
    }

    Ok(message("deleted"))
}

/// DELETE /api/items
async fn clear_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    with_ledger(&state, |ledger| ledger.clear_all()).await?;
    Ok(message("cleared"))
}

/// GET /api/stats - global stats over the whole ledger
async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = with_ledger(&state, |ledger| ledger.global_stats()).await?;
    Ok(Json(DataResponse::ok(stats)))
}

// ============================================================================
// Router
// ============================================================================

/// Build the router with every ledger endpoint.
pub fn router(ledger: Ledger) -> Router {
    let api_routes = Router::new()
        .route("/items", get(list_items).delete(clear_items))
        .route("/items/bulk", post(bulk_insert))
        .route("/items/preview", post(preview))
        .route("/items/:id", put(update_item).delete(delete_item))
        .route("/stats", get(get_stats));

    Router::new()
        .route("/healthz", get(health))
        .nest("/api", api_routes)
        .with_state(AppState { ledger })
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured frontend origin.
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid frontend origin {:?}", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86_400)))
}
