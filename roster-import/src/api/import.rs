//! Batch import handlers
//!
//! POST /import/:kind, POST /import/:kind/csv, GET /batches/:batch_id

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::batch::{rows_from_csv, rows_from_json, BatchError, BatchProcessor};
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchRow, EntityKind, ImportReport};
use crate::store::BatchRecord;
use crate::validate::ReferencePolicy;
use crate::AppState;

/// POST /import/:kind request
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// One object per row, keyed by column name
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    /// Keep unresolved reference values instead of failing the row
    #[serde(default)]
    pub email_fix: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub batch_id: Uuid,
    #[serde(flatten)]
    pub report: ImportReport,
}

pub(crate) fn parse_kind(raw: &str) -> ApiResult<EntityKind> {
    raw.parse().map_err(ApiError::BadRequest)
}

fn processor_for(state: &AppState, query: &ImportQuery) -> BatchProcessor {
    if query.email_fix {
        state.processor.with_policy(ReferencePolicy::PassThrough)
    } else {
        state.processor.clone()
    }
}

async fn run_import(
    state: &AppState,
    query: &ImportQuery,
    kind: EntityKind,
    rows: Result<Vec<BatchRow>, BatchError>,
) -> ApiResult<Json<ImportResponse>> {
    let result = match rows {
        Ok(rows) => {
            processor_for(state, query)
                .import(rows, kind, &CancellationToken::new())
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok((batch_id, report)) => Ok(Json(ImportResponse { batch_id, report })),
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "Batch rejected");
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// POST /import/:kind
pub async fn import_json(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ImportQuery>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportResponse>> {
    let kind = parse_kind(&kind)?;
    let rows = rows_from_json(request.rows);
    run_import(&state, &query, kind, Ok(rows)).await
}

/// POST /import/:kind/csv
///
/// Body is CSV text with a header row.
pub async fn import_csv(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> ApiResult<Json<ImportResponse>> {
    let kind = parse_kind(&kind)?;
    let rows = rows_from_csv(body.as_bytes(), kind).map_err(BatchError::from);
    run_import(&state, &query, kind, rows).await
}

/// GET /batches/:batch_id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<BatchRecord>> {
    state
        .processor
        .store()
        .load_batch(batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("batch {}", batch_id)))
}

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/:kind", post(import_json))
        .route("/import/:kind/csv", post(import_csv))
        .route("/batches/:batch_id", get(get_batch))
}
