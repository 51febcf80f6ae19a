//! POST /resolve/:registry, a dry run of identifier resolution
//!
//! Nothing is written. The response shows what each identifier would resolve
//! to and by which tier, so an operator can check a best-effort email fix
//! before importing.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::RegistryKind;
use crate::resolve::MatchResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub identifiers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub registry: RegistryKind,
    pub results: Vec<MatchResult>,
    pub unresolved: usize,
}

pub async fn resolve_identifiers(
    State(state): State<AppState>,
    Path(registry): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveResponse>> {
    let registry: RegistryKind = registry.parse().map_err(ApiError::BadRequest)?;

    let results = state
        .processor
        .audit(&request.identifiers, registry)
        .await?;
    let unresolved = results.iter().filter(|r| !r.is_resolved()).count();

    Ok(Json(ResolveResponse {
        registry,
        results,
        unresolved,
    }))
}

pub fn resolve_routes() -> Router<AppState> {
    Router::new().route("/resolve/:registry", post(resolve_identifiers))
}
