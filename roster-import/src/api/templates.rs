//! GET /templates/:kind, a CSV file to fill in

use axum::{
    extract::Path,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::import::parse_kind;
use crate::error::{ApiError, ApiResult};
use crate::report::{template, to_csv};
use crate::AppState;

pub async fn download_template(Path(kind): Path<String>) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let csv = to_csv(&template(kind)).map_err(|e| ApiError::Internal(e.to_string()))?;
    let disposition = format!("attachment; filename=\"{}_template.csv\"", kind);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

pub fn template_routes() -> Router<AppState> {
    Router::new().route("/templates/:kind", get(download_template))
}
