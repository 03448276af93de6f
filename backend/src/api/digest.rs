// Digest report endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{body, ApiError, AppState};
use crate::digest::{
    generate_digest, is_safe_report_name, list_reports, DigestCharts, DigestRequest, DigestSummary,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestResponse {
    pub message: String,
    pub pdf_path: String,
    pub filename: String,
    /// Base64 SVG charts; absent when charts were not requested
    pub charts: Option<DigestCharts>,
    pub summary: DigestSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportList {
    pub reports: Vec<String>,
}

pub(super) async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DigestRequest>, JsonRejection>,
) -> Result<Json<DigestResponse>, ApiError> {
    let request = body(payload)?;
    let tasks = state.store.load_or_empty();
    let entries = state.log.entries();

    let _guard = state.write_lock.lock().await;
    let digest = generate_digest(
        &request,
        &tasks,
        &entries,
        &state.config.reports_dir(),
        state.clock.now(),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to generate report: {}", e)))?;

    state.record_best_effort(&format!("Generated digest report: '{}'", digest.title));

    Ok(Json(DigestResponse {
        message: format!("Report '{}' generated successfully", digest.title),
        pdf_path: digest.pdf_path.display().to_string(),
        filename: digest.filename,
        charts: digest.charts,
        summary: digest.summary,
    }))
}

pub(super) async fn list(State(state): State<Arc<AppState>>) -> Json<ReportList> {
    Json(ReportList {
        reports: list_reports(&state.config.reports_dir()),
    })
}

pub(super) async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_safe_report_name(&filename) {
        return Err(ApiError::BadRequest("Invalid report filename".to_string()));
    }

    let path = state.config.reports_dir().join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("Report not found".to_string()));
        }
        Err(e) => {
            return Err(ApiError::Internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
