//! Download route - serves translated PDFs.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::ArtifactParams;
use crate::helpers::{OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

/// Download a translated PDF as an attachment.
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(params): Path<ArtifactParams>,
) -> RouteResult<Response> {
    let path = state
        .artifact_path(&params.id, &params.filename)
        .or_not_found("Translation not found")?;

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err((StatusCode::NOT_FOUND, "Translation not found".to_string()));
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };
    debug!("Serving {} ({} bytes)", path.display(), data.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", params.filename),
        )
        .body(Body::from(data))
        .or_internal_error()
}
