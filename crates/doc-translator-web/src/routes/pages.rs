//! Page routes - full HTML page renders.

use axum::extract::{Path, State};
use std::sync::Arc;

use super::ArtifactParams;
use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;
use crate::templates::{IndexTemplate, SuccessTemplate};

/// Landing page with upload form.
pub async fn index() -> IndexTemplate {
    IndexTemplate::new()
}

/// Result page for a finished translation.
pub async fn success(
    State(state): State<Arc<AppState>>,
    Path(params): Path<ArtifactParams>,
) -> RouteResult<SuccessTemplate> {
    let path = state
        .artifact_path(&params.id, &params.filename)
        .or_not_found("Translation not found")?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err((
            axum::http::StatusCode::NOT_FOUND,
            "Translation not found".to_string(),
        ));
    }

    Ok(SuccessTemplate {
        id: params.id,
        filename: params.filename,
    })
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
