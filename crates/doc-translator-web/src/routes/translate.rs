//! Translate route - upload handling and the pipeline call.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use doc_translator_core::{DocumentFormat, ErrorKind, PipelineError};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::helpers::{sanitize_filename, status_for};
use crate::state::AppState;
use crate::templates::IndexTemplate;

/// Fields of the upload form.
#[derive(Default)]
struct UploadForm {
    /// Client file name and content
    file: Option<(String, Bytes)>,
    source_language: Option<String>,
    target_language: Option<String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, String> {
        let mut form = Self::default();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    warn!("Malformed upload: {}", e);
                    return Err("The upload could not be read. Files must be 16 MB or smaller.".to_string());
                }
            };

            match field.name().unwrap_or_default() {
                "file" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await.map_err(|e| {
                        warn!("Failed to read uploaded file: {}", e);
                        "The upload could not be read. Files must be 16 MB or smaller.".to_string()
                    })?;
                    form.file = Some((filename, data));
                }
                "source_language" => form.source_language = field.text().await.ok(),
                "target_language" => form.target_language = field.text().await.ok(),
                _ => {}
            }
        }
        Ok(form)
    }

    /// Re-render the form with `message`, keeping the chosen languages.
    fn reject(&self, status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            IndexTemplate::with_error(
                message,
                self.source_language.as_deref(),
                self.target_language.as_deref(),
            ),
        )
            .into_response()
    }
}

/// Translate an uploaded document (POST-Redirect-GET on success).
pub async fn translate(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let form = match UploadForm::read(&mut multipart).await {
        Ok(form) => form,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                IndexTemplate::with_error(message, None, None),
            )
                .into_response();
        }
    };

    let Some((client_name, data)) = form.file.as_ref().filter(|(name, _)| !name.is_empty()) else {
        return form.reject(StatusCode::BAD_REQUEST, "No file selected.");
    };

    let filename = sanitize_filename(client_name);
    let Ok(format) = DocumentFormat::from_path(&filename) else {
        let err = PipelineError::new(ErrorKind::UnsupportedFormat);
        return form.reject(status_for(err.kind), err.message);
    };

    let dirs = match state.create_run_dirs().await {
        Ok(dirs) => dirs,
        Err(e) => {
            error!("Failed to create request directories: {}", e);
            return form.reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "The server could not store the upload. Please try again.",
            );
        }
    };

    let upload_path = dirs.upload_dir.join(&filename);
    if let Err(e) = tokio::fs::write(&upload_path, data).await {
        error!("Failed to save upload {}: {}", upload_path.display(), e);
        remove_dir_quietly(&dirs.upload_dir).await;
        remove_dir_quietly(&dirs.output_dir).await;
        return form.reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "The server could not store the upload. Please try again.",
        );
    }
    info!("Received {} ({} bytes) as request {}", filename, data.len(), dirs.id);

    let result = state
        .pipeline
        .run_raw_into(
            &upload_path,
            format.extension(),
            form.source_language.as_deref().unwrap_or_default(),
            form.target_language.as_deref().unwrap_or_default(),
            &dirs.output_dir,
        )
        .await;
    remove_dir_quietly(&dirs.upload_dir).await;

    match result {
        Ok(artifact) => {
            let location = format!(
                "/success/{}/{}",
                dirs.id,
                urlencoding::encode(artifact.file_name())
            );
            Redirect::to(&location).into_response()
        }
        Err(err) => {
            remove_dir_quietly(&dirs.output_dir).await;
            form.reject(status_for(err.kind), err.message)
        }
    }
}

/// Remove a per-request directory if it is empty.
async fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir(dir).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!("Left {} in place: {}", dir.display(), e);
    }
}
