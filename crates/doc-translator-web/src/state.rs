use anyhow::{Context, Result};
use doc_translator_core::{AppConfig, Pipeline};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::helpers::sanitize_filename;

/// Directories used by one translation request.
pub struct RunDirs {
    pub id: Uuid,
    /// Holds the uploaded file until the pipeline removes it
    pub upload_dir: PathBuf,
    /// Receives the translated PDF
    pub output_dir: PathBuf,
}

/// Global application state
pub struct AppState {
    pub pipeline: Pipeline,
    uploads_dir: PathBuf,
    translations_dir: PathBuf,
}

impl AppState {
    pub fn new(config: AppConfig, uploads_dir: PathBuf, translations_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&uploads_dir)
            .with_context(|| format!("Failed to create {}", uploads_dir.display()))?;
        std::fs::create_dir_all(&translations_dir)
            .with_context(|| format!("Failed to create {}", translations_dir.display()))?;

        let pipeline = Pipeline::from_config(config).context("Failed to initialize pipeline")?;

        Ok(Self {
            pipeline,
            uploads_dir,
            translations_dir,
        })
    }

    /// Fresh per-request directories, so concurrent uploads with the same
    /// file name never collide.
    pub async fn create_run_dirs(&self) -> std::io::Result<RunDirs> {
        let id = Uuid::new_v4();
        let upload_dir = self.uploads_dir.join(id.to_string());
        let output_dir = self.translations_dir.join(id.to_string());
        tokio::fs::create_dir_all(&upload_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;
        Ok(RunDirs {
            id,
            upload_dir,
            output_dir,
        })
    }

    /// Location of a finished artifact, if the request names a valid one.
    pub fn artifact_path(&self, id: &str, filename: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(id).ok()?;
        if sanitize_filename(filename) != filename
            || !Path::new(filename)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        {
            return None;
        }
        Some(self.translations_dir.join(id.to_string()).join(filename))
    }
}
