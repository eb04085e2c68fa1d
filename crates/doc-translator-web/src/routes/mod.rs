//! HTTP route handlers for the document translator web application.
//!
//! Every handler is a thin adapter: it turns the request into a pipeline
//! call and the outcome into an HTML page, a redirect or a file.

mod download;
mod pages;
mod translate;

pub use download::download_artifact;
pub use pages::{health, index, success};
pub use translate::translate;

use serde::Deserialize;

/// Path parameters naming a finished translation.
#[derive(Debug, Deserialize)]
pub struct ArtifactParams {
    pub id: String,
    pub filename: String,
}
