//! Document Translator Web - upload form in front of the translation pipeline.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{get, post},
};
use clap::Parser;
use doc_translator_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Largest accepted upload, multipart framing included.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "doc-translator-web")]
#[command(author, version, about = "Document Translator Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name for OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding uploads while they are processed
    #[arg(long, default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Directory receiving translated PDFs
    #[arg(long, default_value = "translations")]
    translations_dir: PathBuf,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match self.config {
            Some(ref path) => AppConfig::from_file(path)?,
            None => AppConfig::load()?,
        };
        if let Some(ref api_base) = self.api_base {
            config.llm.api_base.clone_from(api_base);
        }
        if self.api_key.is_some() {
            config.llm.api_key.clone_from(&self.api_key);
        }
        if let Some(ref model) = self.model {
            config.llm.model.clone_from(model);
        }
        config.output_dir.clone_from(&self.translations_dir);
        Ok(config)
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/translate", post(routes::translate))
        .route("/success/{id}/{filename}", get(routes::success))
        .route("/download/{id}/{filename}", get(routes::download_artifact))
        .route("/health", get(routes::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
                // Pages reflect one request's outcome; never reuse them
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store, max-age=0"),
                )),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = args.load_config().context("Failed to load configuration")?;

    let state = Arc::new(
        AppState::new(config, args.uploads_dir.clone(), args.translations_dir.clone())
            .context("Failed to initialize application state")?,
    );
    let client = state.pipeline.client_info();
    if client.configured {
        info!("Using {} backend", client.name);
    } else {
        tracing::warn!("No API key configured; every translation will fail until one is set");
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
