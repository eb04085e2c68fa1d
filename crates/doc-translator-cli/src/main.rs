//! Document Translator CLI - translate a PDF or DOCX file into a PDF.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use doc_translator_core::{
    AppConfig, DocumentFormat, ErrorKind, Language, MatchPolicy, Pipeline, PipelineError,
    UploadedDocument, languages,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatOption {
    Pdf,
    Docx,
}

impl From<FormatOption> for DocumentFormat {
    fn from(opt: FormatOption) -> Self {
        match opt {
            FormatOption::Pdf => Self::Pdf,
            FormatOption::Docx => Self::Docx,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "doc-translate")]
#[command(author, version, about = "Translate PDF and DOCX documents into PDF", long_about = None)]
struct Args {
    /// Input PDF or DOCX file
    #[arg(required_unless_present = "languages")]
    input: Option<PathBuf>,

    /// Language the document is written in
    #[arg(short = 's', long, value_parser = parse_language, required_unless_present = "languages")]
    source: Option<Language>,

    /// Language to translate into
    #[arg(short = 't', long, value_parser = parse_language, required_unless_present = "languages")]
    target: Option<Language>,

    /// Output directory (default: from config, "translations")
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Input format (default: inferred from the file extension)
    #[arg(long, value_enum)]
    format: Option<FormatOption>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name for OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Accept a detected language whose first N characters match the source
    #[arg(long, value_name = "N", conflicts_with = "exact_match")]
    match_prefix: Option<usize>,

    /// Require the detected language to match the source exactly
    #[arg(long)]
    exact_match: bool,

    /// Warn instead of failing when the detected language differs
    #[arg(long)]
    lenient: bool,

    /// TrueType font to embed (needed for non-Latin targets such as Arabic)
    #[arg(long)]
    font: Option<PathBuf>,

    /// List supported languages and exit
    #[arg(long)]
    languages: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_language(s: &str) -> std::result::Result<Language, String> {
    s.parse::<Language>().map_err(|e| e.to_string())
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(ref dir) = self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(ref api_base) = self.api_base {
            config.llm.api_base.clone_from(api_base);
        }
        if self.api_key.is_some() {
            config.llm.api_key.clone_from(&self.api_key);
        }
        if let Some(ref model) = self.model {
            config.llm.model.clone_from(model);
        }
        if let Some(n) = self.match_prefix {
            config.language_check.match_policy = MatchPolicy::Prefix(n);
        }
        if self.exact_match {
            config.language_check.match_policy = MatchPolicy::Exact;
        }
        if self.lenient {
            config.language_check.strict = false;
        }
        if self.font.is_some() {
            config.render.font_path.clone_from(&self.font);
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_languages() {
    for option in languages() {
        println!("{:<12} {}", option.key, option.name);
    }
}

#[allow(clippy::print_stderr)]
fn report_failure(err: &PipelineError, verbose: u8) {
    eprintln!("Error: {}", err.message);
    if verbose > 0
        && let Some(ref detail) = err.detail
    {
        eprintln!("  caused by: {detail}");
    }
    if err.kind.is_retryable() {
        eprintln!("This may be a temporary problem; try again in a moment.");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if args.languages {
        print_languages();
        return Ok(ExitCode::SUCCESS);
    }

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (Some(input), Some(source), Some(target)) = (args.input.clone(), args.source, args.target)
    else {
        anyhow::bail!("INPUT, --source and --target are required");
    };

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load().context("Failed to load configuration")?
    };
    args.apply(&mut config);

    let format = match args.format {
        Some(format) => format.into(),
        None => match DocumentFormat::from_path(&input) {
            Ok(format) => format,
            Err(e) => {
                report_failure(
                    &PipelineError::new(ErrorKind::UnsupportedFormat).with_detail(e.to_string()),
                    args.verbose,
                );
                return Ok(ExitCode::FAILURE);
            }
        },
    };

    let output_dir = config.output_dir.clone();
    let pipeline = Pipeline::from_config(config).context("Failed to initialize pipeline")?;
    info!("Using {} client", pipeline.client_info().name);

    // The user's file is never removed
    let document = UploadedDocument::caller_owned(&input, format, source, target, output_dir);

    let spinner = ProgressBar::new_spinner();
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = pipeline
        .run_with_progress(document, &|stage| spinner.set_message(stage.activity()))
        .await;

    match result {
        Ok(artifact) => {
            spinner.finish_with_message("Translation complete");
            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!("Translated PDF saved to: {}", artifact.path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            spinner.finish_and_clear();
            report_failure(&err, args.verbose);
            Ok(ExitCode::FAILURE)
        }
    }
}
