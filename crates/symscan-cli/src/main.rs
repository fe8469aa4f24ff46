//! symscan-cli: run the electrical symbol detection pipeline from a terminal.
//!
//! Uploads a floor plan to a detection backend, drives the backend
//! through preprocessing, model loading, and inference, then prints a
//! per-class summary of the detected symbols.
//!
//! # Usage
//!
//! ```text
//! symscan-cli [OPTIONS] <FILE>
//! symscan-cli --backend http://gpu-box:8000 --format csv plan.pdf > plan.csv
//! ```
//!
//! Stage progress goes to stderr; results go to stdout.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod output;
mod transport;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use symscan_pipeline::{MAX_PROGRESS, PipelineController, ResultsPayload, UploadFile, UploadGate};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{AppConfig, OutputFormat, Settings};
use crate::transport::ReqwestBackend;

/// Detect electrical symbols in a floor plan using a symscan backend.
///
/// Settings are layered: built-in defaults, then
/// `~/.config/symscan/config.toml`, then the nearest `.symscan.toml`,
/// then environment variables and flags.
#[derive(Parser)]
#[command(name = "symscan-cli", version)]
struct Cli {
    /// Floor plan to analyse (PDF, DWF, PNG, JPEG).
    file: PathBuf,

    /// Base URL of the detection backend.
    #[arg(long, env = "SYMSCAN_BACKEND_URL")]
    backend: Option<String>,

    /// Output format for the results.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Also print the annotated image URL for this 1-based page.
    #[arg(long, allow_negative_numbers = true)]
    page: Option<i64>,

    /// Keep artifacts of previous sessions on the backend.
    #[arg(long)]
    no_reset: bool,

    /// Suppress the progress bar and stage lines.
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// The run completed and results were printed.
    Success,
    /// The upload or a pipeline stage failed.
    Failed,
    /// The input file or configuration was unusable.
    Usage,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Success => Self::SUCCESS,
            Exit::Failed => Self::from(1),
            Exit::Usage => Self::from(2),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    run(&cli).await.into()
}

#[allow(clippy::future_not_send)] // ProgressReporter is single-threaded
async fn run(cli: &Cli) -> Exit {
    let settings = match Settings::resolve(
        AppConfig::load(),
        cli.backend.as_deref(),
        cli.format,
        cli.no_reset,
    ) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return Exit::Usage;
        }
    };

    let file = match read_upload(&cli.file).await {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Exit::Usage;
        }
    };

    match analyse(&settings, &file, cli.quiet).await {
        Ok(payload) => match print_results(&settings, &payload, cli.page) {
            Ok(()) => Exit::Success,
            Err(e) => {
                eprintln!("error: {e:#}");
                Exit::Failed
            }
        },
        Err(e) => {
            eprintln!("error: {e:#}");
            Exit::Failed
        }
    }
}

/// Read and validate the document before any network traffic.
async fn read_upload(path: &Path) -> anyhow::Result<UploadFile> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        bail!("{} has no usable file name", path.display());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file = UploadFile::new(name, bytes);
    file.validate()?;
    Ok(file)
}

/// Upload `file` and drive the backend to completion.
#[allow(clippy::future_not_send)] // ProgressReporter is single-threaded
async fn analyse(
    settings: &Settings,
    file: &UploadFile,
    quiet: bool,
) -> anyhow::Result<Arc<ResultsPayload>> {
    let backend =
        ReqwestBackend::new(settings.backend.clone()).context("failed to build HTTP client")?;
    info!(backend = %backend.config(), file = %file.name, "starting run");

    let mut controller = PipelineController::new(&backend);
    if settings.reset {
        controller.reset_backend().await;
    }

    let gate = UploadGate::new(&backend);
    let bar = upload_bar(file.len(), quiet);
    let upload = {
        let bar = bar.clone();
        let total = file.len();
        gate.upload(file, move |fraction| bar.set_position(scaled(fraction, total)))
            .await?
    };
    if upload.is_complete() {
        bar.finish();
    } else {
        bar.abandon();
    }

    let payload = controller
        .start_with(&upload, |event| {
            if !quiet && !event.is_error() {
                eprintln!("[{}/{MAX_PROGRESS}] {}", event.progress, event.status);
            }
        })
        .await?;
    Ok(payload)
}

fn print_results(
    settings: &Settings,
    payload: &ResultsPayload,
    page: Option<i64>,
) -> anyhow::Result<()> {
    print!("{}", output::render(payload, settings.format)?);

    if let Some(page) = page {
        let (selected, url) = output::page_image(&settings.backend, payload, page);
        let line = url.map_or_else(
            || format!("Page {selected}: no image available"),
            |url| format!("Page {selected}: {url}"),
        );
        // Keep machine-readable output clean.
        if settings.format == OutputFormat::Table {
            println!("\n{line}");
        } else {
            eprintln!("{line}");
        }
    }
    Ok(())
}

fn upload_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("Uploading [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled(fraction: f64, total: u64) -> u64 {
    (fraction * total as f64).round() as u64
}
