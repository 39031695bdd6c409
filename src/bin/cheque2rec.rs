//! CLI binary for cheque2rec.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ProcessingConfig`, runs a batch, and prints the extracted records.

use anyhow::{bail, Context, Result};
use cheque2rec::{
    process_documents, ChequeRecord, CropRegion, MemoryRecordStore, PipelineMode,
    ProcessingConfig, RunProgressCallback, Session, DEFAULT_GEMINI_MODEL,
};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across the whole batch, a log line
/// per image as it completes or fails.
struct CliProgress {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl RunProgressCallback for CliProgress {
    fn on_document_ready(&self, _doc: usize, images: usize) {
        self.bar.inc_length(images as u64);
    }

    fn on_document_failed(&self, doc: usize, error: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} document {}: {}", red("✗"), doc + 1, error));
    }

    fn on_image_start(&self, image: usize, total: usize) {
        self.bar.set_message(format!("image {image}/{total}"));
    }

    fn on_image_complete(&self, image: usize, total: usize) {
        self.bar.println(format!(
            "  {} image {:>3}/{:<3} extracted",
            green("✓"),
            image,
            total
        ));
        self.bar.inc(1);
    }

    fn on_image_failed(&self, image: usize, total: usize, error: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.len() > 100 {
            format!("{}…", &error[..99])
        } else {
            error
        };
        self.bar.println(format!(
            "  {} image {:>3}/{:<3} {}",
            red("✗"),
            image,
            total,
            dim(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _records: usize) {
        self.bar.finish_and_clear();
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Send the original scan untouched.
    Raw,
    /// Crop + binarize the region of interest before extraction.
    Preprocess,
}

impl From<ModeArg> for PipelineMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Raw => PipelineMode::ExtractRaw,
            ModeArg::Preprocess => PipelineMode::PreprocessThenExtract,
        }
    }
}

fn parse_crop(s: &str) -> Result<CropRegion, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("crop must be four integers 'x,y,width,height': {e}"))?;
    if parts.len() != 4 {
        return Err(format!("crop needs 4 values, got {}", parts.len()));
    }
    Ok(CropRegion::new(parts[0], parts[1], parts[2], parts[3]))
}

/// Extract structured records from scanned cheque PDFs and images.
#[derive(Parser, Debug)]
#[command(name = "cheque2rec", version, about, long_about = None)]
struct Cli {
    /// Cheque PDFs and/or images (PNG, JPEG) to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Session user the records are tagged with.
    #[arg(short, long, default_value = "operator")]
    user: String,

    /// Which image the model sees.
    #[arg(long, value_enum, default_value = "raw")]
    mode: ModeArg,

    /// Region of interest as 'x,y,width,height' (preprocess mode only).
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRegion>,

    /// Directory for images extracted from PDFs (cleared per run).
    #[arg(long, default_value = "./output_images")]
    work_dir: PathBuf,

    /// Directory for raw extraction artifacts.
    #[arg(long, default_value = "./extracted_data")]
    artifact_dir: PathBuf,

    /// Model identifier.
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    model: String,

    /// API key; falls back to GOOGLE_API_KEY.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Print the full run report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar (useful for scripting).
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = ProcessingConfig::builder()
        .mode(cli.mode.into())
        .work_dir(&cli.work_dir)
        .artifact_dir(&cli.artifact_dir)
        .model(&cli.model)
        .api_timeout_secs(cli.timeout);
    if let Some(crop) = cli.crop {
        builder = builder.crop(crop);
    }
    if !cli.quiet && !cli.json {
        builder = builder.progress_callback(CliProgress::new());
    }
    let config = builder.build().context("invalid configuration")?;

    // The library also reads the env itself; the flag just makes the key
    // explicit on the command line.
    if let Some(key) = &cli.api_key {
        std::env::set_var("GEMINI_API_KEY", key);
    }

    let session = Session::new(&cli.user);
    let store = MemoryRecordStore::new();

    let report = process_documents(&cli.inputs, &config, &session, &store).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report.records);
        println!();
        let failed = report.stats.images_failed + report.stats.documents_failed;
        let summary = format!(
            "{} record(s) from {} image(s) across {} document(s) in {:.1}s",
            report.stats.records_extracted,
            report.stats.images_found,
            report.stats.documents,
            report.stats.total_duration_ms as f64 / 1000.0,
        );
        if failed == 0 {
            println!("{} {}", green("✓"), bold(&summary));
        } else {
            println!("{} {} {}", red("✗"), bold(&summary), red(&format!("({failed} failed)")));
        }
    }

    if report.stats.records_extracted == 0 && report.stats.images_found > 0 {
        bail!("no records extracted");
    }
    Ok(())
}

fn print_table(records: &[ChequeRecord]) {
    if records.is_empty() {
        println!("{}", dim("no records extracted"));
        return;
    }
    println!(
        "{}",
        bold(&format!(
            "{:<12} {:<24} {:<20} {:<12} {:<14} {:<12}",
            "Cheque No.", "Payee", "Bank", "Amount", "Account No.", "Date"
        ))
    );
    for r in records {
        println!(
            "{:<12} {:<24} {:<20} {:<12} {:<14} {:<12}",
            r.cheque_number, r.payee_name, r.bank_name, r.amount, r.account_number, r.date
        );
    }
}
