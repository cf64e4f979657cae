//! Command-line converter
//!
//! Run with: cargo run -p dochtml --features cli --bin dochtml -- resume.pdf -o out

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dochtml::backends::Toolset;
use dochtml::processing::{batch_process_with, convert_document, find_documents, BATCH_SUMMARY_FILE};
use dochtml::{AppConfig, HtmlConverter, Settings};

#[derive(Parser)]
#[command(name = "dochtml")]
#[command(about = "Convert PDF, DOC and DOCX documents to HTML")]
#[command(version)]
struct Cli {
    /// Document to convert, or a folder with --batch
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Never run OCR on scanned PDFs
    #[arg(long = "no-ocr")]
    no_ocr: bool,

    /// JPEG quality of rasterized pages (1-100)
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Rasterization resolution for OCR
    #[arg(long, default_value_t = 150, value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// Parallel conversions in batch mode
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    workers: u32,

    /// Convert every supported document in the input folder
    #[arg(long)]
    batch: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dochtml=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let converter = HtmlConverter::new(Toolset::detect(&config.tools));

    let settings = Settings {
        enable_ocr: !cli.no_ocr,
        image_quality: cli.quality,
        pdf_dpi: cli.dpi,
        extract_html: true,
        extract_text: false,
        max_workers: cli.workers as usize,
    };

    std::fs::create_dir_all(&cli.output)?;

    if cli.batch {
        run_batch(&converter, &cli, &settings)
    } else {
        run_single(&converter, &cli, &settings)
    }
}

fn run_single(converter: &HtmlConverter, cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    if !cli.input.is_file() {
        anyhow::bail!("{} is not a file (use --batch for folders)", cli.input.display());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Converting {}", cli.input.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let report = convert_document(converter, &cli.input, settings, &cli.output);
    spinner.finish_and_clear();

    match (&report.output_path, &report.error) {
        (Some(output), _) => {
            println!(
                "{} {} -> {} ({})",
                style("✓").green().bold(),
                report.filename,
                output.display(),
                report.method.as_deref().unwrap_or("unknown")
            );
            Ok(())
        }
        (None, error) => {
            println!(
                "{} {}: {}",
                style("✗").red().bold(),
                report.filename,
                error.as_deref().unwrap_or("conversion failed")
            );
            anyhow::bail!("conversion failed")
        }
    }
}

fn run_batch(converter: &HtmlConverter, cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    if !cli.input.is_dir() {
        anyhow::bail!("{} is not a folder", cli.input.display());
    }

    let total = find_documents(&cli.input)?.len();
    if total == 0 {
        println!("{} No PDF, DOC or DOCX files in {}", style("!").yellow(), cli.input.display());
        return Ok(());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = batch_process_with(converter, &cli.input, &cli.output, settings, |report| {
        pb.set_message(report.filename.clone());
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    for report in summary.documents.iter().filter(|r| !r.is_success()) {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            report.filename,
            report.error.as_deref().unwrap_or("conversion failed")
        );
    }

    println!();
    println!("{}", style("Batch conversion complete").bold());
    println!("  Total:      {}", summary.total);
    println!("  Successful: {}", style(summary.successful).green());
    println!("  Failed:     {}", style(summary.failed).red());
    println!("  Summary:    {}", cli.output.join(BATCH_SUMMARY_FILE).display());

    Ok(())
}
