//! Extract command - build the JSON record of a single PDF.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use docauth_core::{DocumentExtractor, ExtractOptions};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Source PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Base name for the output files (default: PDF file name without extension)
    #[arg(short, long)]
    output: Option<String>,

    /// Skip QR decoding of embedded images
    #[arg(long)]
    no_barcodes: bool,
}

pub fn run(args: ExtractArgs) -> anyhow::Result<ExitCode> {
    let start = Instant::now();

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let base = args.output.clone().unwrap_or_else(|| default_base_name(&args.input));
    let json_path = PathBuf::from(format!("{}.json", base));
    let images_dir = PathBuf::from(format!("{}_imagenes", base));

    info!("Processing file: {}", args.input.display());

    let options = ExtractOptions::new()
        .with_image_dir(&images_dir)
        .with_barcodes(!args.no_barcodes);
    let extractor = DocumentExtractor::new(options);

    // Create progress bar
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message("Loading PDF...");

    let record = extractor
        .extract_with_progress(&args.input, |page, total| {
            pb.set_length(total as u64);
            pb.set_position(page as u64);
            pb.set_message(format!("Page {}/{}", page, total));
        })
        .with_context(|| format!("failed to process '{}'", args.input.display()))?;

    pb.finish_and_clear();

    record
        .save(&json_path)
        .with_context(|| format!("failed to write '{}'", json_path.display()))?;

    println!(
        "{} Extracted {} images into '{}'",
        style("✓").green(),
        record.image_count,
        images_dir.display()
    );
    println!(
        "{} Created data file '{}'",
        style("✓").green(),
        json_path.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(ExitCode::SUCCESS)
}

/// PDF file name without its extension.
fn default_base_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}
