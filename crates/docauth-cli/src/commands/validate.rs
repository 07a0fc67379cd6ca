//! Validate command - check an extracted record against the rule set.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{info, warn};

use docauth_core::models::config::resolve_config_path;
use docauth_core::{authenticate, DocumentRecord, ValidationConfig, ValidationReport};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// JSON record produced by `docauth extract`
    #[arg(required = true)]
    data_file: PathBuf,

    /// Path to the validation rule set (default: config.json next to the data file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the report is written to (default: current directory)
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<ExitCode> {
    let config_path = resolve_config_path(&args.data_file, args.config.as_deref());

    // Both inputs must exist before either is parsed
    for path in [&args.data_file, &config_path] {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }

    let record = DocumentRecord::from_file(&args.data_file)
        .with_context(|| format!("could not load data file '{}'", args.data_file.display()))?;
    let config = ValidationConfig::from_file(&config_path)
        .with_context(|| format!("could not load config '{}'", config_path.display()))?;

    let name = if record.filename.is_empty() {
        "unknown file"
    } else {
        record.filename.as_str()
    };
    info!("Validating '{}' with rules from {}", name, config_path.display());

    let report = authenticate(&record, &config);

    let report_dir = args.report_dir.unwrap_or_else(|| PathBuf::from("."));
    match report.write_to(&report_dir, &args.data_file) {
        Ok(path) => println!(
            "{} Report saved to '{}'",
            style("✓").green(),
            path.display()
        ),
        Err(e) => {
            warn!("Failed to save report: {}", e);
            eprintln!("{} Failed to save report: {}", style("✗").red(), e);
        }
    }

    print_summary(&report);

    Ok(ExitCode::from(report.exit_code()))
}

fn print_summary(report: &ValidationReport) {
    println!();
    if let Some(code) = &report.cleaned_qr_code {
        println!("{} QR code: {}", style("ℹ").blue(), code);
    }

    if report.is_valid {
        println!("The document satisfies every validation rule.");
        println!();
        println!("STATUS: {}", style("APROBADO").green().bold());
    } else {
        println!("The document fails the following rules:");
        for error in &report.errors {
            println!("  - {}", error);
        }
        println!();
        println!("STATUS: {}", style("RECHAZADO").red().bold());
    }
}
