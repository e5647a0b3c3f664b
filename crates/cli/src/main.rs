//! CLI tool for building presentations from a PowerPoint template and a content plan.

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::{ContentPlan, RunSummary};
use deck_pptx::{BuildOptions, DeckBuilder};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Build a .pptx deck from template slides and a JSON content plan.
#[derive(Parser, Debug)]
#[command(name = "deck-build")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template presentation (.pptx)
    #[arg(short, long)]
    template: PathBuf,

    /// Content plan (JSON with a "ppt_pages" list)
    #[arg(short, long)]
    plan: PathBuf,

    /// Output file (default: <plan name>.pptx next to the plan)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory relative image paths are resolved against (default: the plan's directory)
    #[arg(short, long)]
    image_root: Option<PathBuf>,

    /// Write the run summary as JSON to this file
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Do not resize title boxes to fit their text
    #[arg(long)]
    no_layout: bool,

    /// Do not restore the template's connectors after editing
    #[arg(long)]
    no_connectors: bool,

    /// Keep template captions on shapes that received no value
    #[arg(long)]
    keep_placeholder_text: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let template = std::fs::read(&args.template)
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let plan_bytes = std::fs::read(&args.plan)
        .with_context(|| format!("Failed to read plan {}", args.plan.display()))?;
    let plan = ContentPlan::from_slice(&plan_bytes)
        .with_context(|| format!("Invalid content plan {}", args.plan.display()))?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.plan));
    let builder = DeckBuilder::new(build_options(&args));

    log::info!(
        "Building {} slides from {}",
        plan.len(),
        args.template.display()
    );

    let summary = builder
        .build_to_path(&template, &plan, &output_path)
        .with_context(|| format!("Failed to build {}", output_path.display()))?;

    if let Some(report_path) = &args.report {
        write_report(report_path, &summary)?;
    }

    println!("{}", summary_line(&output_path, &summary));
    Ok(())
}

fn build_options(args: &Args) -> BuildOptions {
    let image_root = args
        .image_root
        .clone()
        .or_else(|| args.plan.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    BuildOptions::new()
        .with_image_root(image_root)
        .with_layout_adjustment(!args.no_layout)
        .with_connector_preservation(!args.no_connectors)
        .with_placeholder_cleanup(!args.keep_placeholder_text)
}

/// `<plan stem>.pptx` in the plan's directory.
fn default_output_path(plan: &Path) -> PathBuf {
    let stem = plan
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    plan.with_file_name(format!("{}.pptx", stem))
}

fn summary_line(output: &Path, summary: &RunSummary) -> String {
    format!(
        "Wrote {}: {} slides, {} values bound, {} warnings, {} layout skips",
        output.display(),
        summary.slides,
        summary.bound,
        summary.warnings.len(),
        summary.layout_skips.len()
    )
}

/// Write the run summary as pretty JSON.
fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    Ok(())
}
