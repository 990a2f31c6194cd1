//! CLI entry points.
//!
//! Each `run_*` function performs one pipeline operation and prints the
//! result to stdout. Pipeline failures print `Error: <message>` to stderr
//! and exit with status 1.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{Namespace, Preview};
use crate::pipeline::Pipeline;
use crate::store::FsBlobStore;

fn or_exit<T>(result: std::result::Result<T, PipelineError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Creates the storage directories.
pub fn run_init(config: &Config) -> Result<()> {
    let store = FsBlobStore::from_config(config);
    let raw = store.dir(Namespace::Raw);
    let cleaned = store.dir(Namespace::Cleaned);
    store.ensure_dirs().with_context(|| {
        format!(
            "Failed to create {} and {}",
            raw.display(),
            cleaned.display()
        )
    })?;
    println!("Storage initialized.");
    println!("raw:     {}", raw.display());
    println!("cleaned: {}", cleaned.display());
    Ok(())
}

/// Uploads a local file, stored under `name` or the file's own name.
pub fn run_upload(pipeline: &Pipeline, path: &Path, name: Option<&str>) -> Result<()> {
    let filename = match name {
        Some(n) => n.to_string(),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("Cannot derive a filename from {}", path.display()))?,
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let receipt = or_exit(pipeline.upload(&filename, &bytes));
    println!("Uploaded {} -> {}", receipt.filename, receipt.location);
    Ok(())
}

pub fn run_clean(pipeline: &Pipeline, filename: &str, json: bool) -> Result<()> {
    let report = or_exit(pipeline.clean(filename));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cleaned {} -> {}", report.filename, report.cleaned_location);
    println!("rows:   {}", report.rows);
    println!("sha256: {}", report.sha256);
    println!();
    print_preview(&report.preview);
    Ok(())
}

pub fn run_view(pipeline: &Pipeline, filename: &str, json: bool) -> Result<()> {
    let preview = or_exit(pipeline.view(filename));

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print_preview(&preview);
    }
    Ok(())
}

/// Writes the cleaned artifact to `output`, or to stdout when absent.
pub fn run_download(pipeline: &Pipeline, filename: &str, output: Option<&Path>) -> Result<()> {
    let bytes = or_exit(pipeline.download(filename));

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
        }
    }
    Ok(())
}

pub fn run_list(pipeline: &Pipeline) -> Result<()> {
    let listing = or_exit(pipeline.list());

    println!("raw ({}):", listing.raw.len());
    for name in &listing.raw {
        println!("  {}", name);
    }
    println!("cleaned ({}):", listing.cleaned.len());
    for name in &listing.cleaned {
        println!("  {}", name);
    }
    Ok(())
}

pub fn run_logs(pipeline: &Pipeline, lines: Option<usize>) -> Result<()> {
    for line in or_exit(pipeline.logs(lines)) {
        println!("{}", line);
    }
    Ok(())
}

/// Prints a preview as a left-aligned text table.
fn print_preview(preview: &Preview) {
    let mut widths: Vec<usize> = preview.columns.iter().map(|c| c.chars().count()).collect();
    for row in &preview.rows {
        for (width, value) in widths.iter_mut().zip(row.values()) {
            *width = (*width).max(value.chars().count());
        }
    }

    let format_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!(
        "{}",
        format_line(preview.columns.iter().map(String::as_str).collect())
    );
    for row in &preview.rows {
        println!("{}", format_line(row.values().collect()));
    }
    println!(
        "({} of {} rows)",
        preview.rows.len(),
        preview.total_rows
    );
}
