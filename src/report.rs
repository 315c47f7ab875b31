use std::path::Path;

use lib_core::media::{DECLARED_FORMATS, DECLARED_MAX_BYTES, TARGET_RESOLUTION};
use lib_domain::presenter::ResultSummary;
use pd_dto::res::HealthStatus;
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{out}"),
        Err(err) => tracing::error!(message = "Failed to serialize report", err = %err),
    }
}

/// Stats card of a finished comparison
pub fn result(summary: &ResultSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Text => println!("{}", result_card(summary)),
    }
}

fn result_card(summary: &ResultSummary) -> String {
    format!(
        "similarity   {}%\ntotal        {}K px\ndifferent    {}K px\nverdict      {}\ndiff         {}",
        summary.similarity_percentage,
        summary.total_kilo_pixels,
        summary.different_kilo_pixels,
        summary.classification.label,
        summary.diff_filename
    )
}

pub fn failure(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&json!({ "success": false, "error": message })),
        OutputFormat::Text => eprintln!("comparison failed: {message}"),
    }
}

/// Live estimate, text mode only. Rewrites the same stderr line.
pub fn progress(value: f32, format: OutputFormat) {
    if format == OutputFormat::Text {
        eprint!("\rcomparing {value:>3.0}%");
    }
}

/// Last estimate seen when the request finished
pub fn progress_end(value: f32, format: OutputFormat) {
    if format == OutputFormat::Text {
        eprintln!("\rcomparing {value:>3.0}%");
    }
}

pub fn saved(what: &str, path: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&json!({ "saved": what, "path": path.display().to_string() })),
        OutputFormat::Text => println!("{what} saved to {}", path.display()),
    }
}

pub fn health(status: &HealthStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(status),
        OutputFormat::Text => println!("{}: {}", status.status, status.message),
    }
}

pub fn limits(format: OutputFormat) {
    let (width, height) = TARGET_RESOLUTION;
    match format {
        OutputFormat::Json => print_json(&json!({
            "max_bytes": DECLARED_MAX_BYTES,
            "target_resolution": { "width": width, "height": height },
            "formats": DECLARED_FORMATS,
        })),
        OutputFormat::Text => println!(
            "max size     {}MB\nresolution   {width}x{height}\nformats      {}",
            DECLARED_MAX_BYTES / (1024 * 1024),
            DECLARED_FORMATS.join(", ")
        ),
    }
}
