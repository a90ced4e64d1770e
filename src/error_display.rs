//! One-line, user-facing messages for load and configuration failures.
//!
//! Walks the report's cause chain and matches on typed errors (PolarsError variants,
//! io::ErrorKind, TOML parse errors) instead of parsing message strings.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. The dataset needs the expected header row.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("Dataset is empty: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::ComputeError(msg) => format!("Could not parse the dataset: {}", msg),
        PE::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

fn with_path(msg: String, path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    }
}

/// Format a report for display. `path` names the file being loaded, when there is one.
pub fn user_message(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    for cause in report.chain() {
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe), path);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None), path);
        }
        if let Some(toml_err) = cause.downcast_ref::<toml::de::Error>() {
            let msg = format!("Invalid configuration: {}", toml_err.message());
            return with_path(msg, path);
        }
    }

    // first line only; the full report can carry a long backtrace section
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred").trim();
    with_path(first_line.to_string(), path)
}
