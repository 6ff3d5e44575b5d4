//! CLI output formatting.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! Transformations
//! 001 noop
//!     Leave the image unchanged.
//! 004 crop [argument required]
//!     Crop to a rectangle given as four relative coordinates [x1, y1, x2, y2], …
//! 016 rotate [optional argument]
//!     Rotate the image clockwise. Accepts an optional number of degrees (default 90).
//!
//! Formats
//!     JPEG  read write
//!     AVIF       write
//! ```
//!
//! ## Transform / Run
//!
//! ```text
//! dawn.jpg → out/img.png
//!     Steps: grayscale, rotate(45)
//! dusk.jpg: failed
//!     Error: step 0: unknown transformation 'bogus'
//!
//! Processed 2 requests, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{ArgumentValue, FormatSupport, Transformation};
use crate::pipeline::{AlterError, PipelineRequest, PipelineStep};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `rotate(45)`, or just `blur` when there is no argument.
fn step_label(step: &PipelineStep) -> String {
    match &step.argument {
        ArgumentValue::None => step.name.clone(),
        arg => format!("{}({})", step.name, arg),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// list
// ============================================================================

/// Format the transformation catalog, one entry per registered name.
pub fn format_transformations(transformations: &[Transformation]) -> Vec<String> {
    let mut lines = vec!["Transformations".to_string()];
    for (i, t) in transformations.iter().enumerate() {
        let args = if t.requires_args {
            " [argument required]"
        } else if t.accepts_args {
            " [optional argument]"
        } else {
            ""
        };
        lines.push(format!("{} {}{}", format_index(i + 1), t.name, args));
        lines.push(format!("{}{}", indent(1), t.doc));
    }
    lines
}

/// Format codec format support as an aligned table.
pub fn format_formats(formats: &[FormatSupport]) -> Vec<String> {
    let mut lines = vec!["Formats".to_string()];
    for f in formats {
        let read = if f.read { "read" } else { "    " };
        let write = if f.write { "write" } else { "" };
        lines.push(
            format!("{}{:<5} {} {}", indent(1), f.format.name(), read, write)
                .trim_end()
                .to_string(),
        );
    }
    lines
}

/// The whole catalog as a single line: `name -- doc | name -- doc | …`.
///
/// Hosts that register the engine as a plugin show this as the help text of
/// the `actions` parameter.
pub fn actions_doc(transformations: &[Transformation]) -> String {
    transformations
        .iter()
        .map(|t| format!("{} -- {}", t.name, t.doc))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Print the catalog and format table to stdout.
pub fn print_list(transformations: &[Transformation], formats: &[FormatSupport]) {
    for line in format_transformations(transformations) {
        println!("{}", line);
    }
    println!();
    for line in format_formats(formats) {
        println!("{}", line);
    }
}

// ============================================================================
// transform / run
// ============================================================================

/// Format the outcome of one request.
pub fn format_result(
    request: &PipelineRequest,
    result: &Result<PathBuf, AlterError>,
) -> Vec<String> {
    let source = file_label(&request.source);
    let mut lines = match result {
        Ok(path) => vec![format!("{} → {}", source, path.display())],
        Err(_) => vec![format!("{}: failed", source)],
    };
    if !request.steps.is_empty() {
        let steps: Vec<String> = request.steps.iter().map(step_label).collect();
        lines.push(format!("{}Steps: {}", indent(1), steps.join(", ")));
    }
    if let Err(e) = result {
        lines.push(format!("{}Error: {}", indent(1), e));
    }
    lines
}

/// `Processed 3 requests, 1 failed`
pub fn format_summary(total: usize, failed: usize) -> String {
    let noun = if total == 1 { "request" } else { "requests" };
    if failed == 0 {
        format!("Processed {} {}", total, noun)
    } else {
        format!("Processed {} {}, {} failed", total, noun, failed)
    }
}

/// Print one request outcome to stdout.
pub fn print_result(request: &PipelineRequest, result: &Result<PathBuf, AlterError>) {
    for line in format_result(request, result) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
