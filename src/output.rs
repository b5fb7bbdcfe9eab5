//! CLI output formatting.
//!
//! Every command has a pure `format_*` function returning display lines and a
//! thin `print_*` wrapper that writes them to stdout. Logging goes through
//! `tracing`; only results go through here.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! photo.jpg
//!     Format: JPEG
//!     Size: 4000x3000
//!     Quality: 100
//! ```
//!
//! ## Convert
//!
//! ```text
//! photo.jpg → square.png
//!     4000x3000 → 800x800
//!     Crop: 3000x3000 at (500, 0)
//!     Quality: 90
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 photo.jpg → out/photo.jpg
//! 002 broken.jpg: decode failed: unable to open image
//! 1 saved, 1 failed
//! ```

use crate::error::WandError;
use crate::session::ImageInfo;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Directive lines shared by `info` and `convert`.
fn directive_lines(info: &ImageInfo) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(crop) = info.crop {
        lines.push(format!(
            "{}Crop: {}x{} at ({}, {})",
            indent(1),
            crop.width,
            crop.height,
            crop.offset_x,
            crop.offset_y
        ));
    }
    if let Some(resize) = info.resize {
        lines.push(format!(
            "{}Resize: {}x{}",
            indent(1),
            resize.width,
            resize.height
        ));
    }
    lines.push(format!("{}Quality: {}", indent(1), info.quality));
    if let Some(format) = &info.target_format {
        lines.push(format!("{}Output format: {}", indent(1), format));
    }
    lines
}

// ============================================================================
// info
// ============================================================================

/// Format a session snapshot for the `info` command.
pub fn format_info(info: &ImageInfo) -> Vec<String> {
    let title = info
        .source
        .as_deref()
        .map(display_name)
        .unwrap_or_else(|| "(no image)".to_string());
    let mut lines = vec![title];
    if !info.loaded {
        lines.push(format!("{}not loaded", indent(1)));
        return lines;
    }
    if let Some(format) = &info.format {
        lines.push(format!("{}Format: {}", indent(1), format));
    }
    lines.push(format!(
        "{}Size: {}x{}",
        indent(1),
        info.raw_width,
        info.raw_height
    ));
    lines.extend(directive_lines(info));
    lines
}

/// Print `info` output to stdout, as text or pretty JSON.
pub fn print_info(info: &ImageInfo, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
    } else {
        for line in format_info(info) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ============================================================================
// convert
// ============================================================================

/// Format the result of a single conversion.
pub fn format_convert(input: &Path, output: &Path, info: &ImageInfo) -> Vec<String> {
    let mut lines = vec![
        format!("{} → {}", display_name(input), output.display()),
        format!(
            "{}{}x{} → {}x{}",
            indent(1),
            info.raw_width,
            info.raw_height,
            info.width,
            info.height
        ),
    ];
    lines.extend(directive_lines(info));
    lines
}

pub fn print_convert(input: &Path, output: &Path, info: &ImageInfo) {
    for line in format_convert(input, output, info) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

/// Format one finished batch entry.
pub fn format_batch_result(
    index: usize,
    input: &Path,
    output: &Path,
    result: &Result<(), WandError>,
) -> String {
    match result {
        Ok(()) => format!(
            "{} {} → {}",
            format_index(index),
            display_name(input),
            output.display()
        ),
        Err(err) => format!("{} {}: {}", format_index(index), display_name(input), err),
    }
}

pub fn format_batch_summary(saved: usize, failed: usize) -> String {
    format!("{} saved, {} failed", saved, failed)
}

pub fn print_batch_result(
    index: usize,
    input: &Path,
    output: &Path,
    result: &Result<(), WandError>,
) {
    println!("{}", format_batch_result(index, input, output, result));
}

pub fn print_batch_summary(saved: usize, failed: usize) {
    println!("{}", format_batch_summary(saved, failed));
}
