//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Each entity leads with its positional index and identity (declared name,
//! filter, GIF description); file paths and digests follow as indented
//! context lines. The listing reads as an inventory while still letting a
//! user find the bytes on disk.
//!
//! # Output Format
//!
//! ## Filter (success)
//!
//! ```text
//! a.png [sharpen] → static/images/sharpen-a.png
//!     Size: 800x600 → 500x375 png
//!     SHA-256: 3f1c…
//! ```
//!
//! ## Filter (nothing to do)
//!
//! ```text
//! No image given. Available filters:
//! 001 blur
//! 002 contour
//! ```
//!
//! ## Artifacts
//!
//! ```text
//! Artifacts (2)
//! 001 a.png [blur] 12.4 KB
//!     Path: static/images/blur-a.png
//! ```
//!
//! ## GIF search
//!
//! ```text
//! GIFs for "cats" (1)
//! 001 cat waving
//!     https://media.tenor.com/…/tiny.gif
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::gif_search::Gif;
use crate::intake::{FilteredImage, IntakeEvent, IntakeOutcome, MissingInput};
use crate::store::StoredArtifact;

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

/// Truncate to `max` characters, appending "..." if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `a.png [sharpen] → static/images/sharpen-a.png` plus context lines.
fn filtered_image_lines(image: &FilteredImage, depth: usize) -> Vec<String> {
    vec![
        format!(
            "{} [{}] \u{2192} {}",
            image.declared_name, image.filter, image.reference
        ),
        format!(
            "{}Size: {}x{} \u{2192} {}x{} {}",
            indent(depth + 1),
            image.source_width,
            image.source_height,
            image.width,
            image.height,
            image.format
        ),
        format!("{}SHA-256: {}", indent(depth + 1), image.sha256),
    ]
}

// ============================================================================
// filter
// ============================================================================

/// Format the idle screen: why nothing happened and what can be chosen.
pub fn format_filter_list(missing: MissingInput, filters: &[&str]) -> Vec<String> {
    let reason = match missing {
        MissingInput::Upload => "No image given.",
        MissingInput::Filter => "No filter chosen.",
        MissingInput::Both => "No image or filter given.",
    };
    let mut lines = vec![format!("{} Available filters:", reason)];
    lines.extend(
        filters
            .iter()
            .enumerate()
            .map(|(i, id)| format!("{} {}", format_index(i + 1), id)),
    );
    lines
}

/// Format the outcome of a single request.
pub fn format_intake_outcome(outcome: &IntakeOutcome) -> Vec<String> {
    match outcome {
        IntakeOutcome::Idle { missing, filters } => format_filter_list(*missing, filters),
        IntakeOutcome::Done(image) => filtered_image_lines(image, 0),
    }
}

pub fn print_intake_outcome(outcome: &IntakeOutcome) {
    for line in format_intake_outcome(outcome) {
        println!("{}", line);
    }
}

/// Format one batch progress event. Indices are shown 1-based.
pub fn format_intake_event(event: &IntakeEvent) -> Vec<String> {
    match event {
        IntakeEvent::Filtered { index, image } => {
            let mut lines = filtered_image_lines(image, 0);
            lines[0] = format!("{} {}", format_index(index + 1), lines[0]);
            lines
        }
        IntakeEvent::Failed {
            index,
            declared_name,
            error,
        } => vec![
            format!("{} {}", format_index(index + 1), declared_name),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

// ============================================================================
// artifacts
// ============================================================================

pub fn format_artifacts(artifacts: &[StoredArtifact]) -> Vec<String> {
    if artifacts.is_empty() {
        return vec!["No artifacts".to_string()];
    }
    let mut lines = vec![format!("Artifacts ({})", artifacts.len())];
    for (i, artifact) in artifacts.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}] {}",
            format_index(i + 1),
            artifact.declared_name,
            artifact.filter,
            format_size(artifact.size)
        ));
        lines.push(format!("{}Path: {}", indent(1), artifact.path.display()));
    }
    lines
}

pub fn print_artifacts(artifacts: &[StoredArtifact]) {
    for line in format_artifacts(artifacts) {
        println!("{}", line);
    }
}

// ============================================================================
// gif-search
// ============================================================================

pub fn format_gif_results(query: &str, gifs: &[Gif]) -> Vec<String> {
    if gifs.is_empty() {
        return vec![format!("No GIFs for \"{}\"", query)];
    }
    let mut lines = vec![format!("GIFs for \"{}\" ({})", query, gifs.len())];
    for (i, gif) in gifs.iter().enumerate() {
        let label = [&gif.content_description, &gif.title]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(|s| truncate_desc(s, 60))
            .unwrap_or_else(|| format!("({})", gif.id));
        lines.push(format!("{} {}", format_index(i + 1), label));
        if let Some(url) = gif.preview_url() {
            lines.push(format!("{}{}", indent(1), url));
        }
    }
    lines
}

pub fn print_gif_results(query: &str, gifs: &[Gif]) {
    for line in format_gif_results(query, gifs) {
        println!("{}", line);
    }
}
