//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions an image must be shrunk to so that neither side
/// exceeds `max_edge`.
///
/// Returns `None` when the image already fits; images are never enlarged.
/// Otherwise the longer edge becomes exactly `max_edge` and the shorter edge
/// is scaled by the same factor, rounded, and kept at least 1 pixel.
///
/// # Examples
/// ```text
/// (800, 600), 500  → Some((500, 375))
/// (600, 800), 500  → Some((375, 500))
/// (500, 200), 500  → None
/// (5000, 1), 500   → Some((500, 1))
/// ```
pub fn calculate_bounded_dimensions(original: (u32, u32), max_edge: u32) -> Option<(u32, u32)> {
    let (width, height) = original;
    if width <= max_edge && height <= max_edge {
        return None;
    }

    let scale = |edge: u32, longer: u32| -> u32 {
        ((edge as f64 * max_edge as f64 / longer as f64).round() as u32).max(1)
    };

    if width >= height {
        Some((max_edge, scale(height, width)))
    } else {
        Some((scale(width, height), max_edge))
    }
}
