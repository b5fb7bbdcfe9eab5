//! Pure calculation functions for crop and resize geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Computed pixel dimensions are truncated toward zero (matching the floor of
//! the base dimensions) and never drop below one pixel.

use super::params::Align;
use serde::Serialize;

/// A crop window in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
    /// `width / height`, recomputed whenever the window is.
    pub aspect: f64,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Aspect ratio of a `(width, height)` pair.
pub fn aspect_of(width: u32, height: u32) -> f64 {
    width as f64 / height as f64
}

/// Truncate a computed dimension to whole pixels, never below 1.
fn to_pixels(value: f64) -> u32 {
    (value as u32).max(1)
}

/// Offset of a window of size `window` inside `extent` for the given alignment.
fn align_offset(extent: u32, window: u32, align: Align) -> u32 {
    let free = extent.saturating_sub(window);
    match align {
        Align::None | Align::Start => 0,
        Align::Center => free / 2,
        Align::End => free,
    }
}

/// Calculate the crop window that gives `source` the `target_aspect`.
///
/// The crop always keeps one full source axis: a source wider than the target
/// keeps its height and trims width; a taller one keeps its width and trims
/// height. `align` positions the window on the trimmed axis; the other offset
/// is 0.
///
/// # Returns
/// * `None` when the source already has exactly `target_aspect`
///
/// # Examples
/// ```
/// # use simple_wand::imaging::{Align, calculate_crop};
/// // 1000x500 (2:1) → square, centered → 500x500 at x=250
/// let rect = calculate_crop((1000, 500), 1.0, Align::Center).unwrap();
/// assert_eq!((rect.width, rect.height, rect.offset_x, rect.offset_y), (500, 500, 250, 0));
/// ```
pub fn calculate_crop(source: (u32, u32), target_aspect: f64, align: Align) -> Option<CropRect> {
    let (src_w, src_h) = source;
    let src_aspect = aspect_of(src_w, src_h);

    let (width, height, offset_x, offset_y) = if src_aspect > target_aspect {
        // Source is wider: keep height, trim width
        let w = to_pixels(src_h as f64 * target_aspect);
        (w, src_h, align_offset(src_w, w, align), 0)
    } else if src_aspect < target_aspect {
        // Source is taller: keep width, trim height
        let h = to_pixels(src_w as f64 / target_aspect);
        (src_w, h, 0, align_offset(src_h, h, align))
    } else {
        return None;
    };

    Some(CropRect {
        width,
        height,
        aspect: aspect_of(width, height),
        offset_x,
        offset_y,
    })
}

/// Scale `base` dimensions by a percentage.
///
/// ```
/// # use simple_wand::imaging::calculate_scaled;
/// assert_eq!(calculate_scaled((500, 500), 50.0), (250, 250));
/// ```
pub fn calculate_scaled(base: (u32, u32), percent: f64) -> (u32, u32) {
    let (w, h) = base;
    (
        to_pixels(w as f64 * percent / 100.0),
        to_pixels(h as f64 * percent / 100.0),
    )
}

/// Height that keeps `aspect` at the given width.
pub fn height_for_width(width: u32, aspect: f64) -> u32 {
    to_pixels(width as f64 / aspect)
}

/// Width that keeps `aspect` at the given height.
pub fn width_for_height(height: u32, aspect: f64) -> u32 {
    to_pixels(height as f64 * aspect)
}
