//! Common utilities for exambook-pdf
//!
//! Unit conversions between physical page sizes and layout units, plus
//! small formatting helpers shared by the CLI.

use std::time::Duration;

/// Layout resolution: CSS reference pixels per inch.
pub const LAYOUT_DPI: u32 = 96;

/// Convert millimeters to layout pixels at the given DPI.
#[inline]
pub fn mm_to_px(mm: f32, dpi: u32) -> f32 {
    mm * dpi as f32 / 25.4
}

/// Convert layout pixels to millimeters at the given DPI.
#[inline]
pub fn px_to_mm(px: f32, dpi: u32) -> f32 {
    px / dpi as f32 * 25.4
}

/// Convert millimeters to PostScript points.
#[inline]
pub fn mm_to_points(mm: f32) -> f64 {
    (mm as f64 / 25.4) * 72.0
}

/// Convert PostScript points to millimeters.
#[inline]
pub fn points_to_mm(points: f64) -> f32 {
    (points / 72.0 * 25.4) as f32
}

/// Format a duration in human-readable form.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}m {}s", mins, remaining_secs)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

/// Calculate percentage
#[inline]
pub fn percentage(current: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        (current as f32 / total as f32) * 100.0
    }
}
