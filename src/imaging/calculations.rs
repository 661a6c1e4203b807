//! Pure calculation functions for dimensions and size ratios.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::{BackendError, Dimensions};
use crate::settings::{ResizeSpec, Rotation};

/// Round half-up (towards positive infinity), matching how ratios are
/// displayed elsewhere: `-2.5` rounds to `-2`, `2.5` to `3`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Dimensions after rotating by `rotation`.
pub fn rotated_dimensions(dims: Dimensions, rotation: Rotation) -> Dimensions {
    if rotation.swaps_axes() {
        Dimensions::new(dims.height, dims.width)
    } else {
        dims
    }
}

/// Calculate the resize target for a surface of size `basis`.
///
/// `basis` must be the **post-rotation** size. Returns `None` when the resize
/// step does not apply (disabled, or neither side set).
///
/// - Unset sides default to the basis side.
/// - With `maintain_aspect` and exactly one side set, the other is
///   `round(basis_other / basis_this * set_side)`, never below 1.
/// - Both sides set: taken as-is.
///
/// A derived side that does not fit in a `u32` is an error.
pub fn resize_target(
    basis: Dimensions,
    spec: &ResizeSpec,
) -> Result<Option<Dimensions>, BackendError> {
    if !spec.applies() {
        return Ok(None);
    }

    let (src_w, src_h) = (basis.width as f64, basis.height as f64);
    let mut width = spec.width().unwrap_or(basis.width);
    let mut height = spec.height().unwrap_or(basis.height);

    if spec.maintain_aspect && basis.width > 0 && basis.height > 0 {
        match (spec.width(), spec.height()) {
            (Some(w), None) => height = derived_side(src_h / src_w * w as f64)?,
            (None, Some(h)) => width = derived_side(src_w / src_h * h as f64)?,
            _ => {}
        }
    }

    Ok(Some(Dimensions::new(width, height)))
}

fn derived_side(exact: f64) -> Result<u32, BackendError> {
    let side = round_half_up(exact).max(1);
    u32::try_from(side).map_err(|_| {
        BackendError::ProcessingFailed(format!(
            "Derived resize side {side} exceeds the {} pixel limit",
            u32::MAX
        ))
    })
}

/// Percentage saved by re-encoding: `round((1 - compressed/original) * 100)`.
///
/// Negative when the output grew. An empty original yields 0 rather than
/// dividing by zero; an empty output yields 100.
pub fn compression_ratio_percent(original: u64, compressed: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    round_half_up((1.0 - compressed as f64 / original as f64) * 100.0)
}

/// Batch savings: `round(saved / original * 100)`, 0 for an empty total.
pub fn saved_percent(total_original: u64, total_compressed: u64) -> i64 {
    if total_original == 0 {
        return 0;
    }
    let saved = total_original as f64 - total_compressed as f64;
    round_half_up(saved / total_original as f64 * 100.0)
}
