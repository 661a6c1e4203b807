//! Parameter types for raster operations.
//!
//! These structs describe *what* the backend should do, not *how*. They sit
//! between the transform/encode layer (which decides target sizes and
//! qualities) and the [`backend`](super::backend) (which touches pixels), so
//! the mock backend in tests sees exactly what production would.
//!
//! ## Types
//!
//! - [`ResampleHint`] — smoothing tier for a resize; `Disabled` means nearest-neighbour.
//! - [`ResizeParams`] — target dimensions plus the resample hint.
//! - [`ExportFormat`] — the concrete encoder a surface is exported with.
//! - [`ExportParams`] — format, quality fraction, and JPEG-only hints.

use crate::settings::ResizeMethod;

/// Interpolation quality hint for the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleHint {
    Disabled,
    Low,
    Medium,
    High,
}

impl From<ResizeMethod> for ResampleHint {
    fn from(method: ResizeMethod) -> Self {
        match method {
            ResizeMethod::Pixelated => ResampleHint::Disabled,
            ResizeMethod::Low => ResampleHint::Low,
            ResizeMethod::Medium => ResampleHint::Medium,
            ResizeMethod::High => ResampleHint::High,
        }
    }
}

/// Parameters for a resize draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub hint: ResampleHint,
}

/// Encoders a surface can be exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Png => "image/png",
            ExportFormat::Webp => "image/webp",
            ExportFormat::Avif => "image/avif",
        }
    }
}

/// Parameters for exporting a surface to encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportParams {
    pub format: ExportFormat,
    /// Quality in `0.0..=1.0`. WebP at `1.0` is encoded losslessly.
    pub quality: f32,
    pub progressive: bool,
    pub optimize: bool,
}

impl ExportParams {
    pub fn new(format: ExportFormat, quality: f32) -> Self {
        Self {
            format,
            quality,
            progressive: false,
            optimize: false,
        }
    }

    /// Quality scaled to the 0–100 range most encoders take.
    pub fn quality_percent(&self) -> u8 {
        (self.quality.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}
