//! Encoder adapter: collapse an [`EncoderSpec`] into a single-format
//! [`EncodePlan`] and export a surface with it.
//!
//! | Format | MIME | Quality fraction |
//! |---|---|---|
//! | jpeg | `image/jpeg` | `quality / 100` |
//! | png | `image/png` | `quality / 100` (lossless encoders ignore it) |
//! | webp | `image/webp` | `1.0` when `lossless`, else `quality / 100` |
//! | avif | `image/avif` | `quality / 100` |
//! | anything else | `image/jpeg` | `0.75` |

use super::backend::{BackendError, RasterBackend};
use super::params::{ExportFormat, ExportParams};
use crate::settings::{EncoderSpec, OutputFormat};
use crate::types::EncodedResult;
use tracing::warn;

/// Quality used when the requested format is not recognised.
pub const FALLBACK_QUALITY: f32 = 0.75;

/// The active format with only its own options, qualities as fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodePlan {
    Jpeg {
        quality: f32,
        progressive: bool,
        optimize: bool,
    },
    Png {
        quality: f32,
    },
    Webp {
        quality: f32,
        lossless: bool,
    },
    Avif {
        quality: f32,
    },
}

impl EncodePlan {
    /// Resolve the plan for the spec's active format.
    pub fn resolve(spec: &EncoderSpec) -> Self {
        match &spec.format {
            OutputFormat::Jpeg => EncodePlan::Jpeg {
                quality: spec.jpeg.quality.fraction(),
                progressive: spec.jpeg.progressive,
                optimize: spec.jpeg.optimize,
            },
            OutputFormat::Png => EncodePlan::Png {
                quality: spec.png.quality.fraction(),
            },
            OutputFormat::Webp => EncodePlan::Webp {
                // Lossless takes precedence over the stored quality.
                quality: if spec.webp.lossless {
                    1.0
                } else {
                    spec.webp.quality.fraction()
                },
                lossless: spec.webp.lossless,
            },
            OutputFormat::Avif => EncodePlan::Avif {
                quality: spec.avif.quality.fraction(),
            },
            OutputFormat::Unrecognized(name) => {
                warn!(format = %name, "unsupported output format, falling back to JPEG");
                EncodePlan::fallback()
            }
        }
    }

    pub fn fallback() -> Self {
        EncodePlan::Jpeg {
            quality: FALLBACK_QUALITY,
            progressive: false,
            optimize: false,
        }
    }

    pub fn quality(&self) -> f32 {
        match *self {
            EncodePlan::Jpeg { quality, .. }
            | EncodePlan::Png { quality }
            | EncodePlan::Webp { quality, .. }
            | EncodePlan::Avif { quality } => quality,
        }
    }

    pub fn export_format(&self) -> ExportFormat {
        match self {
            EncodePlan::Jpeg { .. } => ExportFormat::Jpeg,
            EncodePlan::Png { .. } => ExportFormat::Png,
            EncodePlan::Webp { .. } => ExportFormat::Webp,
            EncodePlan::Avif { .. } => ExportFormat::Avif,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.export_format().mime_type()
    }

    pub fn export_params(&self) -> ExportParams {
        let mut params = ExportParams::new(self.export_format(), self.quality());
        if let EncodePlan::Jpeg {
            progressive,
            optimize,
            ..
        } = *self
        {
            params.progressive = progressive;
            params.optimize = optimize;
        }
        params
    }
}

/// Encode `surface` with the spec's active format.
///
/// Fails with [`BackendError::Encode`] when the backend returns no data.
/// The surface is only borrowed.
pub fn encode<B: RasterBackend>(
    backend: &B,
    surface: &B::Surface,
    spec: &EncoderSpec,
) -> Result<EncodedResult, BackendError> {
    let plan = EncodePlan::resolve(spec);
    let bytes = backend.export(surface, &plan.export_params())?;
    if bytes.is_empty() {
        return Err(BackendError::Encode(format!(
            "{} export produced no data",
            plan.mime_type()
        )));
    }
    let dims = backend.dimensions(surface);
    Ok(EncodedResult::new(
        bytes,
        plan.mime_type(),
        dims.width,
        dims.height,
    ))
}
