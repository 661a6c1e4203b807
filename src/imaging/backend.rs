//! Raster backend trait and shared types.
//!
//! The [`RasterBackend`] trait is the whole contract the pipeline needs from
//! a drawing/encoding engine: decode, measure, rotate, resize, and export.
//! Every operation returns a **new** surface; nothing is mutated in place.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` in this module.

use super::params::{ExportParams, ResizeParams};
use crate::settings::Rotation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Trait for raster backends.
///
/// `Surface` must be cheap enough to clone for a defensive copy and
/// self-contained enough to move into the offload worker thread.
pub trait RasterBackend: Sync {
    type Surface: Clone + Send + 'static;

    /// Decode encoded file bytes into a surface.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Surface, BackendError>;

    fn dimensions(&self, surface: &Self::Surface) -> Dimensions;

    /// Rotate about the centre into a new bounding box (no cropping).
    fn rotate(
        &self,
        surface: &Self::Surface,
        rotation: Rotation,
    ) -> Result<Self::Surface, BackendError>;

    /// Draw the surface scaled to exactly `params.width` × `params.height`.
    fn resize(
        &self,
        surface: &Self::Surface,
        params: &ResizeParams,
    ) -> Result<Self::Surface, BackendError>;

    /// Encode the surface. An empty buffer means the runtime produced no data.
    fn export(&self, surface: &Self::Surface, params: &ExportParams)
    -> Result<Vec<u8>, BackendError>;
}
