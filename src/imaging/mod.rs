//! Raster operations behind a swappable backend.
//!
//! | Operation | Where |
//! |---|---|
//! | **Decode / rotate / resize / export** | [`RasterBackend`] trait, [`RustBackend`] impl |
//! | **Rotate → resize** | [`transform`] (order fixed) |
//! | **Format + quality resolution** | [`EncodePlan`], [`encode`] |
//! | **Dimension and ratio math** | `calculations` (pure) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and ratio math (unit testable)
//! - **Parameters**: Data structures describing backend operations
//! - **Backend**: [`RasterBackend`] trait + [`RustBackend`]
//! - **Transform / Encoder**: the two pipeline stages built on the backend

pub mod backend;
pub mod calculations;
pub mod encoder;
mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, Dimensions, RasterBackend};
pub use calculations::{compression_ratio_percent, saved_percent};
pub use encoder::{EncodePlan, encode};
pub use params::{ExportFormat, ExportParams, ResampleHint, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use transform::{TransformPlan, plan_transform, transform};
