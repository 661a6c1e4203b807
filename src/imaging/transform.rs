//! Transform pipeline: rotation, then resize.
//!
//! The order is fixed. Resize targets are defined relative to the rotated
//! orientation, so the plan computes the resize from post-rotation
//! dimensions. Planning is pure ([`plan_transform`]); execution
//! ([`transform`]) only replays the plan against a backend.

use super::backend::{BackendError, Dimensions, RasterBackend};
use super::calculations::{resize_target, rotated_dimensions};
use super::params::{ResampleHint, ResizeParams};
use crate::settings::{Rotation, Settings};

/// The steps one transform will run, and the size it will produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    pub rotation: Option<Rotation>,
    pub resize: Option<ResizeParams>,
    pub output: Dimensions,
}

impl TransformPlan {
    pub fn is_noop(&self) -> bool {
        self.rotation.is_none() && self.resize.is_none()
    }
}

/// Plan the transform of a `source`-sized surface without touching pixels.
///
/// Fails when the resize target cannot be represented.
pub fn plan_transform(
    source: Dimensions,
    settings: &Settings,
) -> Result<TransformPlan, BackendError> {
    let rotation = (settings.rotate != Rotation::None).then_some(settings.rotate);
    let rotated = rotated_dimensions(source, settings.rotate);

    let resize = resize_target(rotated, &settings.resize)?.map(|target| ResizeParams {
        width: target.width,
        height: target.height,
        hint: ResampleHint::from(settings.resize.method),
    });

    Ok(TransformPlan {
        rotation,
        resize,
        output: resize
            .map(|r| Dimensions::new(r.width, r.height))
            .unwrap_or(rotated),
    })
}

/// Apply `settings.rotate` then `settings.resize` to `source`.
///
/// Always returns a new surface; when neither step applies the result is a
/// copy of the source so callers can treat every outcome the same way.
pub fn transform<B: RasterBackend>(
    backend: &B,
    source: &B::Surface,
    settings: &Settings,
) -> Result<B::Surface, BackendError> {
    let plan = plan_transform(backend.dimensions(source), settings)?;

    let rotated = match plan.rotation {
        Some(rotation) => Some(backend.rotate(source, rotation)?),
        None => None,
    };
    let current = rotated.as_ref().unwrap_or(source);

    match plan.resize {
        Some(params) => backend.resize(current, &params),
        None => Ok(rotated.unwrap_or_else(|| source.clone())),
    }
}
