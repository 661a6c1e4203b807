//! Single-item pipeline: decode → transform → encode for one source file.
//!
//! [`run`] is the only entry point. Where the transform and encode stages
//! execute is an [`ExecutionStrategy`] parameter: inline on the caller's
//! thread, or inside an [`OffloadWorker`]. Both strategies call the same
//! [`process_surface`], so they produce identical bytes for identical input.
//!
//! Decode, transform and encode are the suspension points. A
//! [`CancelToken`] is checked before each of them; a stage that has already
//! started always runs to completion.

use crate::imaging::{self, BackendError, RasterBackend, compression_ratio_percent};
use crate::settings::Settings;
use crate::types::{EncodedResult, SourceFile};
use crate::worker::{OffloadWorker, WorkerRequest, WorkerResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Image processing failed: {0}")]
    Backend(BackendError),
    #[error("Offload worker failed: {0}")]
    Worker(String),
    #[error("Cancelled")]
    Cancelled,
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => PipelineError::Decode(msg),
            BackendError::Encode(msg) => PipelineError::Encode(msg),
            other => PipelineError::Backend(other),
        }
    }
}

/// Shared flag observed at every suspension point.
///
/// Clones share the flag, so a UI thread can hold one clone and cancel a
/// run that another thread is driving.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Where the transform + encode stages run.
pub enum ExecutionStrategy<'a, S> {
    /// On the calling thread.
    Inline,
    /// On the worker's thread; the decoded surface is moved across.
    Offload(&'a OffloadWorker<S>),
}

impl<S> Default for ExecutionStrategy<'_, S> {
    fn default() -> Self {
        ExecutionStrategy::Inline
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub result: EncodedResult,
    pub original_byte_size: u64,
    /// `round((1 - encoded/original) * 100)`; negative when the output grew.
    pub compression_ratio_percent: i64,
}

/// Transform then encode a decoded surface. Shared by every strategy.
pub fn process_surface<B: RasterBackend>(
    backend: &B,
    surface: &B::Surface,
    settings: &Settings,
) -> Result<EncodedResult, BackendError> {
    let transformed = imaging::transform(backend, surface, settings)?;
    imaging::encode(backend, &transformed, &settings.encoder)
}

/// Run the full pipeline for one file.
///
/// Failures are returned, never panicked; callers decide the fallback
/// (single-image mode reports it, batch mode marks the item failed).
pub fn run<B: RasterBackend>(
    backend: &B,
    source: &SourceFile,
    settings: &Settings,
    strategy: &ExecutionStrategy<'_, B::Surface>,
    cancel: &CancelToken,
) -> Result<Compressed, PipelineError> {
    cancel.check()?;
    let surface = backend.decode(&source.bytes)?;
    let dims = backend.dimensions(&surface);
    debug!(file = %source.name, width = dims.width, height = dims.height, "decoded");

    cancel.check()?;
    let result = match strategy {
        ExecutionStrategy::Inline => {
            let transformed = imaging::transform(backend, &surface, settings)?;
            cancel.check()?;
            imaging::encode(backend, &transformed, &settings.encoder)?
        }
        ExecutionStrategy::Offload(worker) => {
            let response = worker.request(WorkerRequest::Compress {
                image_data: surface,
                settings: settings.clone(),
                original_width: dims.width,
                original_height: dims.height,
                file_name: source.name.clone(),
            })?;
            match response {
                WorkerResponse::Success { result, .. } => result,
                WorkerResponse::Error { error } => return Err(PipelineError::Worker(error)),
            }
        }
    };

    let original_byte_size = source.byte_size();
    let compression_ratio_percent = compression_ratio_percent(original_byte_size, result.byte_size);
    debug!(
        file = %source.name,
        original = original_byte_size,
        encoded = result.byte_size,
        ratio = compression_ratio_percent,
        "encoded"
    );

    Ok(Compressed {
        result,
        original_byte_size,
        compression_ratio_percent,
    })
}
