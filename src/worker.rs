//! Offload worker: a long-lived thread that runs transform + encode.
//!
//! The worker owns its own backend instance. Callers send a
//! [`WorkerRequest`] carrying a copy of the decoded surface and get exactly
//! one [`WorkerResponse`] back on a reply channel created per request, so
//! concurrent callers never see each other's responses.
//!
//! Dropping the [`OffloadWorker`] closes the request queue and joins the
//! thread. A request sent to a worker whose thread has died fails with
//! [`PipelineError::Worker`] instead of hanging.

use crate::imaging::{Dimensions, RasterBackend};
use crate::pipeline::{PipelineError, process_surface};
use crate::settings::Settings;
use crate::types::EncodedResult;
use serde::Serialize;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Work sent to the worker thread.
#[derive(Debug, Clone)]
pub enum WorkerRequest<S> {
    Compress {
        image_data: S,
        settings: Settings,
        original_width: u32,
        original_height: u32,
        file_name: String,
    },
}

/// Reply to one request. Serializes as a `type`-tagged JSON message; the
/// encoded bytes stay in memory and are never written out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerResponse {
    Success {
        result: EncodedResult,
        file_name: String,
        width: u32,
        height: u32,
    },
    Error {
        error: String,
    },
}

struct Job<S> {
    request: WorkerRequest<S>,
    reply: Sender<WorkerResponse>,
}

pub struct OffloadWorker<S> {
    queue: Option<Sender<Job<S>>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> OffloadWorker<S> {
    /// Start the worker thread. `backend` moves into the thread.
    pub fn spawn<B>(backend: B) -> std::io::Result<Self>
    where
        B: RasterBackend<Surface = S> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Job<S>>();
        let handle = std::thread::Builder::new()
            .name("rasterpress-worker".into())
            .spawn(move || {
                for job in rx {
                    let response = handle_request(&backend, job.request);
                    // The caller may have given up waiting; nothing to do then.
                    let _ = job.reply.send(response);
                }
                debug!("offload worker queue closed");
            })?;
        Ok(Self {
            queue: Some(tx),
            handle: Some(handle),
        })
    }

    /// Send one request and block until its response arrives.
    pub fn request(&self, request: WorkerRequest<S>) -> Result<WorkerResponse, PipelineError> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| PipelineError::Worker("worker has been terminated".into()))?;
        let (reply, response) = mpsc::channel();
        queue
            .send(Job { request, reply })
            .map_err(|_| PipelineError::Worker("worker thread is not running".into()))?;
        response
            .recv()
            .map_err(|_| PipelineError::Worker("worker exited without responding".into()))
    }
}

impl<S> Drop for OffloadWorker<S> {
    fn drop(&mut self) {
        self.queue.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("offload worker thread panicked");
        }
    }
}

fn handle_request<B: RasterBackend>(
    backend: &B,
    request: WorkerRequest<B::Surface>,
) -> WorkerResponse {
    match request {
        WorkerRequest::Compress {
            image_data,
            settings,
            original_width,
            original_height,
            file_name,
        } => {
            let actual = backend.dimensions(&image_data);
            if actual != Dimensions::new(original_width, original_height) {
                return WorkerResponse::Error {
                    error: format!(
                        "{file_name}: surface is {}x{}, request says {original_width}x{original_height}",
                        actual.width, actual.height
                    ),
                };
            }
            match process_surface(backend, &image_data, &settings) {
                Ok(result) => WorkerResponse::Success {
                    width: result.width,
                    height: result.height,
                    result,
                    file_name,
                },
                Err(e) => WorkerResponse::Error {
                    error: e.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ExportFormat;
    use crate::imaging::backend::tests::MockBackend;
    use crate::settings::{OutputFormat, Rotation};

    fn compress(surface: Dimensions, settings: Settings) -> WorkerRequest<Dimensions> {
        WorkerRequest::Compress {
            image_data: surface,
            settings,
            original_width: surface.width,
            original_height: surface.height,
            file_name: "a.png".into(),
        }
    }

    #[test]
    fn success_carries_result_and_dimensions() {
        let worker = OffloadWorker::spawn(MockBackend::with_export_size(12)).unwrap();
        let settings = Settings::default().with_rotation(Rotation::Quarter);
        let response = worker
            .request(compress(Dimensions::new(40, 20), settings))
            .unwrap();
        match response {
            WorkerResponse::Success {
                result,
                file_name,
                width,
                height,
            } => {
                assert_eq!(file_name, "a.png");
                assert_eq!((width, height), (20, 40));
                assert_eq!(result.byte_size, 12);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn encode_failure_becomes_error_response() {
        let worker = OffloadWorker::spawn(MockBackend::without_encoder(ExportFormat::Avif)).unwrap();
        let settings = Settings::default().with_format(OutputFormat::Avif);
        let response = worker
            .request(compress(Dimensions::new(4, 4), settings))
            .unwrap();
        assert!(matches!(response, WorkerResponse::Error { .. }));
    }

    #[test]
    fn mismatched_dimensions_rejected() {
        let worker = OffloadWorker::spawn(MockBackend::new()).unwrap();
        let response = worker
            .request(WorkerRequest::Compress {
                image_data: Dimensions::new(4, 4),
                settings: Settings::default(),
                original_width: 8,
                original_height: 8,
                file_name: "x.png".into(),
            })
            .unwrap();
        assert!(matches!(response, WorkerResponse::Error { .. }));
    }

    #[test]
    fn serves_many_requests_in_order() {
        let worker = OffloadWorker::spawn(MockBackend::new()).unwrap();
        for side in 1..=5 {
            let response = worker
                .request(compress(Dimensions::new(side, side), Settings::default()))
                .unwrap();
            assert!(matches!(
                response,
                WorkerResponse::Success { width, .. } if width == side
            ));
        }
    }

    #[test]
    fn response_json_is_tagged() {
        let ok = WorkerResponse::Success {
            result: EncodedResult::new(vec![1, 2], "image/png", 3, 4),
            file_name: "f.png".into(),
            width: 3,
            height: 4,
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["type"], "success");
        assert_eq!(json["file_name"], "f.png");
        assert_eq!(json["result"]["byte_size"], 2);
        assert!(json["result"].get("bytes").is_none());

        let err = WorkerResponse::Error {
            error: "boom".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn drop_joins_thread() {
        let worker = OffloadWorker::spawn(MockBackend::new()).unwrap();
        drop(worker);
    }
}
