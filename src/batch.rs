//! Batch orchestrator: drive the single-item pipeline over many files.
//!
//! ## State machines
//!
//! ```text
//! item: pending ─→ processing ─→ completed
//!                            └─→ failed
//! run:  idle ─→ running ─→ done
//!                     └─→ cancelled
//! ```
//!
//! ## Ordering
//!
//! Files are processed strictly one after another, in the order supplied.
//! Only one decoded surface is alive at a time and progress is always
//! "file N of M". There is no parallel fan-out.
//!
//! ## Failure isolation
//!
//! A failing file is marked `failed` with its error message and the loop
//! moves on. Failed items never contribute to the totals. The run itself
//! cannot fail: the worst outcome is every item failed with zero totals.
//!
//! ## Cancellation
//!
//! The [`CancelToken`] is checked before each file and inside the pipeline
//! between stages. The item in flight when cancellation is observed is
//! marked failed with "cancelled"; later items stay `pending`.

use crate::imaging::{RasterBackend, saved_percent, supported_input_extensions};
use crate::naming::{EntryNames, batch_entry_name};
use crate::pipeline::{self, CancelToken, ExecutionStrategy, PipelineError};
use crate::settings::{BatchSettings, OutputFormat};
use crate::types::{EncodedResult, SourceFile};
use serde::Serialize;
use std::sync::mpsc::Sender;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Done,
    Cancelled,
}

/// One file's status and result within a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub source: SourceFile,
    pub status: ItemStatus,
    pub result: Option<EncodedResult>,
    pub error: Option<String>,
}

impl BatchItem {
    fn pending(source: SourceFile) -> Self {
        Self {
            source,
            status: ItemStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.source.name
    }
}

/// Aggregate numbers for a finished (or cancelled) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
    /// Negative when the outputs are larger than the inputs.
    pub saved_bytes: i64,
    pub saved_percent: i64,
}

/// Progress events sent to an optional listener while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemStarted {
        index: usize,
        total: usize,
        file_name: String,
        /// `(index + 1) / total * 100`, rounded down.
        percent: u32,
    },
    ItemCompleted {
        index: usize,
        file_name: String,
        original_bytes: u64,
        compressed_bytes: u64,
        ratio_percent: i64,
    },
    ItemFailed {
        index: usize,
        file_name: String,
        error: String,
    },
    Finished {
        state: RunState,
        summary: BatchSummary,
    },
}

/// Ordered items plus running totals.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    pub items: Vec<BatchItem>,
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
    pub state: RunState,
    /// Output format the items were encoded to; drives entry names.
    pub format: OutputFormat,
}

impl BatchRun {
    /// A fresh run with every file `pending`.
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self {
            items: files.into_iter().map(BatchItem::pending).collect(),
            ..Self::default()
        }
    }

    pub fn summary(&self) -> BatchSummary {
        let count = |status: ItemStatus| self.items.iter().filter(|i| i.status == status).count();
        let saved_bytes = self.total_original_bytes as i64 - self.total_compressed_bytes as i64;
        BatchSummary {
            completed: count(ItemStatus::Completed),
            failed: count(ItemStatus::Failed),
            total_original_bytes: self.total_original_bytes,
            total_compressed_bytes: self.total_compressed_bytes,
            saved_bytes,
            saved_percent: saved_percent(self.total_original_bytes, self.total_compressed_bytes),
        }
    }

    /// Drop all items and totals and return to `idle`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Output name of every item, in item order; `None` unless it completed.
    ///
    /// Collisions are resolved in item order, so every caller sees the same
    /// names: the packaged entries and the report agree.
    pub fn entry_names(&self) -> Vec<Option<String>> {
        let mut names = EntryNames::default();
        self.items
            .iter()
            .map(|item| {
                (item.status == ItemStatus::Completed && item.result.is_some())
                    .then(|| names.claim(batch_entry_name(item.file_name(), &self.format)))
            })
            .collect()
    }

    /// Serializable view of the run, written as `report.json` by the CLI.
    pub fn report(&self) -> BatchReport {
        BatchReport {
            state: self.state,
            format: self.format.name().to_string(),
            summary: self.summary(),
            items: self
                .items
                .iter()
                .zip(self.entry_names())
                .map(|(item, output_name)| ItemReport {
                    file_name: item.file_name().to_string(),
                    status: item.status,
                    output_name,
                    original_bytes: item.source.byte_size(),
                    result: item.result.clone(),
                    error: item.error.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub state: RunState,
    pub format: String,
    pub summary: BatchSummary,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub file_name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    pub original_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EncodedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Whether `name` has an extension the decoder supports (case-insensitive).
pub fn is_supported_input(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    supported_input_extensions().contains(&ext.as_str())
}

/// Keep only files with a supported image extension, preserving order.
pub fn accept_files(files: impl IntoIterator<Item = SourceFile>) -> Vec<SourceFile> {
    files
        .into_iter()
        .filter(|file| {
            let ok = is_supported_input(&file.name);
            if !ok {
                debug!(file = %file.name, "skipping unsupported file");
            }
            ok
        })
        .collect()
}

fn emit(events: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A listener that went away must not stop the run.
        let _ = tx.send(event);
    }
}

/// Process `files` in order with the reduced batch settings.
pub fn run_batch<B: RasterBackend>(
    backend: &B,
    files: Vec<SourceFile>,
    settings: &BatchSettings,
    strategy: &ExecutionStrategy<'_, B::Surface>,
    events: Option<Sender<BatchEvent>>,
    cancel: &CancelToken,
) -> BatchRun {
    let per_file = settings.to_settings();
    let mut run = BatchRun::new(files);
    run.format = settings.format.clone();
    run.state = RunState::Running;

    let total = run.items.len();
    info!(total, format = %settings.format, "batch started");
    emit(&events, BatchEvent::Started { total });

    for index in 0..total {
        if cancel.is_cancelled() {
            run.state = RunState::Cancelled;
            break;
        }

        let item = &mut run.items[index];
        item.status = ItemStatus::Processing;
        emit(
            &events,
            BatchEvent::ItemStarted {
                index,
                total,
                file_name: item.source.name.clone(),
                percent: ((index + 1) * 100 / total) as u32,
            },
        );

        match pipeline::run(backend, &item.source, &per_file, strategy, cancel) {
            Ok(compressed) => {
                item.status = ItemStatus::Completed;
                run.total_original_bytes += compressed.original_byte_size;
                run.total_compressed_bytes += compressed.result.byte_size;
                emit(
                    &events,
                    BatchEvent::ItemCompleted {
                        index,
                        file_name: item.source.name.clone(),
                        original_bytes: compressed.original_byte_size,
                        compressed_bytes: compressed.result.byte_size,
                        ratio_percent: compressed.compression_ratio_percent,
                    },
                );
                item.result = Some(compressed.result);
            }
            Err(e) => {
                let cancelled = matches!(e, PipelineError::Cancelled);
                debug!(file = %item.source.name, error = %e, "batch item failed");
                item.status = ItemStatus::Failed;
                item.error = Some(if cancelled {
                    "cancelled".to_string()
                } else {
                    e.to_string()
                });
                emit(
                    &events,
                    BatchEvent::ItemFailed {
                        index,
                        file_name: item.source.name.clone(),
                        error: item.error.clone().unwrap_or_default(),
                    },
                );
                if cancelled {
                    run.state = RunState::Cancelled;
                    break;
                }
            }
        }
    }

    if run.state == RunState::Running {
        run.state = RunState::Done;
    }

    let summary = run.summary();
    info!(
        completed = summary.completed,
        failed = summary.failed,
        saved_percent = summary.saved_percent,
        "batch finished"
    );
    emit(
        &events,
        BatchEvent::Finished {
            state: run.state,
            summary,
        },
    );
    run
}
