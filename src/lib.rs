//! # rasterpress
//!
//! Rotate, resize and re-encode raster images, one at a time or in batches.
//!
//! # Architecture: One Pipeline, Two Drivers
//!
//! Every conversion goes through the same single-item pipeline:
//!
//! ```text
//! bytes ─→ decode ─→ rotate ─→ resize ─→ encode ─→ EncodedResult + metrics
//!                    └──── transform ────┘
//! ```
//!
//! Single-image mode calls it once with the full [`Settings`](settings::Settings).
//! Batch mode calls it once per file, strictly in order, with the reduced
//! [`BatchSettings`](settings::BatchSettings), isolating failures per file and
//! aggregating totals.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`settings`] | Immutable settings snapshot: rotation, resize, per-format encoder options |
//! | [`imaging`] | Raster backend trait, `image`-crate backend, transform and encoder stages |
//! | [`pipeline`] | Single-item pipeline, execution strategy, cancellation token |
//! | [`worker`] | Offload worker thread running the same transform + encode code |
//! | [`batch`] | Sequential batch orchestrator, per-item state, progress events |
//! | [`packaging`] | ZIP archive or staggered individual downloads of batch results |
//! | [`naming`] | Output file names |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Source files and encoded results shared between modules |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Settings Are Values
//!
//! The pipeline takes a `&Settings` and never mutates it. Whatever builds the
//! settings (CLI flags, `config.toml`) produces a fresh snapshot per run, so
//! nothing leaks from one conversion into the next.
//!
//! ## Rotate, Then Resize
//!
//! Resize targets refer to the rotated image. A 800×600 photo rotated 90° and
//! resized to width 300 comes out 300×400.
//!
//! ## Worker Placement Is Not Behaviour
//!
//! [`ExecutionStrategy`](pipeline::ExecutionStrategy) only decides which thread
//! runs transform + encode. Both strategies call
//! [`process_surface`](pipeline::process_surface), so outputs are identical.
//!
//! ## Sequential Batches
//!
//! Batch files are never processed in parallel. Memory stays bounded to one
//! decoded image and progress reads as "file N of M".

pub mod batch;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod packaging;
pub mod pipeline;
pub mod settings;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;
