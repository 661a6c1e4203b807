//! CLI output formatting.
//!
//! Every public `format_*` function is pure: it takes data and returns the
//! lines to print, so the wording is unit tested without capturing stdout.
//! The `print_*` wrappers just write those lines.
//!
//! ## Single image
//!
//! ```text
//! photo.png → photo-webp.webp
//!     1920x1080 image/webp
//!     2.41 MB → 312.55 KB (87% smaller)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Converting 3 files
//!     [ 33%] 1/3 a.png
//!         512 KB → 88.1 KB (83%)
//!     [ 67%] 2/3 b.jpg
//!         failed: Failed to decode image: ...
//! Done: 2 completed, 1 failed
//!     Saved 1.2 MB of 1.5 MB (80%)
//! ```

use crate::batch::{BatchEvent, BatchSummary, RunState};
use crate::pipeline::Compressed;

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size with base 1024 and at most two decimals.
///
/// Trailing zeros are dropped (`1.5 KB`, `2 MB`); zero is `0 Bytes`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

fn format_ratio(ratio: i64) -> String {
    if ratio >= 0 {
        format!("{ratio}% smaller")
    } else {
        format!("{}% larger", -ratio)
    }
}

/// Lines for a finished single-image conversion.
pub fn format_single_result(source_name: &str, output_name: &str, out: &Compressed) -> Vec<String> {
    vec![
        format!("{} → {}", source_name, output_name),
        format!(
            "    {}x{} {}",
            out.result.width, out.result.height, out.result.mime_type
        ),
        format!(
            "    {} → {} ({})",
            format_file_size(out.original_byte_size),
            format_file_size(out.result.byte_size),
            format_ratio(out.compression_ratio_percent)
        ),
    ]
}

pub fn print_single_result(source_name: &str, output_name: &str, out: &Compressed) {
    for line in format_single_result(source_name, output_name, out) {
        println!("{}", line);
    }
}

fn format_summary(state: RunState, summary: &BatchSummary) -> Vec<String> {
    let label = match state {
        RunState::Cancelled => "Cancelled",
        _ => "Done",
    };
    let mut lines = vec![format!(
        "{}: {} completed, {} failed",
        label, summary.completed, summary.failed
    )];
    if summary.completed > 0 {
        let saved = if summary.saved_bytes >= 0 {
            format!(
                "    Saved {} of {} ({}%)",
                format_file_size(summary.saved_bytes as u64),
                format_file_size(summary.total_original_bytes),
                summary.saved_percent
            )
        } else {
            format!(
                "    Grew by {} over {} ({}%)",
                format_file_size(summary.saved_bytes.unsigned_abs()),
                format_file_size(summary.total_original_bytes),
                -summary.saved_percent
            )
        };
        lines.push(saved);
    }
    lines
}

/// Lines for one batch progress event.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "file" } else { "files" };
            vec![format!("Converting {} {}", total, noun)]
        }
        BatchEvent::ItemStarted {
            index,
            total,
            file_name,
            percent,
        } => vec![format!(
            "    [{:>3}%] {}/{} {}",
            percent,
            index + 1,
            total,
            file_name
        )],
        BatchEvent::ItemCompleted {
            original_bytes,
            compressed_bytes,
            ratio_percent,
            ..
        } => vec![format!(
            "        {} → {} ({}%)",
            format_file_size(*original_bytes),
            format_file_size(*compressed_bytes),
            ratio_percent
        )],
        BatchEvent::ItemFailed { error, .. } => vec![format!("        failed: {}", error)],
        BatchEvent::Finished { state, summary } => format_summary(*state, summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EncodedResult;

    #[test]
    fn file_size_zero() {
        assert_eq!(format_file_size(0), "0 Bytes");
    }

    #[test]
    fn file_size_bytes() {
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
    }

    #[test]
    fn file_size_kilobytes() {
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1500), "1.46 KB");
    }

    #[test]
    fn file_size_megabytes_and_up() {
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        // Capped at GB.
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    fn compressed(original: u64, size: usize, ratio: i64) -> Compressed {
        Compressed {
            result: EncodedResult::new(vec![0; size], "image/webp", 640, 480),
            original_byte_size: original,
            compression_ratio_percent: ratio,
        }
    }

    #[test]
    fn single_result_lines() {
        let lines = format_single_result("photo.png", "photo-webp.webp", &compressed(2048, 512, 75));
        assert_eq!(
            lines,
            vec![
                "photo.png → photo-webp.webp",
                "    640x480 image/webp",
                "    2 KB → 512 Bytes (75% smaller)",
            ]
        );
    }

    #[test]
    fn single_result_that_grew() {
        let lines = format_single_result("a.png", "a-png.png", &compressed(100, 150, -50));
        assert_eq!(lines[2], "    100 Bytes → 150 Bytes (50% larger)");
    }

    #[test]
    fn batch_started_pluralises() {
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 1 }),
            vec!["Converting 1 file"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 3 }),
            vec!["Converting 3 files"]
        );
    }

    #[test]
    fn batch_item_started_shows_progress() {
        let event = BatchEvent::ItemStarted {
            index: 0,
            total: 3,
            file_name: "a.png".into(),
            percent: 33,
        };
        assert_eq!(format_batch_event(&event), vec!["    [ 33%] 1/3 a.png"]);
    }

    #[test]
    fn batch_item_failed_shows_error() {
        let event = BatchEvent::ItemFailed {
            index: 1,
            file_name: "b.jpg".into(),
            error: "Failed to decode image: bad".into(),
        };
        assert_eq!(
            format_batch_event(&event),
            vec!["        failed: Failed to decode image: bad"]
        );
    }

    #[test]
    fn batch_finished_summary() {
        let summary = BatchSummary {
            completed: 2,
            failed: 1,
            total_original_bytes: 4096,
            total_compressed_bytes: 1024,
            saved_bytes: 3072,
            saved_percent: 75,
        };
        let lines = format_batch_event(&BatchEvent::Finished {
            state: RunState::Done,
            summary,
        });
        assert_eq!(
            lines,
            vec!["Done: 2 completed, 1 failed", "    Saved 3 KB of 4 KB (75%)"]
        );
    }

    #[test]
    fn batch_finished_all_failed_has_no_savings_line() {
        let summary = BatchSummary {
            failed: 2,
            ..BatchSummary::default()
        };
        let lines = format_batch_event(&BatchEvent::Finished {
            state: RunState::Cancelled,
            summary,
        });
        assert_eq!(lines, vec!["Cancelled: 0 completed, 2 failed"]);
    }
}
