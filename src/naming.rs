//! Output file naming.
//!
//! | Artifact | Pattern | Example |
//! |---|---|---|
//! | Single-image download | `<stem>-<format>.<ext>` | `photo.PNG` + jpeg → `photo-jpeg.jpg` |
//! | Batch entry | `<stem>.<ext>` | `photo.PNG` + webp → `photo.webp` |
//! | Colliding batch entry | `<stem>-<n>.<ext>` | `photo.jpg` after `photo.PNG` → `photo-2.webp` |
//! | Batch archive | `compressed-images-<timestamp_ms>.zip` | |
//!
//! The stem is the file name with only its **last** extension removed, so
//! `archive.tar.png` keeps `archive.tar`. Hidden files like `.profile` have
//! no extension to strip.

use crate::settings::OutputFormat;
use std::collections::HashSet;

/// File extension for an output format. `jpeg` is shortened to `jpg`.
pub fn canonical_extension(format: &OutputFormat) -> &str {
    match format {
        OutputFormat::Jpeg => "jpg",
        OutputFormat::Png => "png",
        OutputFormat::Webp => "webp",
        OutputFormat::Avif => "avif",
        // Unrecognized formats are encoded as JPEG.
        OutputFormat::Unrecognized(_) => "jpg",
    }
}

/// Name of the format as it appears in single-image download names.
fn format_label(format: &OutputFormat) -> &str {
    match format {
        OutputFormat::Unrecognized(_) => "jpeg",
        known => known.name(),
    }
}

/// Split `name` at its last dot; `None` when there is no extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(pos) => (&name[..pos], Some(&name[pos + 1..])),
    }
}

/// The file name without its last extension.
pub fn file_stem(name: &str) -> &str {
    split_extension(name).0
}

pub fn single_download_name(source: &str, format: &OutputFormat) -> String {
    format!(
        "{}-{}.{}",
        file_stem(source),
        format_label(format),
        canonical_extension(format)
    )
}

/// Source name with its extension replaced; appended when there is none.
pub fn batch_entry_name(source: &str, format: &OutputFormat) -> String {
    format!("{}.{}", file_stem(source), canonical_extension(format))
}

/// Hands out batch entry names, suffixing the stem on collision.
///
/// Names are unique in claim order: the first `a.webp` keeps its name, the
/// next becomes `a-2.webp`, then `a-3.webp`.
#[derive(Debug, Default)]
pub struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    pub fn claim(&mut self, name: String) -> String {
        if self.used.insert(name.clone()) {
            return name;
        }
        let stem = file_stem(&name).to_string();
        let ext = &name[stem.len()..];
        let mut n = 2;
        loop {
            let candidate = format!("{stem}-{n}{ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

pub fn archive_name(timestamp_ms: u128) -> String {
    format!("compressed-images-{timestamp_ms}.zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_download_name_uses_format_and_canonical_ext() {
        assert_eq!(
            single_download_name("photo.PNG", &OutputFormat::Jpeg),
            "photo-jpeg.jpg"
        );
        assert_eq!(
            single_download_name("photo.jpg", &OutputFormat::Webp),
            "photo-webp.webp"
        );
    }

    #[test]
    fn batch_entry_replaces_extension() {
        assert_eq!(batch_entry_name("IMG_0001.JPG", &OutputFormat::Avif), "IMG_0001.avif");
        assert_eq!(batch_entry_name("scan.tiff", &OutputFormat::Jpeg), "scan.jpg");
    }

    #[test]
    fn only_last_extension_is_stripped() {
        assert_eq!(file_stem("archive.tar.png"), "archive.tar");
        assert_eq!(batch_entry_name("a.b.c.png", &OutputFormat::Png), "a.b.c.png");
    }

    #[test]
    fn name_without_extension_gets_one_appended() {
        assert_eq!(batch_entry_name("README", &OutputFormat::Webp), "README.webp");
        assert_eq!(batch_entry_name(".hidden", &OutputFormat::Png), ".hidden.png");
    }

    #[test]
    fn unrecognized_format_named_as_jpeg() {
        let heic = OutputFormat::parse("heic");
        assert_eq!(canonical_extension(&heic), "jpg");
        assert_eq!(single_download_name("x.png", &heic), "x-jpeg.jpg");
    }

    #[test]
    fn entry_names_suffix_collisions_in_claim_order() {
        let mut names = EntryNames::default();
        let claimed: Vec<String> = ["a.webp", "b.webp", "a.webp", "a.webp", "a-2.webp"]
            .into_iter()
            .map(|n| names.claim(n.to_string()))
            .collect();
        assert_eq!(claimed, vec!["a.webp", "b.webp", "a-2.webp", "a-3.webp", "a-2-2.webp"]);
    }

    #[test]
    fn entry_name_without_extension_suffixes_whole_name() {
        let mut names = EntryNames::default();
        names.claim("README".to_string());
        assert_eq!(names.claim("README".to_string()), "README-2");
    }

    #[test]
    fn archive_name_embeds_timestamp() {
        assert_eq!(archive_name(1700000000123), "compressed-images-1700000000123.zip");
    }
}
