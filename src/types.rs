//! Shared value types passed between the pipeline, the batch orchestrator,
//! the offload worker and packaging.

use serde::Serialize;
use std::path::Path;

/// An input file: its display name and raw (still encoded) bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after its file name component.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Encoded output of one pipeline run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
}

impl EncodedResult {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, width: u32, height: u32) -> Self {
        let byte_size = bytes.len() as u64;
        Self {
            bytes,
            mime_type: mime_type.into(),
            width,
            height,
            byte_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_result_tracks_byte_size() {
        let r = EncodedResult::new(vec![1, 2, 3], "image/png", 4, 5);
        assert_eq!(r.byte_size, 3);
        assert_eq!(r.mime_type, "image/png");
    }

    #[test]
    fn source_file_read_uses_file_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.PNG");
        std::fs::write(&path, b"abc").unwrap();
        let file = SourceFile::read(&path).unwrap();
        assert_eq!(file.name, "photo.PNG");
        assert_eq!(file.byte_size(), 3);
    }

    #[test]
    fn encoded_result_json_omits_bytes() {
        let r = EncodedResult::new(vec![0; 10], "image/webp", 2, 2);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("bytes").is_none());
        assert_eq!(json["byte_size"], 10);
    }
}
