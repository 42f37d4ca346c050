use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::function::{WorkFunction, WorkKind};
use super::item::WorkOutput;
use crate::error::WorkError;

/// Reads a whole file as text
///
/// Invalid UTF-8 is replaced rather than rejected, so binary files still
/// produce a result. `size` is the on-disk length, not the decoded length.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader;

impl FileReader {
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: Vec<u8>) -> String {
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

#[async_trait]
impl WorkFunction for FileReader {
    fn name(&self) -> &'static str {
        "read_file"
    }

    async fn call(&self, identifier: &str) -> Result<WorkOutput, WorkError> {
        let bytes = tokio::fs::read(identifier).await?;
        let size = tokio::fs::metadata(identifier).await?.len();
        Ok(WorkOutput::new(Self::decode(bytes), size))
    }

    fn call_blocking(&self, identifier: &str, _timeout: Duration) -> Result<WorkOutput, WorkError> {
        // Local reads cannot be interrupted; the harness enforces the deadline
        let bytes = std::fs::read(identifier)?;
        let size = std::fs::metadata(identifier)?.len();
        Ok(WorkOutput::new(Self::decode(bytes), size))
    }

    fn estimate_cost(&self, identifier: &str) -> Option<u64> {
        std::fs::metadata(Path::new(identifier)).ok().map(|m| m.len())
    }

    fn wire_kind(&self) -> Option<WorkKind> {
        Some(WorkKind::ReadFile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_async_and_blocking_reads_agree() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sample_000.txt");
        fs::write(&path, "Sample File 0\nFile number: 0\n").unwrap();
        let id = path.to_string_lossy().to_string();

        let reader = FileReader::new();
        let async_output = reader.call(&id).await.unwrap();
        let blocking_output = reader.call_blocking(&id, Duration::from_secs(10)).unwrap();

        assert_eq!(async_output, blocking_output);
        assert_eq!(async_output.size, 29);
        assert!(async_output.payload.starts_with("Sample File 0"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.bin");
        fs::write(&path, [b'o', b'k', 0xff, 0xfe]).unwrap();

        let output = FileReader::new()
            .call_blocking(&path.to_string_lossy(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(output.size, 4);
        assert!(output.payload.starts_with("ok"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FileReader::new()
            .call_blocking("/definitely/not/here.txt", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, WorkError::Io(_)));
    }

    #[test]
    fn test_cost_is_file_length() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big.txt");
        fs::write(&path, vec![b'x'; 9999]).unwrap();

        let reader = FileReader::new();
        assert_eq!(reader.estimate_cost(&path.to_string_lossy()), Some(9999));
        assert_eq!(reader.estimate_cost("/nope"), None);
    }
}
