//! JSON Lines frames exchanged with worker processes
//!
//! One frame per line. The parent opens with a [`WorkerHello`], then sends
//! [`WorkerRequest`]s one at a time and reads a [`WorkerReply`] after each.
//! Closing the child's stdin ends the session.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::io::{self, BufRead, Write};

use super::function::WorkKind;
use super::item::WorkResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHello {
    pub kind: WorkKind,
    pub worker: usize,
    pub truncate_length: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub index: usize,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub index: usize,
    pub result: WorkResult,
}

/// Serialize one frame and flush it
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, frame)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Read one frame; `Ok(None)` on a clean end of stream
pub fn read_frame<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> io::Result<Option<T>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    serde_json::from_str(line.trim_end())
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::ExecutorTag;
    use std::io::Cursor;

    #[test]
    fn test_frames_are_single_lines() {
        let mut buffer = Vec::new();
        write_frame(
            &mut buffer,
            &WorkerRequest {
                index: 3,
                identifier: "a\nb.txt".to_string(),
            },
        )
        .unwrap();
        assert_eq!(buffer.iter().filter(|b| **b == b'\n').count(), 1);

        let mut cursor = Cursor::new(buffer);
        let request: WorkerRequest = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(request.identifier, "a\nb.txt");
        assert!(read_frame::<_, WorkerRequest>(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_reply_carries_failure() {
        let line = r#"{"index":1,"result":{"identifier":"x","payload_preview":"","size":0,"elapsed":0.5,"executor":{"kind":"process","pid":7,"worker":0},"error":"I/O error: gone"}}"#;
        let mut cursor = Cursor::new(format!("{line}\n"));
        let reply: WorkerReply = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(reply.index, 1);
        assert_eq!(reply.result.executor, ExecutorTag::Process { pid: 7, worker: 0 });
        assert_eq!(reply.result.status_code, None);
        assert!(!reply.result.is_success());
    }

    #[test]
    fn test_garbage_is_invalid_data() {
        let mut cursor = Cursor::new("not json\n");
        let err = read_frame::<_, WorkerReply>(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
