//! Bounded output capture
//!
//! Child processes may write arbitrarily much. Only the tail of each
//! stream is kept for diagnostics; the total byte count is still tracked.

use feedrun_core::domain::execution::CapturedOutput;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Ring-like buffer keeping the last `limit` bytes written to it
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    data: Vec<u8>,
    limit: usize,
    total: u64,
}

impl CaptureBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            total: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.total += chunk.len() as u64;
        self.data.extend_from_slice(chunk);
        if self.data.len() > self.limit {
            let excess = self.data.len() - self.limit;
            self.data.drain(..excess);
        }
    }

    pub fn finish(self) -> CapturedOutput {
        CapturedOutput {
            text: String::from_utf8_lossy(&self.data).into_owned(),
            total_bytes: self.total,
            truncated: self.total > self.data.len() as u64,
        }
    }

    /// Drains `reader` to EOF, keeping the tail
    ///
    /// Read errors end the capture early; whatever was read is kept.
    pub async fn drain_from<R>(mut self, mut reader: R) -> CapturedOutput
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => self.push(&chunk[..n]),
            }
        }
        self.finish()
    }
}
