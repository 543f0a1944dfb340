//! The narrow capability a gateway response is written through.
//!
//! The original tooling accepted anything with either a `.send()` or a
//! `.write()`/`.flush()` method (a duck-typed `SupportsSend | SupportsWrite`
//! union). Here that collapses to one trait with one method: "write these
//! bytes, report success or failure." Flushing, if the underlying transport
//! needs it, is the implementation's problem, not the caller's.

use async_trait::async_trait;

use crate::message::FRAME_LEN;

#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn write_frame(&self, frame: &[u8; FRAME_LEN]) -> std::io::Result<()>;
}

/// A [`ReplySink`] backed by the write half of a single TCP connection.
pub struct TcpReplySink {
    writer: tokio::sync::Mutex<tokio::net::tcp::OwnedWriteHalf>,
}

impl TcpReplySink {
    pub fn new(writer: tokio::net::tcp::OwnedWriteHalf) -> Self {
        Self { writer: tokio::sync::Mutex::new(writer) }
    }
}

#[async_trait]
impl ReplySink for TcpReplySink {
    async fn write_frame(&self, frame: &[u8; FRAME_LEN]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        let mut writer = self.writer.lock().await;
        writer.write_all(frame).await?;
        writer.flush().await
    }
}

/// An in-memory [`ReplySink`] used by tests to capture what the responder
/// would have sent without standing up a real socket.
#[derive(Default)]
pub struct RecordingReplySink {
    pub frames: tokio::sync::Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl ReplySink for RecordingReplySink {
    async fn write_frame(&self, frame: &[u8; FRAME_LEN]) -> std::io::Result<()> {
        self.frames.lock().await.push(frame.to_vec());
        Ok(())
    }
}
