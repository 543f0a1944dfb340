//! CAN bus abstraction.
//!
//! Real CAN driver bindings (SocketCAN, python-can, a USB-CAN adapter) are
//! out of scope for this crate — only their interface is named. A `CanBus`
//! implementation is assumed to deliver/accept frames with a 29-bit
//! arbitration ID and up to 8 data bytes; the bridge never looks past that
//! contract.

use async_trait::async_trait;

pub const MAX_CAN_DATA_LEN: usize = 8;

/// A single extended-format CAN frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub arbitration_id: u32,
    pub data: Vec<u8>,
}

impl CanFrame {
    pub fn new(arbitration_id: u32, data: Vec<u8>) -> Self {
        debug_assert!(data.len() <= MAX_CAN_DATA_LEN);
        Self { arbitration_id, data }
    }
}

/// Bus-side collaborator the bridge publishes to and receives from.
///
/// Producer (publish) is driven from the stream-ingress path; consumer
/// (recv) runs on its own task. The bus driver is assumed thread-safe, so a
/// shared `Arc<dyn CanBus>` is the expected ownership shape.
#[async_trait]
pub trait CanBus: Send + Sync {
    /// Publishes a frame onto the bus. Non-blocking from the bridge's point
    /// of view; implementations backed by a blocking driver should queue
    /// internally rather than stall the caller.
    async fn send(&self, frame: CanFrame) -> std::io::Result<()>;

    /// Awaits the next frame from the bus. Returns `Ok(None)` only when the
    /// bus has been shut down and no further frames will arrive.
    async fn recv(&self) -> std::io::Result<Option<CanFrame>>;
}

/// A bus with nothing attached: sends vanish, receives never resolve to a
/// frame. Useful for exercising the stream side of the bridge without a CAN
/// interface configured at all.
#[derive(Debug, Default)]
pub struct NullCanBus;

#[async_trait]
impl CanBus for NullCanBus {
    async fn send(&self, _frame: CanFrame) -> std::io::Result<()> {
        Ok(())
    }

    async fn recv(&self) -> std::io::Result<Option<CanFrame>> {
        std::future::pending().await
    }
}

/// An in-memory bus backed by an unbounded channel, standing in for a real
/// driver in tests and in demos run without hardware attached.
pub struct LoopbackCanBus {
    tx: tokio::sync::mpsc::UnboundedSender<CanFrame>,
    rx: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<CanFrame>>,
}

impl LoopbackCanBus {
    pub fn new() -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        Self { tx, rx: tokio::sync::Mutex::new(rx) }
    }

    /// Injects a frame as if it arrived from the wire, for tests that
    /// exercise CAN-ingress fan-out without a real bus.
    pub fn inject(&self, frame: CanFrame) {
        // An unbounded sender only fails once every receiver is dropped,
        // which can't happen while `self` is alive.
        let _ = self.tx.send(frame);
    }
}

impl Default for LoopbackCanBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CanBus for LoopbackCanBus {
    async fn send(&self, frame: CanFrame) -> std::io::Result<()> {
        self.inject(frame);
        Ok(())
    }

    async fn recv(&self) -> std::io::Result<Option<CanFrame>> {
        Ok(self.rx.lock().await.recv().await)
    }
}
