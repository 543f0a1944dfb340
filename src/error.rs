//! Error types for the bridge and its ambient plumbing.
//!
//! Per the error-handling design, decode/checksum/function-code faults never
//! escape to the peer or tear down the bridge — they are logged and the
//! offending frame or connection is dropped locally. Only [`StartupError`]
//! is meant to reach `main` and cause a nonzero exit.

pub use crate::message::DecodeError as FrameDecodeError;

/// Fatal errors that prevent the bridge from starting at all.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind TCP listener on {addr}: {source}")]
    Bind { addr: std::net::SocketAddr, #[source] source: std::io::Error },

    #[error("CAN interface not configured: set UIR_CAN_INTERFACE (see python-can docs)")]
    CanInterfaceNotConfigured,
}

/// Non-fatal faults raised while the bridge is running. These are always
/// handled at the point they're produced (logged, frame/connection
/// dropped); the type exists so call sites can express "this path failed"
/// without resorting to `()`.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("CAN publish error: {0}")]
    CanPublish(String),
}

/// Raised only at the API boundary where a caller explicitly requests a
/// reply to a function code the simulator does not implement. The
/// transport-layer dispatcher in [`crate::gateway`] never raises this —
/// unrecognized function codes are silently ignored there.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("function code {0:#04x} is not implemented by the simulator")]
pub struct UnsupportedOperation(pub u8);
