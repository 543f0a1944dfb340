//! Protocol bridge and device simulator for the UIROBOT UIM342 ecosystem.
//!
//! Translates between the 16-byte UIMessage stream frame ([`message`]) and
//! the SimpleCAN 3.0 CAN arbitration-ID encoding ([`simplecan`]), simulates
//! a gateway device's command/response state machine ([`gateway`]), and
//! bridges the two directions concurrently ([`bridge`]).

pub mod bridge;
pub mod bus;
pub mod config;
pub mod constants;
pub mod crc;
pub mod error;
pub mod gateway;
pub mod message;
pub mod simplecan;
pub mod transport;

pub use bridge::Bridge;
pub use bus::{CanBus, CanFrame};
pub use config::BridgeConfig;
pub use error::{BridgeError, FrameDecodeError, StartupError, UnsupportedOperation};
pub use gateway::{GatewayResponder, GatewayState};
pub use message::UIMessage;
pub use simplecan::SimpleCanIdentifier;
