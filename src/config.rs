//! Process-level configuration for the bridge binary.
//!
//! Deliberately thin: argument parsing and config-file loading are
//! non-goals of this crate. `BridgeConfig::from_env` reads the handful of
//! `UIR_*` environment variables the bridge needs and fails fast with a
//! clear message when the CAN interface is unset, mirroring the original
//! Python tooling's `CAN_INTERFACE` check.

use std::net::SocketAddr;

use crate::constants::GatewayModel;
use crate::error::StartupError;

pub const DEFAULT_TCP_PORT: u16 = 8888;
pub const DEFAULT_SERIAL_NUMBER: u32 = 1234512345;
pub const DEFAULT_MANUFACTURER_ID: u16 = 0x4141;
pub const DEFAULT_VENDOR_ID: u16 = 0x4242;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub tcp_addr: SocketAddr,
    pub node_id: u8,
    pub group_id: u8,
    pub can_bitrate: u8,
    pub serial_number: u32,
    pub manufacturer_id: u16,
    pub vendor_id: u16,
    pub model: GatewayModel,
    /// Name of the CAN interface to open, as consumed by the (out-of-scope)
    /// CAN driver binding. `None` means "run without a CAN bus attached".
    pub can_interface: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tcp_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_TCP_PORT)),
            node_id: crate::constants::reserved_node_id::UIM2523,
            group_id: crate::constants::reserved_node_id::UIM2523,
            can_bitrate: 2, // CANBitrate::Kbps500
            serial_number: DEFAULT_SERIAL_NUMBER,
            manufacturer_id: DEFAULT_MANUFACTURER_ID,
            vendor_id: DEFAULT_VENDOR_ID,
            model: GatewayModel::Uim2523,
            can_interface: None,
        }
    }
}

impl BridgeConfig {
    /// Reads configuration from `UIR_*` environment variables, falling back
    /// to [`BridgeConfig::default`] for anything unset.
    ///
    /// Returns [`StartupError::CanInterfaceNotConfigured`] if
    /// `UIR_CAN_INTERFACE` is unset and `require_can` is true — set this
    /// when the caller intends to run against a real bus rather than a
    /// [`crate::bus::NullCanBus`] or [`crate::bus::LoopbackCanBus`].
    pub fn from_env(require_can: bool) -> Result<Self, StartupError> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("UIR_TCP_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.tcp_addr.set_port(port);
            }
        }
        if let Ok(node_id) = std::env::var("UIR_NODE_ID") {
            if let Ok(node_id) = node_id.parse::<u8>() {
                config.node_id = node_id;
                config.group_id = node_id;
            }
        }
        if let Ok(group_id) = std::env::var("UIR_GROUP_ID") {
            if let Ok(group_id) = group_id.parse::<u8>() {
                config.group_id = group_id;
            }
        }
        if let Ok(bitrate) = std::env::var("UIR_CAN_BITRATE") {
            if let Ok(bitrate) = bitrate.parse::<u8>() {
                config.can_bitrate = bitrate;
            }
        }

        config.can_interface = std::env::var("UIR_CAN_INTERFACE").ok();
        if require_can && config.can_interface.is_none() {
            return Err(StartupError::CanInterfaceNotConfigured);
        }

        Ok(config)
    }
}
