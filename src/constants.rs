//! Shared constants for the UIMessage/SimpleCAN protocol stack.
//!
//! Mirrors the function-code, parameter-index, and enumeration layout of the
//! UIM342 manual; see the module-level docs in [`crate::message`] for the
//! wire format these constants are drawn from.

/// Command selector carried in the low 7 bits of a UIMessage control word.
///
/// Deliberately *not* the static type of [`crate::message::UIMessage`]'s
/// `function_code` field — unknown codes must be representable as they
/// traverse the bridge untouched. Use [`KnownFunctionCode::try_from`] at call
/// sites that want to match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KnownFunctionCode {
    ProtocolParameter = 0x01,
    WakeNode = 0x06,
    Model = 0x0B,
    SerialNumber = 0x0C,
    ErrorReport = 0x0F,
    SystemOperation = 0x7E,
}

impl TryFrom<u8> for KnownFunctionCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code & 0x7F {
            0x01 => Ok(Self::ProtocolParameter),
            0x06 => Ok(Self::WakeNode),
            0x0B => Ok(Self::Model),
            0x0C => Ok(Self::SerialNumber),
            0x0F => Ok(Self::ErrorReport),
            0x7E => Ok(Self::SystemOperation),
            other => Err(other),
        }
    }
}

pub const FC_PROTOCOL_PARAMETER: u8 = 0x01;
pub const FC_WAKE_NODE: u8 = 0x06;
pub const FC_MODEL: u8 = 0x0B;
pub const FC_SERIAL_NUMBER: u8 = 0x0C;
pub const FC_ERROR_REPORT: u8 = 0x0F;
pub const FC_SYSTEM_OPERATION: u8 = 0x7E;

/// Gateway device model/firmware byte pairs reported by GET MODEL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayModel {
    Uim2513,
    Uim2522,
    Uim2523,
    /// MMC901S/MMC901M/MMC902S/... family; the second byte varies by SKU
    /// and is not distinguished here.
    Mmc90x,
}

impl GatewayModel {
    /// The two model-identifier bytes placed in a GET MODEL response.
    pub const fn model_bytes(self) -> [u8; 2] {
        match self {
            Self::Uim2513 => [0x19, 0x0D],
            Self::Uim2522 => [0x19, 0x16],
            Self::Uim2523 => [0x19, 0x17],
            Self::Mmc90x => [0x5A, 0x00],
        }
    }
}

/// Reserved node IDs (<= 4) for special devices like gateways.
pub mod reserved_node_id {
    /// The "user master controller" directly driving the CAN bus.
    pub const MASTER: u8 = 4;
    pub const UIM2523: u8 = 2;
    pub const UIM2513: u8 = 3;
}

/// Reserved group IDs.
pub const GROUP_GLOBAL: u8 = 0;

/// Protocol parameter indices (first data byte of a PROTOCOL_PARAMETER
/// message).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProtocolParameter {
    Rs232Baud = 1,
    CanBitrate = 5,
    NodeId = 7,
}

impl TryFrom<u8> for ProtocolParameter {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Rs232Baud),
            5 => Ok(Self::CanBitrate),
            7 => Ok(Self::NodeId),
            other => Err(other),
        }
    }
}

/// SYSTEM_OPERATION subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemOperation {
    Reboot = 1,
    RestoreFactoryDefaults = 2,
    SyncTime = 4,
}

impl TryFrom<u8> for SystemOperation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Reboot),
            2 => Ok(Self::RestoreFactoryDefaults),
            4 => Ok(Self::SyncTime),
            other => Err(other),
        }
    }
}

/// Undocumented SYSTEM_OPERATION "Debug Mode" target, sent by
/// `SdkStartCanNet(UseConstLink=1)` with a zero-length payload.
pub const SYSTEM_OPERATION_DEBUG_MODE_DEVICE: u8 = 0xFF;

/// RS-232 baud enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Rs232Baud {
    Baud4800 = 0,
    Baud9600 = 1,
    Baud19200 = 2,
    Baud38400 = 3,
    Baud57600 = 4,
    Baud115200 = 5,
}

impl TryFrom<u8> for Rs232Baud {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Baud4800),
            1 => Ok(Self::Baud9600),
            2 => Ok(Self::Baud19200),
            3 => Ok(Self::Baud38400),
            4 => Ok(Self::Baud57600),
            5 => Ok(Self::Baud115200),
            other => Err(other),
        }
    }
}

/// CAN bitrate enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CanBitrate {
    Kbps1000 = 0,
    Kbps800 = 1,
    Kbps500 = 2,
    Kbps250 = 3,
    Kbps125 = 4,
}

impl TryFrom<u8> for CanBitrate {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Kbps1000),
            1 => Ok(Self::Kbps800),
            2 => Ok(Self::Kbps500),
            3 => Ok(Self::Kbps250),
            4 => Ok(Self::Kbps125),
            other => Err(other),
        }
    }
}
