//! The simulated gateway device (UIM2523/2513/2522): a stateful responder
//! for MODEL, SERIAL_NUMBER, PROTOCOL_PARAMETER, SYSTEM_OPERATION, and the
//! accepted-but-silent WAKE_NODE/ERROR_REPORT codes.
//!
//! `handle_message` is the transport-layer dispatch entry point and never
//! fails: unsupported function codes and parameter indices are logged and
//! ignored, matching the "the core never propagates errors across the
//! bridge boundary" error policy. [`GatewayResponder::respond_to`] is the
//! stricter API-boundary variant that does fail, for callers that want to
//! assert a function code is actually implemented.

use tracing::{debug, info};

use crate::constants::{
    self, reserved_node_id, GatewayModel, KnownFunctionCode, ProtocolParameter, Rs232Baud,
    SystemOperation, FC_MODEL, FC_PROTOCOL_PARAMETER, FC_SERIAL_NUMBER,
};
use crate::error::UnsupportedOperation;
use crate::message::UIMessage;

/// Mutable per-device state. Persists for the process lifetime; mutated
/// only by incoming PROTOCOL_PARAMETER or SERIAL_NUMBER write commands.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub node_id: u8,
    pub group_id: u8,
    pub can_bitrate: u8,
    pub rs232_baud: u8,
    pub serial_number: u32,
    pub manufacturer_id: u16,
    pub vendor_id: u16,
}

impl GatewayState {
    pub fn new(
        node_id: u8,
        group_id: u8,
        can_bitrate: u8,
        serial_number: u32,
        manufacturer_id: u16,
        vendor_id: u16,
    ) -> Self {
        Self {
            node_id,
            group_id,
            can_bitrate,
            rs232_baud: Rs232Baud::Baud9600 as u8,
            serial_number,
            manufacturer_id,
            vendor_id,
        }
    }
}

pub struct GatewayResponder {
    pub state: GatewayState,
    pub model: GatewayModel,
}

impl GatewayResponder {
    pub fn new(model: GatewayModel, state: GatewayState) -> Self {
        Self { model, state }
    }

    /// `true` iff `device_id` names this responder: the global group, its
    /// own node ID, or its group ID.
    fn addressed_to_us(&self, device_id: u8) -> bool {
        device_id == constants::GROUP_GLOBAL
            || device_id == self.state.node_id
            || device_id == self.state.group_id
    }

    /// Transport-layer dispatch: processes one incoming message and returns
    /// the (at most one) reply to write back to the same sender. Never
    /// fails — unrecognized function codes, parameter indices, and
    /// not-addressed-to-us messages all silently produce `None`.
    pub fn handle_message(&mut self, msg: &UIMessage) -> Option<UIMessage> {
        if !self.addressed_to_us(msg.device_id) {
            return None;
        }

        match msg.function_code {
            FC_MODEL => self.handle_model(msg),
            FC_SERIAL_NUMBER => self.handle_serial_number(msg),
            FC_PROTOCOL_PARAMETER => self.handle_protocol_parameter(msg),
            constants::FC_SYSTEM_OPERATION => {
                self.handle_system_operation(msg);
                None
            }
            constants::FC_WAKE_NODE => {
                debug!(device_id = msg.device_id, data = ?msg.data, "WAKE_NODE received");
                None
            }
            constants::FC_ERROR_REPORT => {
                debug!(device_id = msg.device_id, data = ?msg.data, "ERROR_REPORT received");
                None
            }
            other => {
                debug!(function_code = format!("{other:#04x}"), "unhandled function code, ignoring");
                None
            }
        }
    }

    /// API-boundary variant: fails with [`UnsupportedOperation`] if the
    /// requested function code isn't one the simulator implements a reply
    /// for, rather than silently returning `None`.
    pub fn respond_to(&mut self, msg: &UIMessage) -> Result<Option<UIMessage>, UnsupportedOperation> {
        match KnownFunctionCode::try_from(msg.function_code) {
            Ok(_) => Ok(self.handle_message(msg)),
            Err(code) => Err(UnsupportedOperation(code)),
        }
    }

    fn handle_model(&mut self, msg: &UIMessage) -> Option<UIMessage> {
        if !msg.need_ack {
            return None;
        }
        info!(device_id = self.state.node_id, "responding to GET MODEL");

        let [model_hi, model_lo] = self.model.model_bytes();
        let data = vec![model_hi, model_lo, 0x00, 0x00, 0x69, 0x7A, 0x00, 0x00];
        Some(UIMessage::response(self.state.node_id, FC_MODEL, data))
    }

    fn handle_serial_number(&mut self, msg: &UIMessage) -> Option<UIMessage> {
        if !msg.need_ack {
            // A write of a new serial number: 4 raw bytes, no manufacturer/
            // vendor. Still replies with the (now updated) stored tuple —
            // see the open-question resolution in DESIGN.md.
            if msg.data.len() == 4 {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&msg.data);
                self.state.serial_number = u32::from_le_bytes(raw);
                info!(serial_number = self.state.serial_number, "set serial number");
            } else {
                return None;
            }
        }
        Some(self.serial_number_reply())
    }

    fn serial_number_reply(&self) -> UIMessage {
        let mut data = Vec::with_capacity(8);
        data.extend_from_slice(&self.state.serial_number.to_le_bytes());
        data.extend_from_slice(&self.state.manufacturer_id.to_le_bytes());
        data.extend_from_slice(&self.state.vendor_id.to_le_bytes());
        UIMessage::response(self.state.node_id, FC_SERIAL_NUMBER, data)
    }

    fn handle_protocol_parameter(&mut self, msg: &UIMessage) -> Option<UIMessage> {
        let param_byte = *msg.data.first()?;
        let param = ProtocolParameter::try_from(param_byte).ok()?;

        match param {
            ProtocolParameter::CanBitrate => match msg.data.len() {
                1 => Some(self.protocol_parameter_reply(param_byte, self.state.can_bitrate)),
                2 => {
                    self.state.can_bitrate = msg.data[1];
                    info!(bitrate = self.state.can_bitrate, "set CAN bitrate");
                    Some(self.protocol_parameter_reply(param_byte, self.state.can_bitrate))
                }
                _ => None,
            },
            ProtocolParameter::Rs232Baud => match msg.data.len() {
                1 => Some(self.protocol_parameter_reply(param_byte, self.state.rs232_baud)),
                2 => {
                    self.state.rs232_baud = msg.data[1];
                    Some(self.protocol_parameter_reply(param_byte, self.state.rs232_baud))
                }
                _ => None,
            },
            ProtocolParameter::NodeId => match msg.data.len() {
                1 => Some(self.protocol_parameter_reply(param_byte, self.state.node_id)),
                2 => {
                    self.state.node_id = msg.data[1];
                    Some(self.protocol_parameter_reply(param_byte, self.state.node_id))
                }
                _ => None,
            },
        }
    }

    fn protocol_parameter_reply(&self, param: u8, value: u8) -> UIMessage {
        UIMessage::response(self.state.node_id, FC_PROTOCOL_PARAMETER, vec![param, value])
    }

    fn handle_system_operation(&mut self, msg: &UIMessage) {
        if msg.device_id == constants::SYSTEM_OPERATION_DEBUG_MODE_DEVICE && msg.data.is_empty() {
            debug!("SYSTEM_OPERATION debug-mode probe received, ignoring");
            return;
        }

        let Some(&sub) = msg.data.first() else {
            debug!("SYSTEM_OPERATION with no subcommand byte, ignoring");
            return;
        };

        match SystemOperation::try_from(sub) {
            Ok(SystemOperation::Reboot) => info!("SYSTEM_OPERATION: reboot (no-op in simulator)"),
            Ok(SystemOperation::RestoreFactoryDefaults) => {
                info!("SYSTEM_OPERATION: restore factory defaults (no-op in simulator)")
            }
            Ok(SystemOperation::SyncTime) => info!("SYSTEM_OPERATION: sync time (no-op in simulator)"),
            Err(other) => debug!(subcommand = other, "unrecognized SYSTEM_OPERATION subcommand"),
        }
    }
}

/// Gateway node/group IDs reserved by the manual; re-exported here for
/// callers that construct a responder without going through
/// [`crate::config::BridgeConfig`].
pub use reserved_node_id::{MASTER, UIM2513, UIM2523};
