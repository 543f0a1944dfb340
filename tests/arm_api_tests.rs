//! Gateway responder behaviour exercised through the public API only.

use uir_gateway::constants::{GatewayModel, FC_MODEL, FC_SERIAL_NUMBER};
use uir_gateway::{GatewayResponder, GatewayState, UIMessage};

fn responder() -> GatewayResponder {
    GatewayResponder::new(GatewayModel::Uim2523, GatewayState::new(2, 2, 2 /* Kbps500 */, 1234512345, 0x4141, 0x4242))
}

fn request(device_id: u8, function_code: u8, need_ack: bool, data: Vec<u8>) -> UIMessage {
    UIMessage {
        device_id,
        function_code,
        need_ack,
        need_checksum: true,
        data,
        aux_byte: 0,
        checksum: 0,
        som: 0xAA,
    }
}

#[test]
fn get_model_replies_with_model_and_firmware_bytes() {
    let mut gateway = responder();
    let reply = gateway.handle_message(&request(2, FC_MODEL, true, vec![])).expect("needs ack");
    assert_eq!(reply.function_code, FC_MODEL);
    assert_eq!(reply.data[4], 0x69);
    assert_eq!(reply.data[5], 0x7a);
}

#[test]
fn get_serial_number_replies_with_packed_triple() {
    let mut gateway = responder();
    let reply =
        gateway.handle_message(&request(2, FC_SERIAL_NUMBER, true, vec![])).expect("needs ack");
    assert_eq!(reply.data, vec![0xD9, 0x29, 0x95, 0x49, 0x41, 0x41, 0x42, 0x42]);
}

#[test]
fn set_serial_number_echoes_stored_value_after_write() {
    let mut gateway = responder();
    let reply = gateway
        .handle_message(&request(2, FC_SERIAL_NUMBER, false, vec![0x01, 0x00, 0x00, 0x00]))
        .expect("write still replies");
    assert_eq!(&reply.data[0..4], &[0x01, 0x00, 0x00, 0x00]);
    assert_eq!(gateway.state.serial_number, 1);
}

#[test]
fn message_for_other_device_produces_no_reply() {
    let mut gateway = responder();
    assert!(gateway.handle_message(&request(0x55, FC_MODEL, true, vec![])).is_none());
}

#[test]
fn global_group_is_always_addressed() {
    let mut gateway = responder();
    assert!(gateway.handle_message(&request(0, FC_MODEL, true, vec![])).is_some());
}

#[test]
fn respond_to_unimplemented_function_code_fails() {
    let mut gateway = responder();
    assert!(gateway.respond_to(&request(2, 0x7f, true, vec![])).is_err());
}
