//! Wire-format tests exercised through the public API only.

use uir_gateway::crc::crc16;
use uir_gateway::message::UIMessage;
use uir_gateway::simplecan::SimpleCanIdentifier;

#[test]
fn message_round_trips_through_encode_decode() {
    let msg = UIMessage::response(0x02, 0x0b, vec![0x08, 0x19, 0x17, 0x00, 0x69, 0x7a, 0x00, 0x00]);
    let frame = msg.encode();
    let decoded = UIMessage::decode(&frame).expect("frame should decode");

    assert_eq!(decoded.device_id, msg.device_id);
    assert_eq!(decoded.function_code, msg.function_code);
    assert_eq!(decoded.data, msg.data);
}

#[test]
fn crc_changes_when_payload_changes() {
    let a = crc16(b"UIM342-A");
    let b = crc16(b"UIM342-B");
    assert_ne!(a, b);
}

#[test]
fn short_frame_is_rejected() {
    let err = UIMessage::decode(&[0xaa, 0x02]).unwrap_err();
    assert_eq!(err, uir_gateway::FrameDecodeError::ShortFrame);
}

#[test]
fn simplecan_identifier_round_trips_through_arbitration_id() {
    let id = SimpleCanIdentifier { producer_id: 4, consumer_id: 2, control_word: 0x0b };
    let packed = id.pack();
    let unpacked = SimpleCanIdentifier::unpack(packed);
    assert_eq!(unpacked, id);
}
