//! The 16-byte UIMessage frame used over stream transports (TCP/USB/RS-232).
//!
//! ```text
//! offset  size  field
//! 0       1     start-of-message: 0xAA (checksummed) / 0xAD (unchecksummed) / 0xAC (accepted on input)
//! 1       1     device_id
//! 2       1     control word: (need_ack << 7) | (function_code & 0x7F)
//! 3       1     data_length (0..=8)
//! 4       8     data, right-padded
//! 12      1     aux_byte
//! 13      2     CRC-16 over bytes 1..=12, little-endian
//! 15      1     end-of-message: 0xCC
//! ```

use crate::crc::crc16;

pub const FRAME_LEN: usize = 16;
pub const MAX_DATA_LEN: usize = 8;

const SOM_CHECKSUMMED: u8 = 0xAA;
const SOM_UNCHECKSUMMED: u8 = 0xAD;
const SOM_ACCEPTED_UNKNOWN: u8 = 0xAC;
const EOM: u8 = 0xCC;

/// A decoded/to-be-encoded UIMessage frame.
///
/// `function_code` is kept as a raw 7-bit integer rather than a closed enum:
/// unknown codes must be able to cross the bridge untouched. See
/// [`crate::constants::KnownFunctionCode`] for an opt-in classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UIMessage {
    pub device_id: u8,
    pub function_code: u8,
    pub need_ack: bool,
    pub need_checksum: bool,
    pub data: Vec<u8>,
    pub aux_byte: u8,
    pub checksum: u16,
    /// The start-of-message byte this value was decoded from, or that it
    /// will be encoded with. Only `0xAA`/`0xAD` are ever produced by
    /// [`UIMessage::encode`]; `0xAC` survives a decode/encode round-trip
    /// only when explicitly preserved by the caller, since its semantics are
    /// unspecified (see the design notes on SOM `0xAC`).
    pub som: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame shorter than {min} bytes", min = FRAME_LEN)]
    ShortFrame,
    #[error("invalid start-of-message byte {0:#04x}")]
    BadSom(u8),
    #[error("invalid end-of-message byte {0:#04x}")]
    BadEom(u8),
    #[error("data_length {0} exceeds {max}", max = MAX_DATA_LEN)]
    BadLength(u8),
    #[error("checksum mismatch: frame says {frame:#06x}, computed {computed:#06x}")]
    BadChecksum { frame: u16, computed: u16 },
}

impl UIMessage {
    /// Builds a message with `need_checksum = true`, `aux_byte = 0`, and an
    /// as-yet-uncomputed checksum — the shape every gateway response uses.
    pub fn response(device_id: u8, function_code: u8, data: Vec<u8>) -> Self {
        Self {
            device_id,
            function_code,
            need_ack: false,
            need_checksum: true,
            data,
            aux_byte: 0,
            checksum: 0,
            som: SOM_CHECKSUMMED,
        }
    }

    /// Encodes this message to its fixed 16-byte wire representation.
    ///
    /// Never fails: `data` longer than [`MAX_DATA_LEN`] is truncated rather
    /// than rejected, since encode is infallible by contract (callers that
    /// need validation should check `data.len()` themselves).
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        let som = if self.need_checksum { SOM_CHECKSUMMED } else { SOM_UNCHECKSUMMED };
        let data_len = self.data.len().min(MAX_DATA_LEN);

        frame[0] = som;
        frame[1] = self.device_id;
        frame[2] = ((self.need_ack as u8) << 7) | (self.function_code & 0x7F);
        frame[3] = data_len as u8;
        frame[4..4 + data_len].copy_from_slice(&self.data[..data_len]);
        frame[12] = self.aux_byte;
        frame[15] = EOM;

        let checksum = if self.need_checksum { crc16(&frame[1..13]) } else { 0 };
        frame[13..15].copy_from_slice(&checksum.to_le_bytes());

        frame
    }

    /// Decodes a 16-byte wire frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < FRAME_LEN {
            return Err(DecodeError::ShortFrame);
        }

        let som = bytes[0];
        if !matches!(som, SOM_CHECKSUMMED | SOM_ACCEPTED_UNKNOWN | SOM_UNCHECKSUMMED) {
            return Err(DecodeError::BadSom(som));
        }
        if bytes[15] != EOM {
            return Err(DecodeError::BadEom(bytes[15]));
        }

        let data_length = bytes[3];
        if data_length as usize > MAX_DATA_LEN {
            return Err(DecodeError::BadLength(data_length));
        }

        let control_word = bytes[2];
        let need_ack = control_word & 0x80 != 0;
        let function_code = control_word & 0x7F;
        let data = bytes[4..4 + data_length as usize].to_vec();
        let aux_byte = bytes[12];
        let checksum = u16::from_le_bytes([bytes[13], bytes[14]]);

        // 0xAC is "accepted on input" with unknown semantics; best inference
        // per the design notes is to treat it like a checksummed frame.
        let need_checksum = som != SOM_UNCHECKSUMMED;

        if need_checksum {
            let computed = crc16(&bytes[1..13]);
            if computed != checksum {
                return Err(DecodeError::BadChecksum { frame: checksum, computed });
            }
        }

        Ok(Self {
            device_id: bytes[1],
            function_code,
            need_ack,
            need_checksum,
            data,
            aux_byte,
            checksum,
            som,
        })
    }
}
