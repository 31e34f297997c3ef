//! Stream Frame codec.
//!
//! Wire layout (48 bytes): `sync[0..2) | fn[2..4) | lich[4..8) | payload[8..24)
//! | pad[24..46) | crc[46..48)`. The frame-number word is big-endian with bit
//! 15 as the `is_last` flag and the low 15 bits as `sequence`. A LICH
//! fragment occupies bytes 4..8 only while `sequence < 6`; other sequences
//! leave that region reserved. `sequence` wraps at `0x7FFF -> 0`; this codec
//! does not special-case the wrap, since nothing above the codec layer
//! assumes monotonicity across a single transmission.

use crate::constants::{
    FN_LAST_FLAG, FN_SEQUENCE_MASK, FRAME_LENGTH_BYTES, LICH_CARRYING_SEQUENCE_LIMIT,
    MAX_SEQUENCE, MIN_FRAME_LENGTH_BYTES, STREAM_LICH_LENGTH_BYTES, STREAM_PAYLOAD_LENGTH_BYTES,
    SYNC_STREAM,
};
use crate::error::{DecodeError, EncodeError};
use crate::m17::crc;

/// A decoded Stream Frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub sequence: u16,
    pub is_last: bool,
    pub lich_fragment: Option<[u8; STREAM_LICH_LENGTH_BYTES]>,
    pub payload: [u8; STREAM_PAYLOAD_LENGTH_BYTES],
}

/// Decodes a 48-byte Stream Frame.
pub fn decode(bytes: &[u8]) -> Result<StreamFrame, DecodeError> {
    if bytes.len() < MIN_FRAME_LENGTH_BYTES || bytes.len() > FRAME_LENGTH_BYTES {
        return Err(DecodeError::Length {
            expected: FRAME_LENGTH_BYTES,
            actual: bytes.len(),
        });
    }

    if bytes[0..2] != SYNC_STREAM {
        return Err(DecodeError::Sync([bytes[0], bytes[1]]));
    }

    if !crc::verify(bytes)? {
        return Err(DecodeError::Crc);
    }

    let fn_word = u16::from_be_bytes([bytes[2], bytes[3]]);
    let is_last = fn_word & FN_LAST_FLAG != 0;
    let sequence = fn_word & FN_SEQUENCE_MASK;

    let lich_fragment = if sequence < LICH_CARRYING_SEQUENCE_LIMIT {
        let mut fragment = [0u8; STREAM_LICH_LENGTH_BYTES];
        fragment.copy_from_slice(&bytes[4..4 + STREAM_LICH_LENGTH_BYTES]);
        Some(fragment)
    } else {
        None
    };

    let payload_start = 4 + STREAM_LICH_LENGTH_BYTES;
    let mut payload = [0u8; STREAM_PAYLOAD_LENGTH_BYTES];
    payload.copy_from_slice(&bytes[payload_start..payload_start + STREAM_PAYLOAD_LENGTH_BYTES]);

    Ok(StreamFrame {
        sequence,
        is_last,
        lich_fragment,
        payload,
    })
}

/// Encodes a [`StreamFrame`] to its 48-byte wire form, including CRC.
pub fn encode(frame: &StreamFrame) -> Result<[u8; FRAME_LENGTH_BYTES], EncodeError> {
    if frame.sequence > MAX_SEQUENCE {
        return Err(EncodeError::Field {
            field: "sequence",
            reason: format!("{} exceeds {MAX_SEQUENCE}", frame.sequence),
        });
    }

    let expects_fragment = frame.sequence < LICH_CARRYING_SEQUENCE_LIMIT;
    if expects_fragment != frame.lich_fragment.is_some() {
        return Err(EncodeError::Field {
            field: "lich_fragment",
            reason: "presence must match sequence < 6".to_string(),
        });
    }

    let mut data = [0u8; FRAME_LENGTH_BYTES - 2];
    data[0..2].copy_from_slice(&SYNC_STREAM);

    let mut fn_word = frame.sequence & FN_SEQUENCE_MASK;
    if frame.is_last {
        fn_word |= FN_LAST_FLAG;
    }
    data[2..4].copy_from_slice(&fn_word.to_be_bytes());

    if let Some(fragment) = frame.lich_fragment {
        data[4..4 + STREAM_LICH_LENGTH_BYTES].copy_from_slice(&fragment);
    }

    let payload_start = 4 + STREAM_LICH_LENGTH_BYTES;
    data[payload_start..payload_start + STREAM_PAYLOAD_LENGTH_BYTES].copy_from_slice(&frame.payload);

    let framed = crc::append(&data).map_err(|_| EncodeError::Length {
        field: "stream_frame",
        limit: data.len(),
    })?;
    let mut out = [0u8; FRAME_LENGTH_BYTES];
    out.copy_from_slice(&framed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(sequence: u16, is_last: bool) -> StreamFrame {
        StreamFrame {
            sequence,
            is_last,
            lich_fragment: if sequence < LICH_CARRYING_SEQUENCE_LIMIT {
                Some([1, 2, 3, 4])
            } else {
                None
            },
            payload: [0xAA; STREAM_PAYLOAD_LENGTH_BYTES],
        }
    }

    #[test]
    fn round_trip_with_lich() {
        let frame = sample(2, false);
        let wire = encode(&frame).unwrap();
        assert_eq!(wire.len(), FRAME_LENGTH_BYTES);
        assert_eq!(decode(&wire).unwrap(), frame);
    }

    #[test]
    fn round_trip_without_lich() {
        let frame = sample(9, true);
        let wire = encode(&frame).unwrap();
        assert_eq!(decode(&wire).unwrap(), frame);
    }

    #[test]
    fn round_trip_last_sequence() {
        let frame = sample(MAX_SEQUENCE, true);
        let wire = encode(&frame).unwrap();
        assert_eq!(decode(&wire).unwrap(), frame);
    }

    #[test]
    fn rejects_bad_sync() {
        let frame = sample(0, false);
        let mut wire = encode(&frame).unwrap();
        wire[0] ^= 0xFF;
        assert!(matches!(decode(&wire), Err(DecodeError::Sync(_))));
    }

    #[test]
    fn rejects_bad_crc() {
        let frame = sample(0, false);
        let mut wire = encode(&frame).unwrap();
        wire[47] ^= 0x01;
        assert!(matches!(decode(&wire), Err(DecodeError::Crc)));
    }

    #[test]
    fn rejects_sequence_overflow() {
        let frame = sample(0, false);
        let bad = StreamFrame {
            sequence: MAX_SEQUENCE + 1,
            ..frame
        };
        assert!(encode(&bad).is_err());
    }

    #[test]
    fn rejects_mismatched_fragment_presence() {
        let bad = StreamFrame {
            sequence: 0,
            is_last: false,
            lich_fragment: None,
            payload: [0u8; STREAM_PAYLOAD_LENGTH_BYTES],
        };
        assert!(encode(&bad).is_err());
    }
}
