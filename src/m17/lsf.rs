//! Link Setup Frame (LSF) codec.
//!
//! Wire layout (30 bytes): `dst[0..6) | src[6..12) | type[12] | can[13..15)
//! | meta[15..28) | crc[28..30)`. The type byte packs four sub-fields; `can`
//! is a separate big-endian 16-bit field; `meta` (13 bytes, all-zero means
//! "no nonce") fills the remainder of the 28-byte CRC-covered region.

use crate::constants::{LSF_DATA_LENGTH_BYTES, LSF_LENGTH_BYTES, LSF_META_LENGTH_BYTES};
use crate::error::{DecodeError, EncodeError};
use crate::m17::callsign;
use crate::m17::crc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Packet,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Reserved,
    Data,
    Voice,
    VoiceData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    None,
    Aes,
    Scramble,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionSubType {
    Text,
    Gps,
    Callsigns,
    Reserved,
}

/// A decoded Link Setup Frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lsf {
    pub dst_callsign: String,
    pub src_callsign: String,
    pub packet_type: PacketType,
    pub data_type: DataType,
    pub encryption_type: EncryptionType,
    pub encryption_subtype: EncryptionSubType,
    pub can: u16,
    pub meta: [u8; LSF_META_LENGTH_BYTES],
}

fn pack_type_byte(lsf: &Lsf) -> u8 {
    let packet_bit = match lsf.packet_type {
        PacketType::Packet => 0,
        PacketType::Stream => 1,
    };
    let data_bits = match lsf.data_type {
        DataType::Reserved => 0,
        DataType::Data => 1,
        DataType::Voice => 2,
        DataType::VoiceData => 3,
    };
    let enc_bits = match lsf.encryption_type {
        EncryptionType::None => 0,
        EncryptionType::Aes => 1,
        EncryptionType::Scramble => 2,
        EncryptionType::Reserved => 3,
    };
    let sub_bits = match lsf.encryption_subtype {
        EncryptionSubType::Text => 0,
        EncryptionSubType::Gps => 1,
        EncryptionSubType::Callsigns => 2,
        EncryptionSubType::Reserved => 3,
    };
    packet_bit | (data_bits << 1) | (enc_bits << 3) | (sub_bits << 5)
}

/// Unpacks the four type-byte sub-fields without validating them; the
/// `Reserved` arm stands in for bit patterns the protocol does not assign a
/// meaning to. Used by the pack/unpack round-trip (every bit pattern must
/// map to *some* value), with [`decode`] separately rejecting `Reserved`.
fn unpack_type_byte(byte: u8) -> (PacketType, DataType, EncryptionType, EncryptionSubType) {
    let packet_type = if byte & 0x01 != 0 {
        PacketType::Stream
    } else {
        PacketType::Packet
    };
    let data_type = match (byte >> 1) & 0x03 {
        0 => DataType::Reserved,
        1 => DataType::Data,
        2 => DataType::Voice,
        _ => DataType::VoiceData,
    };
    let encryption_type = match (byte >> 3) & 0x03 {
        0 => EncryptionType::None,
        1 => EncryptionType::Aes,
        2 => EncryptionType::Scramble,
        _ => EncryptionType::Reserved,
    };
    let encryption_subtype = match (byte >> 5) & 0x03 {
        0 => EncryptionSubType::Text,
        1 => EncryptionSubType::Gps,
        2 => EncryptionSubType::Callsigns,
        _ => EncryptionSubType::Reserved,
    };
    (packet_type, data_type, encryption_type, encryption_subtype)
}

/// Decodes a wire-format LSF.
///
/// Requires at least [`LSF_LENGTH_BYTES`], a valid CRC over the first
/// [`LSF_DATA_LENGTH_BYTES`] bytes, and a legal type byte: `data_type == 0`,
/// `encryption_type == 3`, and `encryption_subtype == 3` are undefined bit
/// patterns (no variant besides `Reserved` maps to them) and are rejected
/// with `DecodeError::Field` rather than silently accepted.
pub fn decode(bytes: &[u8]) -> Result<Lsf, DecodeError> {
    if bytes.len() < LSF_LENGTH_BYTES {
        return Err(DecodeError::Length {
            expected: LSF_LENGTH_BYTES,
            actual: bytes.len(),
        });
    }

    if !crc::verify(&bytes[..LSF_LENGTH_BYTES])? {
        return Err(DecodeError::Crc);
    }

    let dst = callsign::decode(bytes[0..6].try_into().unwrap());
    let src = callsign::decode(bytes[6..12].try_into().unwrap());
    let (packet_type, data_type, encryption_type, encryption_subtype) = unpack_type_byte(bytes[12]);
    if data_type == DataType::Reserved {
        return Err(DecodeError::Field {
            field: "data_type",
            reason: "bit pattern 0 is undefined".to_string(),
        });
    }
    if encryption_type == EncryptionType::Reserved {
        return Err(DecodeError::Field {
            field: "encryption_type",
            reason: "bit pattern 3 is undefined".to_string(),
        });
    }
    if encryption_subtype == EncryptionSubType::Reserved {
        return Err(DecodeError::Field {
            field: "encryption_subtype",
            reason: "bit pattern 3 is undefined".to_string(),
        });
    }
    let can = u16::from_be_bytes([bytes[13], bytes[14]]);
    let mut meta = [0u8; LSF_META_LENGTH_BYTES];
    meta.copy_from_slice(&bytes[15..15 + LSF_META_LENGTH_BYTES]);

    Ok(Lsf {
        dst_callsign: dst,
        src_callsign: src,
        packet_type,
        data_type,
        encryption_type,
        encryption_subtype,
        can,
        meta,
    })
}

/// Encodes an [`Lsf`] to its 30-byte wire form, including CRC.
pub fn encode(lsf: &Lsf) -> Result<[u8; LSF_LENGTH_BYTES], EncodeError> {
    let dst = callsign::encode_checked(&lsf.dst_callsign).map_err(|_| EncodeError::Field {
        field: "dst_callsign",
        reason: format!("length {} outside 1..=6 or non-ASCII", lsf.dst_callsign.len()),
    })?;
    let src = callsign::encode_checked(&lsf.src_callsign).map_err(|_| EncodeError::Field {
        field: "src_callsign",
        reason: format!("length {} outside 1..=6 or non-ASCII", lsf.src_callsign.len()),
    })?;

    let mut data = [0u8; LSF_DATA_LENGTH_BYTES];
    data[0..6].copy_from_slice(&dst);
    data[6..12].copy_from_slice(&src);
    data[12] = pack_type_byte(lsf);
    data[13..15].copy_from_slice(&lsf.can.to_be_bytes());
    data[15..15 + LSF_META_LENGTH_BYTES].copy_from_slice(&lsf.meta);

    let framed = crc::append(&data).map_err(|_| EncodeError::Length {
        field: "lsf",
        limit: LSF_DATA_LENGTH_BYTES,
    })?;
    let mut out = [0u8; LSF_LENGTH_BYTES];
    out.copy_from_slice(&framed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Lsf {
        Lsf {
            dst_callsign: "ALL".to_string(),
            src_callsign: "W1AW".to_string(),
            packet_type: PacketType::Stream,
            data_type: DataType::Voice,
            encryption_type: EncryptionType::None,
            encryption_subtype: EncryptionSubType::Text,
            can: 1,
            meta: [0u8; LSF_META_LENGTH_BYTES],
        }
    }

    #[test]
    fn round_trip() {
        let lsf = sample();
        let wire = encode(&lsf).unwrap();
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded, lsf);
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(decode(&[0u8; 10]), Err(DecodeError::Length { .. })));
    }

    #[test]
    fn rejects_bad_crc() {
        let lsf = sample();
        let mut wire = encode(&lsf).unwrap();
        wire[29] ^= 0x01;
        assert!(matches!(decode(&wire), Err(DecodeError::Crc)));
    }

    #[test]
    fn type_byte_round_trips_all_combinations() {
        for bits in 0u8..128 {
            let (pt, dt, et, st) = unpack_type_byte(bits);
            let lsf = Lsf {
                packet_type: pt,
                data_type: dt,
                encryption_type: et,
                encryption_subtype: st,
                ..sample()
            };
            assert_eq!(pack_type_byte(&lsf), bits);
        }
    }

    /// Rebuilds the 28-byte CRC-covered region with `type_byte` substituted
    /// in, so the tampered type byte is the only thing under test.
    fn with_type_byte(lsf: &Lsf, type_byte: u8) -> [u8; LSF_LENGTH_BYTES] {
        let mut wire = encode(lsf).unwrap();
        wire[12] = type_byte;
        let crc = crc::crc16(&wire[..LSF_DATA_LENGTH_BYTES]).unwrap();
        wire[28..30].copy_from_slice(&crc.to_be_bytes());
        wire
    }

    #[test]
    fn rejects_undefined_data_type() {
        // bits 1-2 (data_type) = 0 is undefined.
        let wire = with_type_byte(&sample(), 0b0000_0001);
        assert!(matches!(
            decode(&wire),
            Err(DecodeError::Field { field: "data_type", .. })
        ));
    }

    #[test]
    fn rejects_undefined_encryption_type() {
        // bits 3-4 (encryption_type) = 3 is undefined.
        let wire = with_type_byte(&sample(), 0b0001_1101);
        assert!(matches!(
            decode(&wire),
            Err(DecodeError::Field { field: "encryption_type", .. })
        ));
    }

    #[test]
    fn rejects_undefined_encryption_subtype() {
        // bits 5-6 (encryption_subtype) = 3 is undefined.
        let wire = with_type_byte(&sample(), 0b0110_0101);
        assert!(matches!(
            decode(&wire),
            Err(DecodeError::Field { field: "encryption_subtype", .. })
        ));
    }
}
