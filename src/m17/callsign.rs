//! Callsign codec: up to 6 ASCII characters, zero-padded on the wire.

use crate::constants::CALLSIGN_LENGTH_BYTES;
use crate::error::EncodeError;

/// Encodes `callsign` into a 6-byte, zero-padded wire field.
///
/// Truncates to the first 6 ASCII characters. Longer callsigns are not
/// rejected outright here; callers that need strict length validation
/// should check `callsign.len()` themselves (the LSF codec does).
pub fn encode(callsign: &str) -> [u8; CALLSIGN_LENGTH_BYTES] {
    let mut out = [0u8; CALLSIGN_LENGTH_BYTES];
    for (slot, ch) in out.iter_mut().zip(callsign.bytes()) {
        *slot = ch;
    }
    out
}

/// Encodes `callsign`, rejecting callsigns outside `1..=6` ASCII bytes.
pub fn encode_checked(callsign: &str) -> Result<[u8; CALLSIGN_LENGTH_BYTES], EncodeError> {
    if callsign.is_empty() || callsign.len() > CALLSIGN_LENGTH_BYTES {
        return Err(EncodeError::Field {
            field: "callsign",
            reason: format!("length {} outside 1..=6", callsign.len()),
        });
    }
    if !callsign.is_ascii() {
        return Err(EncodeError::Field {
            field: "callsign",
            reason: "non-ASCII callsign".to_string(),
        });
    }
    Ok(encode(callsign))
}

/// Decodes a 6-byte wire field back to a callsign string.
///
/// Strips trailing zero padding, then surrounding whitespace; non-ASCII
/// bytes are silently dropped.
pub fn decode(field: &[u8; CALLSIGN_LENGTH_BYTES]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    field[..end]
        .iter()
        .filter(|&&b| b.is_ascii())
        .map(|&b| b as char)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let field = encode("W1AW");
        assert_eq!(decode(&field), "W1AW");
    }

    #[test]
    fn truncates_long_callsign() {
        let field = encode("TOOLONGCALL");
        assert_eq!(field.len(), CALLSIGN_LENGTH_BYTES);
    }

    #[test]
    fn strips_padding_and_whitespace() {
        let field = [b' ', b'A', b'L', b'L', 0, 0];
        assert_eq!(decode(&field), "ALL");
    }

    #[test]
    fn rejects_empty_on_checked_encode() {
        assert!(encode_checked("").is_err());
    }

    #[test]
    fn rejects_oversized_on_checked_encode() {
        assert!(encode_checked("TOOLONGCALL").is_err());
    }
}
