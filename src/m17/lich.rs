//! LICH (Link Information Channel) reassembler.
//!
//! Collects the six 5-byte LICH fragments spread across the first six
//! Stream Frames of a transmission and reconstructs the 30-byte LSF they
//! encode. `add`, `reset`, and `is_complete` are all serialized by an
//! internal lock so a clocking thread and a decoder thread can call them
//! without external synchronization.

use std::sync::Mutex;

use crate::constants::{LICH_FRAGMENT_COUNT, LSF_FRAGMENT_LENGTH_BYTES};
use crate::error::FragmentError;
use crate::m17::lsf::{self, Lsf};

struct Slots {
    fragments: [Option<[u8; LSF_FRAGMENT_LENGTH_BYTES]>; LICH_FRAGMENT_COUNT],
}

impl Slots {
    fn new() -> Self {
        Self {
            fragments: [None; LICH_FRAGMENT_COUNT],
        }
    }
}

/// Reassembles an [`Lsf`] from its six LICH fragments.
///
/// One instance belongs to a single active transmission on a single side
/// (RF or Net); the owning controller resets it at start-of-transmission
/// and at end-of-transmission.
pub struct LichReassembler {
    slots: Mutex<Slots>,
}

impl LichReassembler {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots::new()),
        }
    }

    /// Stores `fragment` at `index`, overwriting any previous value there.
    ///
    /// If all six slots are now filled, attempts to decode the
    /// concatenation as an LSF. `expected` is the LSF snapshot captured at
    /// LINK_SETUP time; a reassembled LSF that decodes but does not match
    /// `expected` is reported as [`FragmentError::Mismatch`] rather than
    /// returned, closing the validation gap a prior implementation left
    /// open.
    ///
    /// Returns `Ok(None)` while fragments are still outstanding, `Ok(Some(lsf))`
    /// once reassembly succeeds and matches `expected`.
    pub fn add(
        &self,
        fragment: &[u8],
        index: u8,
        expected: Option<&Lsf>,
    ) -> Result<Option<Lsf>, FragmentError> {
        if index as usize >= LICH_FRAGMENT_COUNT {
            return Err(FragmentError::BadIndex(index));
        }
        if fragment.len() != LSF_FRAGMENT_LENGTH_BYTES {
            return Err(FragmentError::BadLength {
                expected: LSF_FRAGMENT_LENGTH_BYTES,
                actual: fragment.len(),
            });
        }

        let mut slots = self.slots.lock().expect("LICH reassembler mutex poisoned");
        let mut stored = [0u8; LSF_FRAGMENT_LENGTH_BYTES];
        stored.copy_from_slice(fragment);
        slots.fragments[index as usize] = Some(stored);

        if slots.fragments.iter().any(|s| s.is_none()) {
            return Ok(None);
        }

        let mut concatenated = Vec::with_capacity(LICH_FRAGMENT_COUNT * LSF_FRAGMENT_LENGTH_BYTES);
        for slot in slots.fragments.iter() {
            concatenated.extend_from_slice(&slot.expect("all slots checked filled"));
        }

        let candidate = lsf::decode(&concatenated)?;
        if let Some(expected) = expected {
            if &candidate != expected {
                return Err(FragmentError::Mismatch);
            }
        }
        Ok(Some(candidate))
    }

    /// Clears all six slots.
    pub fn reset(&self) {
        let mut slots = self.slots.lock().expect("LICH reassembler mutex poisoned");
        slots.fragments = [None; LICH_FRAGMENT_COUNT];
    }

    /// True iff all six slots are filled.
    pub fn is_complete(&self) -> bool {
        let slots = self.slots.lock().expect("LICH reassembler mutex poisoned");
        slots.fragments.iter().all(|s| s.is_some())
    }
}

impl Default for LichReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::m17::lsf::{DataType, EncryptionSubType, EncryptionType, PacketType};

    fn sample_lsf() -> Lsf {
        Lsf {
            dst_callsign: "ALL".to_string(),
            src_callsign: "W1AW".to_string(),
            packet_type: PacketType::Stream,
            data_type: DataType::Voice,
            encryption_type: EncryptionType::None,
            encryption_subtype: EncryptionSubType::Text,
            can: 1,
            meta: [0u8; crate::constants::LSF_META_LENGTH_BYTES],
        }
    }

    fn fragments_for(lsf: &Lsf) -> [[u8; LSF_FRAGMENT_LENGTH_BYTES]; LICH_FRAGMENT_COUNT] {
        let wire = lsf::encode(lsf).unwrap();
        let mut out = [[0u8; LSF_FRAGMENT_LENGTH_BYTES]; LICH_FRAGMENT_COUNT];
        for (i, chunk) in wire.chunks(LSF_FRAGMENT_LENGTH_BYTES).enumerate() {
            out[i].copy_from_slice(chunk);
        }
        out
    }

    #[test]
    fn out_of_order_reassembly_completes_on_sixth_fragment() {
        let lsf = sample_lsf();
        let fragments = fragments_for(&lsf);
        let reassembler = LichReassembler::new();

        let order = [3, 1, 4, 0, 5, 2];
        for (i, &idx) in order.iter().enumerate() {
            let result = reassembler.add(&fragments[idx], idx as u8, Some(&lsf)).unwrap();
            if i < 5 {
                assert!(result.is_none());
            } else {
                assert_eq!(result, Some(lsf.clone()));
            }
        }
    }

    #[test]
    fn reset_clears_slots() {
        let lsf = sample_lsf();
        let fragments = fragments_for(&lsf);
        let reassembler = LichReassembler::new();
        reassembler.add(&fragments[0], 0, None).unwrap();
        assert!(!reassembler.is_complete());
        reassembler.reset();
        assert!(!reassembler.is_complete());
    }

    #[test]
    fn bad_index_rejected() {
        let reassembler = LichReassembler::new();
        assert!(matches!(
            reassembler.add(&[0u8; LSF_FRAGMENT_LENGTH_BYTES], 6, None),
            Err(FragmentError::BadIndex(6))
        ));
    }

    #[test]
    fn bad_length_rejected() {
        let reassembler = LichReassembler::new();
        assert!(matches!(
            reassembler.add(&[0u8; 4], 0, None),
            Err(FragmentError::BadLength { .. })
        ));
    }

    #[test]
    fn mismatched_lsf_reported() {
        let lsf = sample_lsf();
        let fragments = fragments_for(&lsf);
        let mut other = sample_lsf();
        other.src_callsign = "KI5ABC".to_string();

        let reassembler = LichReassembler::new();
        for idx in 0..5 {
            reassembler.add(&fragments[idx], idx as u8, Some(&other)).unwrap();
        }
        let result = reassembler.add(&fragments[5], 5, Some(&other));
        assert!(matches!(result, Err(FragmentError::Mismatch)));
    }
}
