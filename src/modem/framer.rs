//! Byte-driven modem frame parser.
//!
//! Every modem frame is `0xE0 | len_hi | len_lo | type | payload…`, where
//! `len` (the 15-bit value of `len_hi,len_lo` with the start marker in the
//! top bit position stripped) counts the *whole* frame including its
//! 4-byte header. The parser is a state machine with states
//! `Start -> Length1 -> Length2 -> Type -> Data -> Start`, one byte at a
//! time, so it tolerates a byte-streamed serial or UDP transport feeding it
//! in arbitrarily small chunks.

use std::collections::HashMap;

use log::{debug, warn};

use crate::constants::{
    MODEM_FRAME_HEADER_LEN, MODEM_FRAME_START, MODEM_TYPE_AX25, MODEM_TYPE_DMR_SLOT1,
    MODEM_TYPE_DMR_SLOT2, MODEM_TYPE_DSTAR_DATA, MODEM_TYPE_DSTAR_HEADER, MODEM_TYPE_FM,
    MODEM_TYPE_GET_STATUS, MODEM_TYPE_GET_VERSION, MODEM_TYPE_M17, MODEM_TYPE_NXDN,
    MODEM_TYPE_P25, MODEM_TYPE_POCSAG, MODEM_TYPE_SEND_CWID, MODEM_TYPE_SET_DMR_PARAMS,
    MODEM_TYPE_SET_LEVELS, MODEM_TYPE_SET_M17_PARAMS, MODEM_TYPE_SET_MODES,
    MODEM_TYPE_SET_NXDN_PARAMS, MODEM_TYPE_SET_P25_PARAMS, MODEM_TYPE_SET_RF_PARAMS,
    MODEM_TYPE_SET_YSF_PARAMS, MODEM_TYPE_WRITE_CONFIG, MODEM_TYPE_YSF, RING_BUFFER_CAPACITY,
    RING_READ_AX25, RING_READ_DMR, RING_READ_DSTAR, RING_READ_FM, RING_READ_M17, RING_READ_NXDN,
    RING_READ_P25, RING_READ_POCSAG, RING_READ_YSF,
};
use crate::util::IoBuffer;

/// Per-mode ring-buffer identity. D-STAR's header and data frames share a
/// ring (the modem always emits a header before its data); every other mode
/// keeps its native type code as its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    Dstar,
    Dmr1,
    Dmr2,
    Ysf,
    P25,
    Nxdn,
    M17,
    Pocsag,
    Fm,
    Ax25,
}

impl Mode {
    /// Fixed poll order used by the mode arbiter (spec.md §4.9).
    pub const ORDER: [Mode; 10] = [
        Mode::Dstar,
        Mode::Dmr1,
        Mode::Dmr2,
        Mode::Ysf,
        Mode::P25,
        Mode::Nxdn,
        Mode::M17,
        Mode::Pocsag,
        Mode::Fm,
        Mode::Ax25,
    ];

    fn read_size(self) -> usize {
        match self {
            Mode::Dstar => RING_READ_DSTAR,
            Mode::Dmr1 | Mode::Dmr2 => RING_READ_DMR,
            Mode::Ysf => RING_READ_YSF,
            Mode::P25 => RING_READ_P25,
            Mode::Nxdn => RING_READ_NXDN,
            Mode::M17 => RING_READ_M17,
            Mode::Pocsag => RING_READ_POCSAG,
            Mode::Fm => RING_READ_FM,
            Mode::Ax25 => RING_READ_AX25,
        }
    }

    fn from_type_code(code: u8) -> Option<Mode> {
        match code {
            MODEM_TYPE_DSTAR_HEADER | MODEM_TYPE_DSTAR_DATA => Some(Mode::Dstar),
            MODEM_TYPE_DMR_SLOT1 => Some(Mode::Dmr1),
            MODEM_TYPE_DMR_SLOT2 => Some(Mode::Dmr2),
            MODEM_TYPE_YSF => Some(Mode::Ysf),
            MODEM_TYPE_P25 => Some(Mode::P25),
            MODEM_TYPE_NXDN => Some(Mode::Nxdn),
            MODEM_TYPE_M17 => Some(Mode::M17),
            MODEM_TYPE_POCSAG => Some(Mode::Pocsag),
            MODEM_TYPE_FM => Some(Mode::Fm),
            MODEM_TYPE_AX25 => Some(Mode::Ax25),
            _ => None,
        }
    }
}

/// Latched response to a `0x00` get-version frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub protocol_version: u8,
    pub hardware_id: Vec<u8>,
    pub capability_flags: u32,
}

/// Latched response to a `0x01` get-status frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeStatus {
    pub tx: bool,
    pub cd: bool,
    pub lockout: bool,
    pub error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Start,
    Length1,
    Length2,
    Type,
    Data,
}

/// Parses the modem's byte-streamed command protocol and demultiplexes
/// per-mode RX bytes into bounded ring buffers.
pub struct ModemFramer {
    state: ParserState,
    total_len: usize,
    frame_type: u8,
    payload: Vec<u8>,
    rings: HashMap<Mode, IoBuffer>,
    version: VersionInfo,
    status: ModeStatus,
}

impl ModemFramer {
    pub fn new() -> Self {
        let mut rings = HashMap::new();
        for mode in Mode::ORDER {
            let mut ring = IoBuffer::with_capacity(RING_BUFFER_CAPACITY);
            ring.set_capacity_limit(Some(RING_BUFFER_CAPACITY));
            rings.insert(mode, ring);
        }
        Self {
            state: ParserState::Start,
            total_len: 0,
            frame_type: 0,
            payload: Vec::new(),
            rings,
            version: VersionInfo::default(),
            status: ModeStatus::default(),
        }
    }

    /// Feeds raw bytes from the modem transport into the parser, one byte
    /// at a time. Dispatches each complete frame as it closes.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.feed_byte(byte);
        }
    }

    fn feed_byte(&mut self, byte: u8) {
        match self.state {
            ParserState::Start => {
                if byte == MODEM_FRAME_START {
                    self.state = ParserState::Length1;
                }
            }
            ParserState::Length1 => {
                self.total_len = (byte as usize) << 8;
                self.state = ParserState::Length2;
            }
            ParserState::Length2 => {
                self.total_len |= byte as usize;
                if self.total_len < MODEM_FRAME_HEADER_LEN {
                    warn!("modem framer: rejecting frame with length {} < header", self.total_len);
                    self.state = ParserState::Start;
                } else {
                    self.state = ParserState::Type;
                }
            }
            ParserState::Type => {
                self.frame_type = byte;
                self.payload.clear();
                if self.total_len == MODEM_FRAME_HEADER_LEN {
                    self.dispatch();
                    self.state = ParserState::Start;
                } else {
                    self.state = ParserState::Data;
                }
            }
            ParserState::Data => {
                self.payload.push(byte);
                if self.payload.len() + MODEM_FRAME_HEADER_LEN >= self.total_len {
                    self.dispatch();
                    self.state = ParserState::Start;
                }
            }
        }
    }

    fn dispatch(&mut self) {
        match self.frame_type {
            MODEM_TYPE_GET_VERSION => self.handle_version(),
            MODEM_TYPE_GET_STATUS => self.handle_status(),
            other => {
                if let Some(mode) = Mode::from_type_code(other) {
                    self.push_mode_bytes(mode);
                } else {
                    debug!("modem framer: ignoring unrecognized frame type {other:#04x}");
                }
            }
        }
    }

    fn handle_version(&mut self) {
        if self.payload.is_empty() {
            warn!("modem framer: empty get-version payload");
            return;
        }
        let protocol_version = self.payload[0];
        let capability_flags = if self.payload.len() >= 5 {
            let tail = &self.payload[self.payload.len() - 4..];
            u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]])
        } else {
            0
        };
        let hardware_id_end = self.payload.len().saturating_sub(4).max(1);
        let hardware_id = self.payload[1..hardware_id_end].to_vec();
        self.version = VersionInfo {
            protocol_version,
            hardware_id,
            capability_flags,
        };
    }

    fn handle_status(&mut self) {
        if self.payload.is_empty() {
            warn!("modem framer: empty get-status payload");
            return;
        }
        let bits = self.payload[0];
        self.status = ModeStatus {
            tx: bits & 0x01 != 0,
            cd: bits & 0x02 != 0,
            lockout: bits & 0x04 != 0,
            error: bits & 0x08 != 0,
        };
    }

    fn push_mode_bytes(&mut self, mode: Mode) {
        if let Some(ring) = self.rings.get_mut(&mode) {
            if ring.write(&self.payload).is_err() {
                debug!("modem framer: {mode:?} ring full, dropping {} bytes", self.payload.len());
            }
        }
    }

    /// Reads up to that mode's fixed chunk size from its ring buffer.
    /// Returns `None` if nothing is queued.
    pub fn read_mode(&mut self, mode: Mode) -> Option<Vec<u8>> {
        let ring = self.rings.get_mut(&mode)?;
        if ring.is_empty() {
            return None;
        }
        Some(ring.consume(mode.read_size()))
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn status(&self) -> ModeStatus {
        self.status
    }
}

impl Default for ModemFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles one outbound modem command frame:
/// `0xE0 | len_hi | len_lo | type | payload`.
fn build_frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let total_len = MODEM_FRAME_HEADER_LEN + payload.len();
    let mut out = Vec::with_capacity(total_len);
    out.push(MODEM_FRAME_START);
    out.push((total_len >> 8) as u8);
    out.push((total_len & 0xFF) as u8);
    out.push(frame_type);
    out.extend_from_slice(payload);
    out
}

pub fn build_get_version() -> Vec<u8> {
    build_frame(MODEM_TYPE_GET_VERSION, &[])
}

pub fn build_get_status() -> Vec<u8> {
    build_frame(MODEM_TYPE_GET_STATUS, &[])
}

/// Enables/disables each digital mode. `enabled` is indexed the same as
/// [`Mode::ORDER`] minus the split DMR slots (DMR is a single enable bit
/// covering both slots on the modem side).
pub fn build_set_modes(dstar: bool, dmr: bool, ysf: bool, p25: bool, nxdn: bool, m17: bool) -> Vec<u8> {
    let mut bits = 0u8;
    if dstar {
        bits |= 0x01;
    }
    if dmr {
        bits |= 0x02;
    }
    if ysf {
        bits |= 0x04;
    }
    if p25 {
        bits |= 0x08;
    }
    if nxdn {
        bits |= 0x10;
    }
    if m17 {
        bits |= 0x20;
    }
    build_frame(MODEM_TYPE_SET_MODES, &[bits])
}

pub fn build_set_rf_params(rx_freq_hz: u32, tx_freq_hz: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8);
    payload.extend_from_slice(&rx_freq_hz.to_be_bytes());
    payload.extend_from_slice(&tx_freq_hz.to_be_bytes());
    build_frame(MODEM_TYPE_SET_RF_PARAMS, &payload)
}

pub fn build_set_levels(rx_level: u8, tx_level: u8) -> Vec<u8> {
    build_frame(MODEM_TYPE_SET_LEVELS, &[rx_level, tx_level])
}

pub fn build_set_dmr_params(color_code: u8) -> Vec<u8> {
    build_frame(MODEM_TYPE_SET_DMR_PARAMS, &[color_code])
}

pub fn build_set_ysf_params(low_deviation: bool, tx_hang_ms: u16) -> Vec<u8> {
    let mut payload = vec![low_deviation as u8];
    payload.extend_from_slice(&tx_hang_ms.to_be_bytes());
    build_frame(MODEM_TYPE_SET_YSF_PARAMS, &payload)
}

pub fn build_set_p25_params(nac: u16) -> Vec<u8> {
    build_frame(MODEM_TYPE_SET_P25_PARAMS, &nac.to_be_bytes())
}

pub fn build_set_nxdn_params(ran: u8) -> Vec<u8> {
    build_frame(MODEM_TYPE_SET_NXDN_PARAMS, &[ran])
}

pub fn build_set_m17_params(can: u16) -> Vec<u8> {
    build_frame(MODEM_TYPE_SET_M17_PARAMS, &can.to_be_bytes())
}

pub fn build_write_config(config: &[u8]) -> Vec<u8> {
    build_frame(MODEM_TYPE_WRITE_CONFIG, config)
}

pub fn build_send_cwid(callsign: &str) -> Vec<u8> {
    build_frame(MODEM_TYPE_SEND_CWID, callsign.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version_frame() -> Vec<u8> {
        let mut payload = vec![3u8]; // protocol version
        payload.extend_from_slice(b"HW1"); // hardware id
        payload.extend_from_slice(&0x0000_0007u32.to_be_bytes()); // capability flags
        build_frame(MODEM_TYPE_GET_VERSION, &payload)
    }

    #[test]
    fn parses_version_frame() {
        let mut framer = ModemFramer::new();
        framer.feed(&version_frame());
        assert_eq!(framer.version().protocol_version, 3);
        assert_eq!(framer.version().hardware_id, b"HW1");
        assert_eq!(framer.version().capability_flags, 7);
    }

    #[test]
    fn parses_status_frame() {
        let mut framer = ModemFramer::new();
        let frame = build_frame(MODEM_TYPE_GET_STATUS, &[0b0000_1101]); // tx + lockout + error
        framer.feed(&frame);
        let status = framer.status();
        assert!(status.tx);
        assert!(!status.cd);
        assert!(status.lockout);
        assert!(status.error);
    }

    #[test]
    fn routes_m17_bytes_to_m17_ring() {
        let mut framer = ModemFramer::new();
        let payload = vec![0xAA; RING_READ_M17];
        let frame = build_frame(MODEM_TYPE_M17, &payload);
        framer.feed(&frame);
        let read = framer.read_mode(Mode::M17).expect("m17 bytes queued");
        assert_eq!(read, payload);
    }

    #[test]
    fn byte_at_a_time_feed_still_parses() {
        let mut framer = ModemFramer::new();
        let frame = build_frame(MODEM_TYPE_M17, &[1, 2, 3]);
        for byte in frame {
            framer.feed(&[byte]);
        }
        assert_eq!(framer.read_mode(Mode::M17), Some(vec![1, 2, 3]));
    }

    #[test]
    fn dstar_header_and_data_share_one_ring() {
        let mut framer = ModemFramer::new();
        framer.feed(&build_frame(MODEM_TYPE_DSTAR_HEADER, &[1, 2]));
        framer.feed(&build_frame(MODEM_TYPE_DSTAR_DATA, &[3, 4]));
        let read = framer.read_mode(Mode::Dstar).unwrap();
        assert_eq!(read, vec![1, 2, 3, 4]);
    }

    #[test]
    fn unrecognized_type_is_ignored_without_panicking() {
        let mut framer = ModemFramer::new();
        framer.feed(&build_frame(0xFE, &[9, 9, 9]));
        for mode in Mode::ORDER {
            assert_eq!(framer.read_mode(mode), None);
        }
    }

    #[test]
    fn command_builders_round_trip_through_the_parser() {
        let mut framer = ModemFramer::new();
        framer.feed(&build_set_m17_params(5));
        // set-m17-params is not a per-mode RX type; it should not land in
        // any ring and should not panic the parser.
        for mode in Mode::ORDER {
            assert_eq!(framer.read_mode(mode), None);
        }
    }
}
