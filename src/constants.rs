//! M17 Protocol Constants
//!
//! Fixed sync words, frame widths, and modem wire-protocol type codes used
//! throughout the M17 engine.

// ----------------------------------------------------------------------------
// Sync words
// ----------------------------------------------------------------------------

/// Sync word opening a Link Setup Frame transmission.
pub const SYNC_LINK_SETUP: [u8; 2] = [0x55, 0xF7];
/// Sync word opening a Stream Frame.
pub const SYNC_STREAM: [u8; 2] = [0xFF, 0x5D];
/// End-of-transmission sentinel, sent standalone (not wrapped in a Stream Frame).
pub const SYNC_EOT: [u8; 2] = [0x55, 0x5D];

// ----------------------------------------------------------------------------
// Frame widths
// ----------------------------------------------------------------------------

/// Width of an encoded callsign field.
pub const CALLSIGN_LENGTH_BYTES: usize = 6;

/// Total width of an encoded LSF, including its trailing CRC.
pub const LSF_LENGTH_BYTES: usize = 30;
/// Width of the LSF's CRC-covered data region (everything but the CRC).
pub const LSF_DATA_LENGTH_BYTES: usize = 28;
/// Width of the LSF's meta/nonce field. All-zero means "no nonce".
pub const LSF_META_LENGTH_BYTES: usize = 13;

/// Width of one LICH fragment. Six fragments concatenate to one LSF
/// (`6 * LSF_FRAGMENT_LENGTH_BYTES == LSF_LENGTH_BYTES`).
pub const LSF_FRAGMENT_LENGTH_BYTES: usize = 5;
/// Number of LICH fragments needed to reassemble one LSF.
pub const LICH_FRAGMENT_COUNT: usize = 6;

/// Total width of an encoded Stream Frame, including its trailing CRC.
pub const FRAME_LENGTH_BYTES: usize = 48;
/// Minimum length accepted by the Stream Frame decoder.
pub const MIN_FRAME_LENGTH_BYTES: usize = FRAME_LENGTH_BYTES;
/// Width of a Stream Frame's codec payload.
pub const STREAM_PAYLOAD_LENGTH_BYTES: usize = 16;
/// Width of the LICH fragment embedded in a Stream Frame's `[4..8)` region.
/// Distinct from [`LSF_FRAGMENT_LENGTH_BYTES`] (5): the six on-air LICH
/// fragments that reassemble to a full LSF carry one extra byte that this
/// 4-byte in-frame slice does not.
pub const STREAM_LICH_LENGTH_BYTES: usize = 4;

/// Largest legal 15-bit stream sequence number before wraparound.
pub const MAX_SEQUENCE: u16 = 0x7FFF;
/// Bit mask isolating the `is_last` flag from a frame-number word.
pub const FN_LAST_FLAG: u16 = 0x8000;
/// Bit mask isolating the sequence number from a frame-number word.
pub const FN_SEQUENCE_MASK: u16 = 0x7FFF;

/// Sequence numbers below this value carry a LICH fragment in the Stream Frame.
pub const LICH_CARRYING_SEQUENCE_LIMIT: u16 = LICH_FRAGMENT_COUNT as u16;

// ----------------------------------------------------------------------------
// CRC
// ----------------------------------------------------------------------------

/// M17 CRC-16 polynomial (non-reflected, MSB-first).
pub const CRC_POLY: u16 = 0x5935;
/// M17 CRC-16 initial register value.
pub const CRC_INIT: u16 = 0xFFFF;

// ----------------------------------------------------------------------------
// FEC framing sizes
// ----------------------------------------------------------------------------

/// A LICH fragment is one LSF fragment plus an 8-bit fragment-index/flag
/// octet prepended on the air.
pub const LICH_FRAGMENT_WIRE_LENGTH_BYTES: usize = LSF_FRAGMENT_LENGTH_BYTES + 1;

/// Convolutionally-coded (rate 1/2) size of one LSF fragment as it appears
/// on the air. FEC *coding* itself is out of scope (spec.md Non-goals); this
/// size constant is carried because it is part of the protocol's type
/// system and callers building the physical layer on top of this crate
/// need it.
pub const LSF_FRAGMENT_FEC_LENGTH_BYTES: usize = LSF_FRAGMENT_LENGTH_BYTES * 2;
/// Convolutionally-coded size of one on-air LICH fragment.
pub const LICH_FRAGMENT_FEC_LENGTH_BYTES: usize = LICH_FRAGMENT_WIRE_LENGTH_BYTES * 2;

// ----------------------------------------------------------------------------
// CODEC2 comfort-noise payloads (data only; no codec logic is implemented)
// ----------------------------------------------------------------------------

/// 3200 bps CODEC2 silence frame, used to pad a Stream Frame payload when no
/// real audio is available.
pub const SILENCE_3200: [u8; STREAM_PAYLOAD_LENGTH_BYTES] = [
    0x01, 0x00, 0x09, 0x43, 0x01, 0x00, 0x09, 0x43, 0x01, 0x00, 0x09, 0x43, 0x01, 0x00, 0x09, 0x43,
];
/// 1600 bps CODEC2 silence frame (occupies the low 8 bytes of a payload half).
pub const SILENCE_1600: [u8; 8] = [0x01, 0x00, 0x09, 0x43, 0x01, 0x00, 0x09, 0x43];

// ----------------------------------------------------------------------------
// Modem wire protocol
// ----------------------------------------------------------------------------

/// Leading byte marking the start of every modem command/response frame.
pub const MODEM_FRAME_START: u8 = 0xE0;
/// Minimum modem frame length: start + len_hi + len_lo + type.
pub const MODEM_FRAME_HEADER_LEN: usize = 4;

pub const MODEM_TYPE_GET_VERSION: u8 = 0x00;
pub const MODEM_TYPE_GET_STATUS: u8 = 0x01;
pub const MODEM_TYPE_SET_MODES: u8 = 0x02;
pub const MODEM_TYPE_SET_RF_PARAMS: u8 = 0x03;
pub const MODEM_TYPE_SET_LEVELS: u8 = 0x04;
pub const MODEM_TYPE_SET_DMR_PARAMS: u8 = 0x05;
pub const MODEM_TYPE_SET_YSF_PARAMS: u8 = 0x06;
pub const MODEM_TYPE_SET_P25_PARAMS: u8 = 0x07;
pub const MODEM_TYPE_SET_NXDN_PARAMS: u8 = 0x08;
pub const MODEM_TYPE_WRITE_CONFIG: u8 = 0x09;
pub const MODEM_TYPE_SET_M17_PARAMS: u8 = 0x0A;
pub const MODEM_TYPE_SEND_CWID: u8 = 0x0E;

pub const MODEM_TYPE_DSTAR_HEADER: u8 = 0x20;
pub const MODEM_TYPE_DSTAR_DATA: u8 = 0x21;
pub const MODEM_TYPE_DMR_SLOT1: u8 = 0x22;
pub const MODEM_TYPE_DMR_SLOT2: u8 = 0x23;
pub const MODEM_TYPE_YSF: u8 = 0x24;
pub const MODEM_TYPE_P25: u8 = 0x25;
pub const MODEM_TYPE_NXDN: u8 = 0x26;
pub const MODEM_TYPE_M17: u8 = 0x27;
pub const MODEM_TYPE_POCSAG: u8 = 0x28;
pub const MODEM_TYPE_FM: u8 = 0x29;
pub const MODEM_TYPE_AX25: u8 = 0x2A;

/// Per-mode ring buffer read sizes, matching the modem's fixed frame widths
/// for each digital mode.
pub const RING_READ_M17: usize = 25;
pub const RING_READ_DMR: usize = 33;
pub const RING_READ_DSTAR: usize = 200;
pub const RING_READ_YSF: usize = 130;
pub const RING_READ_P25: usize = 35;
pub const RING_READ_NXDN: usize = 25;
pub const RING_READ_FM: usize = 200;
pub const RING_READ_AX25: usize = 300;
pub const RING_READ_POCSAG: usize = 50;

/// Default bound on a per-mode ring buffer.
pub const RING_BUFFER_CAPACITY: usize = 3000;

// ----------------------------------------------------------------------------
// M17 network endpoint
// ----------------------------------------------------------------------------

/// Depth of the network endpoint's bounded inbound queue.
pub const NETWORK_INBOUND_QUEUE_DEPTH: usize = 3000;
/// Keepalive ping interval.
pub const PING_INTERVAL_MS: u64 = 5_000;
/// Receive-worker poll timeout.
pub const NETWORK_RECV_TIMEOUT_MS: u64 = 1_000;
/// Leading byte tagging a ping/ping-ack datagram.
pub const PING_TAG: u8 = 0x00;
