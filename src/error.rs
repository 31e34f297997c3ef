//! # M17 Error Handling
//!
//! This module defines the error types that can occur while decoding,
//! encoding, or transporting M17 protocol frames.

use thiserror::Error;

/// Reasons a frame failed to decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// CRC check failed.
    #[error("CRC mismatch")]
    Crc,

    /// Leading bytes did not match an expected sync word.
    #[error("unrecognized sync word: {0:02X?}")]
    Sync([u8; 2]),

    /// Input was shorter than the wire format requires.
    #[error("length error: expected at least {expected}, got {actual}")]
    Length { expected: usize, actual: usize },

    /// A field held a value outside its legal enumeration or range.
    #[error("invalid field {field}: {reason}")]
    Field { field: &'static str, reason: String },
}

/// Reasons a value failed to encode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A field held a value that cannot be represented on the wire.
    #[error("invalid field {field}: {reason}")]
    Field { field: &'static str, reason: String },

    /// A variable-length field exceeded its wire budget.
    #[error("length error: {field} exceeds {limit} bytes")]
    Length { field: &'static str, limit: usize },
}

/// Reasons a LICH fragment could not be accepted or reassembled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// The fragment index was outside `[0, 6)`.
    #[error("fragment index {0} out of range [0, 6)")]
    BadIndex(u8),

    /// The fragment payload was not exactly `LSF_FRAGMENT_LENGTH_BYTES`.
    #[error("fragment length {actual} does not match expected {expected}")]
    BadLength { expected: usize, actual: usize },

    /// The reassembled LSF decoded but did not match the LSF captured at
    /// LINK_SETUP time.
    #[error("reassembled LSF does not match the LSF opened at LINK_SETUP")]
    Mismatch,

    /// The six fragments, concatenated, failed to decode as an LSF.
    #[error("reassembled LSF failed to decode: {0}")]
    Decode(#[from] DecodeError),
}

/// Transport-level failures on the network endpoint or modem link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read timed out without error.
    #[error("operation timed out")]
    Timeout,

    /// The endpoint attempted to send while not connected to its peer.
    #[error("not connected")]
    NotConnected,
}

/// Top-level error type for the M17 engine.
#[derive(Debug, Error)]
pub enum M17Error {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("fragment error: {0}")]
    Fragment(#[from] FragmentError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A catch-all for uncategorized cases.
    #[error("{0}")]
    Other(String),
}
