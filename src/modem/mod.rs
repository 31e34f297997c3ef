//! The modem I/O framer: parses the modem's byte-streamed command protocol
//! and demultiplexes per-mode payload bytes, per spec.md §4.8.

pub mod framer;

pub use framer::{Mode, ModeStatus, ModemFramer, VersionInfo};
