//! M17 protocol engine: codecs, LICH reassembly, the two-sided controller,
//! and the UDP gateway transport.

pub mod callsign;
pub mod controller;
pub mod crc;
pub mod frame;
pub mod lich;
pub mod lsf;
pub mod network;

pub use controller::{ControllerConfig, FrameSink, M17Controller, Side, State};
pub use frame::StreamFrame;
pub use lich::LichReassembler;
pub use lsf::{DataType, EncryptionSubType, EncryptionType, Lsf, PacketType};
pub use network::M17NetworkEndpoint;
