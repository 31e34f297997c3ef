//! # m17-gateway
//!
//! The M17 protocol engine and host-level mode arbiter for a digital-voice
//! radio gateway: the M17 frame codec (LSF, Stream Frame, LICH
//! reassembly, CRC), the two-sided M17 controller mediating between RF and
//! network flows, the M17 UDP gateway transport, and the mode arbiter that
//! admits at most one digital-voice mode's traffic onto the shared RF
//! channel at a time.
//!
//! Audio codec (CODEC2), forward-error-correction coding, physical-layer
//! modulation, digital-voice modes other than M17, and the modem firmware
//! protocol beyond byte-level framing are out of scope; those concerns
//! belong to external collaborators this crate only defines the seams for.

pub mod arbiter;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod m17;
pub mod modem;
pub mod util;

pub use arbiter::{ActiveMode, ExternalModeHandle, ModeArbiter, ModeHandle};
pub use config::GatewayConfig;
pub use error::M17Error;
pub use logging::init_logger;
pub use m17::{ControllerConfig, FrameSink, M17Controller, M17NetworkEndpoint};
pub use modem::ModemFramer;
