//! The M17 controller: two independent RF/Net state machines that mediate
//! between the modem and the network side of a single M17 transmission.
//!
//! Each side is a separate [`ControllerSide`] record with its own state,
//! watchdog, LICH reassembler, and counters — per spec.md's instruction,
//! they are never factored into one shared mutable object; the independence
//! between the RF and Net flows is the point.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::constants::{FRAME_LENGTH_BYTES, SYNC_EOT, SYNC_LINK_SETUP, SYNC_STREAM};
use crate::error::DecodeError;
use crate::m17::frame::{self, StreamFrame};
use crate::m17::lich::LichReassembler;
use crate::m17::lsf::{self, EncryptionType, Lsf};

/// Width of the LINK_SETUP wire envelope this engine exchanges over the
/// network and modem queues: `sync(2) || lsf(30) || pad(16)`, matching the
/// fixed 48-byte-datagram convention in spec.md §6.
const LINK_SETUP_ENVELOPE_LEN: usize = FRAME_LENGTH_BYTES;
const LSF_LEN: usize = crate::constants::LSF_LENGTH_BYTES;

fn encode_link_setup_envelope(lsf: &Lsf) -> Result<[u8; LINK_SETUP_ENVELOPE_LEN], crate::error::EncodeError> {
    let wire = lsf::encode(lsf)?;
    let mut out = [0u8; LINK_SETUP_ENVELOPE_LEN];
    out[0..2].copy_from_slice(&SYNC_LINK_SETUP);
    out[2..2 + LSF_LEN].copy_from_slice(&wire);
    Ok(out)
}

fn decode_link_setup_envelope(bytes: &[u8]) -> Result<Lsf, DecodeError> {
    if bytes.len() < 2 + LSF_LEN {
        return Err(DecodeError::Length {
            expected: 2 + LSF_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[0..2] != SYNC_LINK_SETUP {
        return Err(DecodeError::Sync([bytes[0], bytes[1]]));
    }
    lsf::decode(&bytes[2..2 + LSF_LEN])
}

/// Classification of a raw frame buffer handed to the controller.
enum FrameKind {
    LinkSetup(Lsf),
    Stream(StreamFrame),
    Eot,
}

fn classify(bytes: &[u8]) -> Result<FrameKind, DecodeError> {
    if bytes.len() == 2 && bytes == SYNC_EOT {
        return Ok(FrameKind::Eot);
    }
    if bytes.len() >= 2 && bytes[0..2] == SYNC_LINK_SETUP {
        return Ok(FrameKind::LinkSetup(decode_link_setup_envelope(bytes)?));
    }
    if bytes.len() >= 2 && bytes[0..2] == SYNC_STREAM {
        return Ok(FrameKind::Stream(frame::decode(bytes)?));
    }
    let mut sync = [0u8; 2];
    if bytes.len() >= 2 {
        sync.copy_from_slice(&bytes[0..2]);
    }
    Err(DecodeError::Sync(sync))
}

/// A sink a controller side forwards accepted frames to: the network
/// endpoint for the RF side, the modem write path for the Net side.
pub trait FrameSink: Send + Sync {
    fn forward(&self, bytes: &[u8]);
}

/// A [`FrameSink`] that does nothing; useful where no peer is wired up yet.
pub struct NullSink;

impl FrameSink for NullSink {
    fn forward(&self, _bytes: &[u8]) {}
}

/// Which side of the controller a [`ControllerSide`] represents. Only
/// affects whether EOT/timeout is mirrored onward (RF does; Net does not,
/// per spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Rf,
    Net,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    None,
    Process,
}

#[derive(Debug, Clone, Copy, Default)]
struct SideCounters {
    frames: u64,
    bits: u64,
    bit_errors: u64,
}

struct ControllerSide {
    side: Side,
    state: State,
    watchdog_remaining_ms: u64,
    last_seq: Option<u16>,
    counters: SideCounters,
    lich: LichReassembler,
    current_lsf: Option<Lsf>,
}

impl ControllerSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            state: State::None,
            watchdog_remaining_ms: 0,
            last_seq: None,
            counters: SideCounters::default(),
            lich: LichReassembler::new(),
            current_lsf: None,
        }
    }

    fn label(&self) -> &'static str {
        match self.side {
            Side::Rf => "rf",
            Side::Net => "net",
        }
    }

    fn enter_process(&mut self, lsf: Lsf, tx_hang_ms: u64) {
        self.state = State::Process;
        self.lich.reset();
        self.current_lsf = Some(lsf);
        self.counters = SideCounters::default();
        self.last_seq = None;
        self.watchdog_remaining_ms = tx_hang_ms;
    }

    fn end_transmission(&mut self, reason: &str) {
        let bits = self.counters.bits;
        let ber = if bits > 0 {
            self.counters.bit_errors * 100 / bits
        } else {
            0
        };
        info!(
            "{} side {}: frames={} bits={} ber={}%",
            self.label(),
            reason,
            self.counters.frames,
            bits,
            ber
        );
        self.lich.reset();
        self.current_lsf = None;
        self.state = State::None;
        self.watchdog_remaining_ms = 0;
    }
}

/// Admission and timing parameters applied to both sides of the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub local_callsign: String,
    pub self_only: bool,
    pub allow_encryption: bool,
    pub can_filter: Option<u16>,
    pub tx_hang_ms: u64,
    /// Belt-and-suspenders global watchdog (spec.md §4.6); `None` disables it.
    pub global_watchdog_ms: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            local_callsign: String::new(),
            self_only: false,
            allow_encryption: false,
            can_filter: None,
            tx_hang_ms: 5_000,
            global_watchdog_ms: Some(10_000),
        }
    }
}

/// The two-sided M17 controller.
pub struct M17Controller {
    config: ControllerConfig,
    rf: ControllerSide,
    net: ControllerSide,
    rf_tx: mpsc::Sender<Vec<u8>>,
    rf_rx: mpsc::Receiver<Vec<u8>>,
    net_tx: mpsc::Sender<Vec<u8>>,
    net_rx: mpsc::Receiver<Vec<u8>>,
    /// Where RF-side accepted frames are forwarded: the network endpoint.
    network_sink: Arc<dyn FrameSink>,
    /// Where Net-side accepted frames are forwarded: the modem write path.
    modem_sink: Arc<dyn FrameSink>,
    global_watchdog_remaining_ms: Option<u64>,
}

impl M17Controller {
    pub fn new(config: ControllerConfig, network_sink: Arc<dyn FrameSink>, modem_sink: Arc<dyn FrameSink>) -> Self {
        let (rf_tx, rf_rx) = mpsc::channel(1);
        let (net_tx, net_rx) = mpsc::channel(1);
        Self {
            config,
            rf: ControllerSide::new(Side::Rf),
            net: ControllerSide::new(Side::Net),
            rf_tx,
            rf_rx,
            net_tx,
            net_rx,
            network_sink,
            modem_sink,
            global_watchdog_remaining_ms: None,
        }
    }

    /// Enqueues a frame arriving from the modem (RF side). Returns `false`
    /// and drops the frame if the depth-1 queue is already occupied.
    pub fn write_rf(&self, bytes: &[u8]) -> bool {
        self.rf_tx.try_send(bytes.to_vec()).is_ok()
    }

    /// Enqueues a frame arriving from the network (Net side). Returns
    /// `false` and drops the frame if the depth-1 queue is already occupied.
    pub fn write_net(&self, bytes: &[u8]) -> bool {
        self.net_tx.try_send(bytes.to_vec()).is_ok()
    }

    /// Advances both per-side watchdogs and the global watchdog by
    /// `elapsed_ms`, forcing a timeout transition wherever a deadline is
    /// crossed.
    pub fn clock(&mut self, elapsed_ms: u64) {
        if self.rf.state == State::Process {
            tick_watchdog(&mut self.rf, elapsed_ms, &self.config, Some(self.network_sink.as_ref()));
        }
        if self.net.state == State::Process {
            tick_watchdog(&mut self.net, elapsed_ms, &self.config, None);
        }

        if let Some(remaining) = self.global_watchdog_remaining_ms {
            let remaining = remaining.saturating_sub(elapsed_ms);
            if remaining == 0 {
                if self.rf.state == State::Process || self.net.state == State::Process {
                    warn!("global tx watchdog expired; forcing both sides to NONE");
                }
                self.rf.end_transmission("forced-by-global-watchdog");
                self.net.end_transmission("forced-by-global-watchdog");
                self.global_watchdog_remaining_ms = None;
            } else {
                self.global_watchdog_remaining_ms = Some(remaining);
            }
        }
    }

    fn refresh_global_watchdog(&mut self) {
        if let Some(ms) = self.config.global_watchdog_ms {
            self.global_watchdog_remaining_ms = Some(ms);
        }
    }

    /// Processes at most one queued RF-side frame.
    pub fn process_rf(&mut self) {
        if let Ok(bytes) = self.rf_rx.try_recv() {
            self.refresh_global_watchdog();
            process_one(
                &mut self.rf,
                &bytes,
                &self.config,
                Some(self.network_sink.as_ref()),
            );
        }
    }

    /// Processes at most one queued Net-side frame.
    pub fn process_net(&mut self) {
        if let Ok(bytes) = self.net_rx.try_recv() {
            self.refresh_global_watchdog();
            process_one(&mut self.net, &bytes, &self.config, Some(self.modem_sink.as_ref()));
        }
    }

    pub fn rf_state(&self) -> State {
        self.rf.state
    }

    pub fn net_state(&self) -> State {
        self.net.state
    }
}

fn tick_watchdog(
    side: &mut ControllerSide,
    elapsed_ms: u64,
    config: &ControllerConfig,
    forward_to: Option<&dyn FrameSink>,
) {
    side.watchdog_remaining_ms = side.watchdog_remaining_ms.saturating_sub(elapsed_ms);
    if side.watchdog_remaining_ms == 0 {
        warn!("{} side watchdog timed out (tx_hang={}ms)", side.label(), config.tx_hang_ms);
        side.end_transmission("watchdog-timeout");
        if side.side == Side::Rf {
            if let Some(sink) = forward_to {
                sink.forward(&SYNC_EOT);
            }
        }
    }
}

fn process_one(
    side: &mut ControllerSide,
    bytes: &[u8],
    config: &ControllerConfig,
    forward_to: Option<&dyn FrameSink>,
) {
    let kind = match classify(bytes) {
        Ok(kind) => kind,
        Err(err) => {
            warn!("{} side: dropping undecodable frame: {err}", side.label());
            return;
        }
    };

    match (side.state, kind) {
        (State::None, FrameKind::LinkSetup(lsf)) => {
            if !admit(side, &lsf, config) {
                return;
            }
            side.enter_process(lsf, config.tx_hang_ms);
            if let Some(sink) = forward_to {
                sink.forward(bytes);
            }
        }
        (State::Process, FrameKind::Stream(frame)) => {
            if let Some(fragment) = frame.lich_fragment {
                let expected = side.current_lsf.clone();
                if let Err(err) = side.lich.add(&fragment, frame.sequence as u8, expected.as_ref()) {
                    debug!("{} side: LICH fragment rejected: {err}", side.label());
                }
            }
            side.counters.frames += 1;
            side.counters.bits += (frame.payload.len() as u64) * 8;
            side.last_seq = Some(frame.sequence);
            side.watchdog_remaining_ms = config.tx_hang_ms;
            if let Some(sink) = forward_to {
                sink.forward(bytes);
            }
        }
        (State::Process, FrameKind::Eot) => {
            side.end_transmission("eot");
            if side.side == Side::Rf {
                if let Some(sink) = forward_to {
                    sink.forward(&SYNC_EOT);
                }
            }
        }
        (State::None, FrameKind::Stream(_)) | (State::None, FrameKind::Eot) => {
            debug!("{} side: dropping frame with no open transmission", side.label());
        }
        (State::Process, FrameKind::LinkSetup(_)) => {
            debug!("{} side: dropping LINK_SETUP while a transmission is open", side.label());
        }
    }
}

/// Applies the admission policy at LINK_SETUP. Returns `true` if the
/// transmission should be admitted.
fn admit(side: &ControllerSide, lsf: &Lsf, config: &ControllerConfig) -> bool {
    if config.self_only && lsf.dst_callsign != config.local_callsign {
        debug!(
            "{} side: ignoring LINK_SETUP for {} (self_only, local={})",
            side.label(),
            lsf.dst_callsign,
            config.local_callsign
        );
        return false;
    }
    if lsf.encryption_type != EncryptionType::None && !config.allow_encryption {
        warn!("{} side: ignoring encrypted LINK_SETUP (allow_encryption=false)", side.label());
        return false;
    }
    if let Some(can) = config.can_filter {
        if lsf.can != can {
            debug!("{} side: ignoring LINK_SETUP with CAN {} (expected {})", side.label(), lsf.can, can);
            return false;
        }
    }
    true
}

/// Encodes an [`Lsf`] as the 48-byte LINK_SETUP envelope this engine
/// exchanges over the network and modem queues.
pub fn encode_link_setup(lsf: &Lsf) -> Result<[u8; LINK_SETUP_ENVELOPE_LEN], crate::error::EncodeError> {
    encode_link_setup_envelope(lsf)
}
