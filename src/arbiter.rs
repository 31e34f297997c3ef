//! Host-level mode arbiter: admits at most one digital-voice mode's traffic
//! at a time onto the shared RF channel, per spec.md §4.9.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::modem::{Mode, ModemFramer};

/// Process-wide mode state. `Idle`, `Lockout`, and `Error` are not modes a
/// handle is ever registered for; they are arbiter-internal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveMode {
    Idle,
    Dstar,
    Dmr,
    Ysf,
    P25,
    Nxdn,
    M17,
    Pocsag,
    Fm,
    Ax25,
    Lockout,
    Error,
}

impl ActiveMode {
    fn from_modem_mode(mode: Mode) -> ActiveMode {
        match mode {
            Mode::Dstar => ActiveMode::Dstar,
            Mode::Dmr1 | Mode::Dmr2 => ActiveMode::Dmr,
            Mode::Ysf => ActiveMode::Ysf,
            Mode::P25 => ActiveMode::P25,
            Mode::Nxdn => ActiveMode::Nxdn,
            Mode::M17 => ActiveMode::M17,
            Mode::Pocsag => ActiveMode::Pocsag,
            Mode::Fm => ActiveMode::Fm,
            Mode::Ax25 => ActiveMode::Ax25,
        }
    }
}

/// A per-mode collaborator the arbiter forwards admitted bytes to. Concrete
/// per-mode network/controller implementations besides M17 are external
/// collaborators (spec.md §1); this trait is the seam the arbiter routes
/// through rather than a name-based lookup (spec.md §9).
pub trait ModeHandle: Send + Sync {
    /// Offers `bytes` to this mode's collaborator. Returns `true` if the
    /// collaborator admitted/consumed them.
    fn accept(&self, bytes: &[u8]) -> bool;
}

/// Stub handle for modes this crate does not implement (everything but
/// M17). Always admits, so the arbiter's single-channel exclusion logic
/// behaves as it would with a real collaborator wired in.
pub struct ExternalModeHandle;

impl ModeHandle for ExternalModeHandle {
    fn accept(&self, _bytes: &[u8]) -> bool {
        true
    }
}

/// The host-level mode arbiter.
pub struct ModeArbiter {
    mode: ActiveMode,
    mode_timer_ms: Option<u64>,
    hang_ms: HashMap<ActiveMode, u64>,
    handles: HashMap<ActiveMode, Arc<dyn ModeHandle>>,
    previously_locked_out: bool,
    previously_errored: bool,
}

impl ModeArbiter {
    pub fn new(hang_ms: HashMap<ActiveMode, u64>, handles: HashMap<ActiveMode, Arc<dyn ModeHandle>>) -> Self {
        Self {
            mode: ActiveMode::Idle,
            mode_timer_ms: None,
            hang_ms,
            handles,
            previously_locked_out: false,
            previously_errored: false,
        }
    }

    pub fn current_mode(&self) -> ActiveMode {
        self.mode
    }

    /// One arbiter tick: checks the modem's lockout/error status, polls
    /// every mode's ring buffer in [`Mode::ORDER`], and ages the hang timer.
    pub fn tick(&mut self, elapsed_ms: u64, modem: &mut ModemFramer) {
        let status = modem.status();

        if status.lockout {
            if !self.previously_locked_out {
                warn!("mode arbiter: modem reports lockout");
            }
            self.previously_locked_out = true;
            self.mode = ActiveMode::Lockout;
            return;
        }
        if self.previously_locked_out {
            self.previously_locked_out = false;
            self.mode = ActiveMode::Idle;
        }

        if status.error {
            if !self.previously_errored {
                warn!("mode arbiter: modem reports error");
            }
            self.previously_errored = true;
            self.mode = ActiveMode::Error;
            return;
        }
        if self.previously_errored {
            self.previously_errored = false;
            self.mode = ActiveMode::Idle;
        }

        for mode in Mode::ORDER {
            if let Some(bytes) = modem.read_mode(mode) {
                self.handle_bytes(ActiveMode::from_modem_mode(mode), &bytes);
            }
        }

        if let Some(remaining) = self.mode_timer_ms {
            let remaining = remaining.saturating_sub(elapsed_ms);
            if remaining == 0 {
                self.mode = ActiveMode::Idle;
                self.mode_timer_ms = None;
            } else {
                self.mode_timer_ms = Some(remaining);
            }
        }
    }

    fn handle_bytes(&mut self, mode: ActiveMode, bytes: &[u8]) {
        if self.mode == ActiveMode::Idle {
            let admitted = self
                .handles
                .get(&mode)
                .map(|handle| handle.accept(bytes))
                .unwrap_or(false);
            if admitted {
                self.mode = mode;
                self.mode_timer_ms = self.hang_ms.get(&mode).copied();
            }
            return;
        }

        if self.mode == mode {
            if let Some(handle) = self.handles.get(&mode) {
                handle.accept(bytes);
            }
            self.mode_timer_ms = self.hang_ms.get(&mode).copied();
            return;
        }

        warn!(
            "mode arbiter: dropping {} bytes for {:?}; channel held by {:?}",
            bytes.len(),
            mode,
            self.mode
        );
    }
}
