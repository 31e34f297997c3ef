//! Configuration record for the M17 engine and mode arbiter.
//!
//! INI parsing itself is an external collaborator (spec.md §1, §6); this
//! module only defines and validates the record's shape so an external
//! loader (e.g. `rust-ini`, or `serde` fronted by a TOML/INI crate) can
//! populate it directly, following the teacher crate's practice of
//! deriving `serde` on data meant to be persisted or loaded externally.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::Deserialize;

use crate::error::EncodeError;

/// The M17 network endpoint's addressing, matching spec.md §6.
#[derive(Debug, Clone, Deserialize)]
pub struct M17NetworkConfig {
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub gateway_addr: IpAddr,
    pub gateway_port: u16,
    #[serde(default)]
    pub debug: bool,
}

/// Per-mode hang timer, keyed by the mode name as it would appear in the
/// INI file (`"m17"`, `"dmr"`, `"dstar"`, …).
pub type ModeHangSeconds = HashMap<String, u16>;

/// Top-level configuration record, matching the field set enumerated in
/// spec.md §6.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub callsign: String,
    pub can: u16,
    #[serde(default)]
    pub self_only: bool,
    #[serde(default)]
    pub allow_encryption: bool,
    pub tx_hang_seconds: u16,
    pub m17_network: M17NetworkConfig,
    #[serde(default)]
    pub mode_hang_seconds: ModeHangSeconds,
}

impl GatewayConfig {
    /// Validates field ranges that would otherwise surface as confusing
    /// downstream encode/decode errors (callsign length, CAN range).
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.callsign.is_empty() || self.callsign.len() > crate::constants::CALLSIGN_LENGTH_BYTES {
            return Err(EncodeError::Field {
                field: "callsign",
                reason: format!("length {} outside 1..=6", self.callsign.len()),
            });
        }
        if !self.callsign.is_ascii() {
            return Err(EncodeError::Field {
                field: "callsign",
                reason: "non-ASCII callsign".to_string(),
            });
        }
        Ok(())
    }

    pub fn tx_hang_ms(&self) -> u64 {
        self.tx_hang_seconds as u64 * 1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GatewayConfig {
        GatewayConfig {
            callsign: "W1AW".to_string(),
            can: 1,
            self_only: false,
            allow_encryption: false,
            tx_hang_seconds: 5,
            m17_network: M17NetworkConfig {
                local_addr: "0.0.0.0".parse().unwrap(),
                local_port: 17000,
                gateway_addr: "127.0.0.1".parse().unwrap(),
                gateway_port: 17000,
                debug: false,
            },
            mode_hang_seconds: HashMap::new(),
        }
    }

    #[test]
    fn validates_legal_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_empty_callsign() {
        let mut config = sample();
        config.callsign = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn tx_hang_ms_converts_from_seconds() {
        assert_eq!(sample().tx_hang_ms(), 5_000);
    }
}
