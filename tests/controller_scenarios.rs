//! End-to-end controller scenarios from spec.md §8 (S1-S3, S6), exercised
//! through the crate's public API.

use std::sync::{Arc, Mutex};

use m17_gateway::m17::controller::{encode_link_setup, FrameSink, NullSink};
use m17_gateway::m17::frame::{self, StreamFrame};
use m17_gateway::m17::lsf::{DataType, EncryptionSubType, EncryptionType, Lsf, PacketType};
use m17_gateway::{ControllerConfig, M17Controller};

struct RecordingSink {
    received: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl FrameSink for RecordingSink {
    fn forward(&self, bytes: &[u8]) {
        self.received.lock().unwrap().push(bytes.to_vec());
    }
}

fn sample_lsf() -> Lsf {
    Lsf {
        dst_callsign: "ALL".to_string(),
        src_callsign: "W1AW".to_string(),
        packet_type: PacketType::Stream,
        data_type: DataType::Voice,
        encryption_type: EncryptionType::None,
        encryption_subtype: EncryptionSubType::Text,
        can: 1,
        meta: [0u8; m17_gateway::constants::LSF_META_LENGTH_BYTES],
    }
}

fn config() -> ControllerConfig {
    ControllerConfig {
        local_callsign: "ALL".to_string(),
        self_only: false,
        allow_encryption: false,
        can_filter: None,
        tx_hang_ms: 1_000,
        global_watchdog_ms: Some(10_000),
    }
}

#[test]
fn s1_clean_stream_end_to_end() {
    let sink = RecordingSink::new();
    let mut controller = M17Controller::new(config(), sink.clone(), Arc::new(NullSink));

    let envelope = encode_link_setup(&sample_lsf()).unwrap();
    assert!(controller.write_rf(&envelope));
    controller.process_rf();

    for seq in 0..10u16 {
        let frame = StreamFrame {
            sequence: seq,
            is_last: seq == 9,
            lich_fragment: if seq < 6 { Some([0u8; 4]) } else { None },
            payload: [0x11; 16],
        };
        let wire = frame::encode(&frame).unwrap();
        assert!(controller.write_rf(&wire));
        controller.process_rf();
    }

    assert!(controller.write_rf(&m17_gateway::constants::SYNC_EOT));
    controller.process_rf();

    assert_eq!(sink.count(), 12);
}

#[test]
fn s2_bad_crc_never_transitions() {
    let sink = RecordingSink::new();
    let mut controller = M17Controller::new(config(), sink.clone(), Arc::new(NullSink));

    let mut envelope = encode_link_setup(&sample_lsf()).unwrap();
    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;

    assert!(controller.write_rf(&envelope));
    controller.process_rf();

    assert_eq!(sink.count(), 0);
}

#[test]
fn s3_encryption_not_allowed_is_ignored() {
    let sink = RecordingSink::new();
    let mut controller = M17Controller::new(config(), sink.clone(), Arc::new(NullSink));

    let mut lsf = sample_lsf();
    lsf.encryption_type = EncryptionType::Aes;
    let envelope = encode_link_setup(&lsf).unwrap();

    assert!(controller.write_rf(&envelope));
    controller.process_rf();

    assert_eq!(sink.count(), 0);
}

#[test]
fn s6_watchdog_timeout_forwards_a_single_eot() {
    let sink = RecordingSink::new();
    let mut controller = M17Controller::new(config(), sink.clone(), Arc::new(NullSink));

    let envelope = encode_link_setup(&sample_lsf()).unwrap();
    assert!(controller.write_rf(&envelope));
    controller.process_rf();

    controller.clock(1_100);

    let received = sink.received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received.last().unwrap().as_slice(), &m17_gateway::constants::SYNC_EOT);
}
