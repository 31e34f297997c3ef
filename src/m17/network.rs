//! M17 UDP gateway transport: ping/keepalive, peer binding, and the
//! non-blocking receive pump described in spec.md §4.7.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::constants::{NETWORK_INBOUND_QUEUE_DEPTH, NETWORK_RECV_TIMEOUT_MS, PING_INTERVAL_MS, PING_TAG};
use crate::error::TransportError;
use crate::m17::controller::FrameSink;

/// Builds a 3-byte ping/ping-ack datagram carrying `out_id`.
fn ping_datagram(out_id: u16) -> [u8; 3] {
    let [hi, lo] = out_id.to_be_bytes();
    [PING_TAG, hi, lo]
}

struct EndpointState {
    out_id: u16,
    connected: bool,
    last_ping_ms: u64,
}

/// A UDP endpoint bound to a single M17 peer (the gateway/reflector).
///
/// Owns the socket and its receive worker exclusively; forwards accepted
/// application frames into a bounded inbound queue that `read()` drains.
pub struct M17NetworkEndpoint {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    state: Mutex<EndpointState>,
    inbound_tx: mpsc::Sender<Vec<u8>>,
    inbound_rx: Mutex<mpsc::Receiver<Vec<u8>>>,
    connected: Arc<AtomicBool>,
    enabled: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
}

impl M17NetworkEndpoint {
    /// Binds a UDP socket at `local_addr` and configures `peer` as the
    /// expected gateway address. Does not send anything until `clock` is
    /// first called with pings enabled.
    pub async fn bind(local_addr: SocketAddr, peer: SocketAddr) -> Result<Arc<Self>, TransportError> {
        let socket = UdpSocket::bind(local_addr).await?;
        let (inbound_tx, inbound_rx) = mpsc::channel(NETWORK_INBOUND_QUEUE_DEPTH);
        let out_id = rand::thread_rng().gen();

        let endpoint = Arc::new(Self {
            socket: Arc::new(socket),
            peer,
            state: Mutex::new(EndpointState {
                out_id,
                connected: false,
                last_ping_ms: 0,
            }),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            connected: Arc::new(AtomicBool::new(false)),
            enabled: AtomicBool::new(true),
            worker: Mutex::new(None),
            running: Arc::new(AtomicBool::new(true)),
        });

        let handle = endpoint.clone().spawn_receive_worker();
        *endpoint.worker.lock().await = Some(handle);

        Ok(endpoint)
    }

    fn spawn_receive_worker(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; crate::constants::FRAME_LENGTH_BYTES + 16];
            while self.running.load(Ordering::Relaxed) {
                let recv = tokio::time::timeout(
                    std::time::Duration::from_millis(NETWORK_RECV_TIMEOUT_MS),
                    self.socket.recv_from(&mut buf),
                )
                .await;

                let (n, from) = match recv {
                    Ok(Ok(pair)) => pair,
                    Ok(Err(err)) => {
                        warn!("m17 network recv error: {err}");
                        continue;
                    }
                    Err(_timeout) => continue,
                };

                if from != self.peer {
                    debug!("m17 network: dropping datagram from unexpected peer {from}");
                    continue;
                }

                if n == 0 {
                    continue;
                }

                if buf[0] == PING_TAG {
                    self.connected.store(true, Ordering::Relaxed);
                    let mut state = self.state.lock().await;
                    state.connected = true;
                    continue;
                }

                if self.inbound_tx.try_send(buf[..n].to_vec()).is_err() {
                    debug!("m17 network: inbound queue full, dropping newest arrival");
                }
            }
        })
    }

    /// Advances the keepalive clock. Sends a ping datagram every
    /// [`PING_INTERVAL_MS`] while the endpoint is enabled.
    pub async fn clock(&self, elapsed_ms: u64) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        let mut state = self.state.lock().await;
        state.last_ping_ms += elapsed_ms;
        if state.last_ping_ms >= PING_INTERVAL_MS {
            state.last_ping_ms = 0;
            let datagram = ping_datagram(state.out_id);
            drop(state);
            if let Err(err) = self.socket.send_to(&datagram, self.peer).await {
                warn!("m17 network: ping send failed: {err}");
            }
        }
    }

    /// Sends `bytes` to the configured peer, if enabled. No-op otherwise.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Err(TransportError::NotConnected);
        }
        self.socket.send_to(bytes, self.peer).await?;
        Ok(())
    }

    /// Returns the next queued inbound application frame, if any, without
    /// blocking.
    pub async fn read(&self) -> Option<Vec<u8>> {
        self.inbound_rx.lock().await.try_recv().ok()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Returns the local address the endpoint's socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Regenerates `out_id`, clears the inbound queue, and clears
    /// `connected`.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.out_id = rand::thread_rng().gen();
        state.connected = false;
        state.last_ping_ms = 0;
        self.connected.store(false, Ordering::Relaxed);
        let mut rx = self.inbound_rx.lock().await;
        while rx.try_recv().is_ok() {}
    }

    /// Stops the receive worker and joins it. The socket is dropped
    /// afterwards.
    pub async fn close(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
        info!("m17 network endpoint closed");
    }
}

/// Adapts an endpoint as a [`FrameSink`] so the controller can forward
/// accepted RF-side frames onward without depending on the transport type.
pub struct NetworkFrameSink {
    endpoint: Arc<M17NetworkEndpoint>,
    handle: tokio::runtime::Handle,
}

impl NetworkFrameSink {
    pub fn new(endpoint: Arc<M17NetworkEndpoint>) -> Self {
        Self {
            endpoint,
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl FrameSink for NetworkFrameSink {
    fn forward(&self, bytes: &[u8]) {
        if !self.endpoint.is_connected() {
            return;
        }
        let endpoint = self.endpoint.clone();
        let bytes = bytes.to_vec();
        self.handle.spawn(async move {
            if let Err(err) = endpoint.write(&bytes).await {
                warn!("m17 network: forward failed: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_datagram_shape() {
        let datagram = ping_datagram(0x1234);
        assert_eq!(datagram.len(), 3);
        assert_eq!(datagram[0], PING_TAG);
        assert_eq!(datagram[1], 0x12);
        assert_eq!(datagram[2], 0x34);
    }

    #[tokio::test]
    async fn s5_keepalive_sends_one_ping() {
        let gateway = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let gateway_addr = gateway.local_addr().unwrap();

        let endpoint = M17NetworkEndpoint::bind("127.0.0.1:0".parse().unwrap(), gateway_addr)
            .await
            .unwrap();

        endpoint.clock(PING_INTERVAL_MS).await;

        let mut buf = [0u8; 16];
        let (n, from) = tokio::time::timeout(std::time::Duration::from_secs(1), gateway.recv_from(&mut buf))
            .await
            .expect("ping not received")
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf[0], PING_TAG);
        assert!(!endpoint.is_connected());

        gateway.send_to(&ping_datagram(0xBEEF), from).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(endpoint.is_connected());

        endpoint.close().await;
    }

    #[tokio::test]
    async fn foreign_peer_datagrams_are_discarded() {
        let endpoint_peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = endpoint_peer.local_addr().unwrap();

        let endpoint = M17NetworkEndpoint::bind("127.0.0.1:0".parse().unwrap(), peer_addr)
            .await
            .unwrap();

        let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        stranger
            .send_to(&[0x01, 0x02, 0x03], endpoint.socket.local_addr().unwrap())
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(endpoint.read().await.is_none());

        endpoint.close().await;
    }
}
