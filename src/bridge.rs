//! The concurrency hub: fans stream-client frames onto the CAN bus and CAN
//! frames back out to every connected stream client, invoking the gateway
//! responder for locally-addressed frames along the way.
//!
//! One task per TCP connection owns that connection's read half and a
//! [`TcpReplySink`] for its write half; a single task drains the CAN bus.
//! The connection set is a `tokio::sync::RwLock`-guarded map, mutated only
//! at task boundaries (insert on accept, remove on EOF/error) so a write
//! lock is never held across an await that waits on client I/O.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::{CanBus, CanFrame};
use crate::constants::reserved_node_id::MASTER;
use crate::error::StartupError;
use crate::gateway::GatewayResponder;
use crate::message::{UIMessage, FRAME_LEN};
use crate::simplecan::SimpleCanIdentifier;
use crate::transport::{ReplySink, TcpReplySink};

type ConnectionId = u64;

/// The set of currently-attached stream clients, used for CAN->stream
/// fan-out.
#[derive(Default)]
struct ConnectionSet {
    sinks: RwLock<HashMap<ConnectionId, Arc<dyn ReplySink>>>,
}

impl ConnectionSet {
    async fn insert(&self, id: ConnectionId, sink: Arc<dyn ReplySink>) {
        self.sinks.write().await.insert(id, sink);
    }

    async fn remove(&self, id: ConnectionId) {
        self.sinks.write().await.remove(&id);
    }

    /// Writes `frame` to every currently-attached client, one at a time, in
    /// the order they appear in the map. A write failure removes that
    /// client from the set rather than aborting the fan-out.
    async fn broadcast(&self, frame: &[u8; FRAME_LEN]) {
        let sinks: Vec<(ConnectionId, Arc<dyn ReplySink>)> =
            self.sinks.read().await.iter().map(|(id, sink)| (*id, sink.clone())).collect();

        let mut dead = Vec::new();
        for (id, sink) in sinks {
            if let Err(err) = sink.write_frame(frame).await {
                warn!(connection_id = id, error = %err, "fan-out write failed, dropping connection");
                dead.push(id);
            }
        }
        for id in dead {
            self.remove(id).await;
        }
    }
}

/// Owns every piece of mutable shared state: the listener, the connection
/// set, the CAN bus handle, and the single gateway responder instance. No
/// module-global singletons.
pub struct Bridge {
    listen_addr: SocketAddr,
    connections: ConnectionSet,
    can_bus: Arc<dyn CanBus>,
    gateway: Mutex<GatewayResponder>,
    next_connection_id: AtomicU64,
}

impl Bridge {
    pub fn new(listen_addr: SocketAddr, can_bus: Arc<dyn CanBus>, gateway: GatewayResponder) -> Self {
        Self {
            listen_addr,
            connections: ConnectionSet::default(),
            can_bus,
            gateway: Mutex::new(gateway),
            next_connection_id: AtomicU64::new(0),
        }
    }

    /// Runs the bridge until `shutdown` is cancelled. Accepts connections,
    /// spawns a reader task per connection, and drains the CAN bus on a
    /// dedicated task.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), StartupError> {
        let listener = TcpListener::bind(self.listen_addr)
            .await
            .map_err(|source| StartupError::Bind { addr: self.listen_addr, source })?;
        info!(addr = %self.listen_addr, "bridge listening");

        let can_task = {
            let bridge = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { bridge.drain_can_bus(shutdown).await })
        };

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(error = %err, "accept failed");
                            continue;
                        }
                    };
                    let bridge = Arc::clone(&self);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move { bridge.handle_connection(stream, peer, shutdown).await });
                }
            }
        }

        can_task.abort();
        Ok(())
    }

    async fn handle_connection(&self, stream: tokio::net::TcpStream, peer: SocketAddr, shutdown: CancellationToken) {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (mut read_half, write_half) = stream.into_split();
        let sink: Arc<dyn ReplySink> = Arc::new(TcpReplySink::new(write_half));
        self.connections.insert(connection_id, Arc::clone(&sink)).await;
        debug!(connection_id, %peer, "client connected");

        let mut buf = [0u8; FRAME_LEN];
        loop {
            let read = tokio::select! {
                _ = shutdown.cancelled() => break,
                read = read_exact_or_eof(&mut read_half, &mut buf) => read,
            };

            match read {
                Ok(true) => {
                    self.handle_stream_frame(&buf, sink.as_ref(), connection_id).await;
                }
                Ok(false) => break, // orderly close / EOF
                Err(err) => {
                    warn!(connection_id, error = %err, "transport error, closing connection");
                    break;
                }
            }
        }

        self.connections.remove(connection_id).await;
        debug!(connection_id, %peer, "client disconnected");
    }

    async fn handle_stream_frame(&self, raw: &[u8; FRAME_LEN], reply_sink: &dyn ReplySink, connection_id: ConnectionId) {
        let msg = match UIMessage::decode(raw) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(connection_id, error = %err, "dropping undecodable frame");
                return;
            }
        };

        // Invoke the gateway responder; any reply goes back to this client
        // only.
        let reply = self.gateway.lock().await.handle_message(&msg);
        if let Some(reply) = reply {
            if let Err(err) = reply_sink.write_frame(&reply.encode()).await {
                warn!(connection_id, error = %err, "failed to write gateway reply");
            }
        }

        // Independently — regardless of whether the gateway handled it —
        // translate to SimpleCAN and publish. The bridge is promiscuous;
        // only the simulated device is selective.
        let identifier = SimpleCanIdentifier::new(
            MASTER,
            msg.device_id,
            ((msg.need_ack as u8) << 7) | (msg.function_code & 0x7F),
        );
        let frame = CanFrame::new(identifier.pack(), msg.data.clone());
        if let Err(err) = self.can_bus.send(frame).await {
            warn!(connection_id, error = %err, "CAN publish failed");
        }
    }

    async fn drain_can_bus(&self, shutdown: CancellationToken) {
        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => break,
                frame = self.can_bus.recv() => frame,
            };

            match frame {
                Ok(Some(frame)) => self.handle_can_frame(frame).await,
                Ok(None) => break, // bus shut down, no further frames
                Err(err) => {
                    error!(error = %err, "CAN bus recv error");
                    break;
                }
            }
        }
    }

    async fn handle_can_frame(&self, frame: CanFrame) {
        let identifier = SimpleCanIdentifier::unpack(frame.arbitration_id);
        let need_ack = identifier.control_word & 0x80 != 0;
        let function_code = identifier.control_word & 0x7F;

        let msg = UIMessage::response(identifier.producer_id, function_code, frame.data);
        let msg = UIMessage { need_ack, ..msg };

        // Broadcast regardless of device_id — CAN-ingress fan-out is
        // unconditional, unlike the gateway's own addressing filter.
        self.connections.broadcast(&msg.encode()).await;
    }
}

/// Reads exactly `buf.len()` bytes, or reports a clean EOF if the peer
/// closes before sending anything. A partial read followed by close is
/// treated the same as a clean EOF by [`tokio::io::AsyncReadExt::read_exact`]
/// only when zero bytes have been read so far; anything in between
/// surfaces as an `UnexpectedEof` error, which the caller logs and treats
/// as a transport error.
async fn read_exact_or_eof<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8; FRAME_LEN],
) -> std::io::Result<bool> {
    let mut read_total = 0;
    while read_total < buf.len() {
        let n = reader.read(&mut buf[read_total..]).await?;
        if n == 0 {
            return if read_total == 0 {
                Ok(false)
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "partial frame at EOF"))
            };
        }
        read_total += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LoopbackCanBus;
    use crate::constants::GatewayModel;
    use crate::gateway::{GatewayState, UIM2523};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn spawn_bridge() -> (SocketAddr, Arc<LoopbackCanBus>, CancellationToken) {
        let can_bus = Arc::new(LoopbackCanBus::new());
        let gateway =
            GatewayResponder::new(GatewayModel::Uim2523, GatewayState::new(UIM2523, UIM2523, 2 /* Kbps500 */, 1234512345, 0x4141, 0x4242));
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        // Bind once here to learn the ephemeral port, then hand the bound
        // listener's address to the bridge's own bind.
        let probe = TcpListener::bind(addr).await.unwrap();
        let bound_addr = probe.local_addr().unwrap();
        drop(probe);

        let bridge = Arc::new(Bridge::new(bound_addr, can_bus.clone(), gateway));
        let shutdown = CancellationToken::new();
        let run_bridge = Arc::clone(&bridge);
        let run_shutdown = shutdown.clone();
        tokio::spawn(async move { run_bridge.run(run_shutdown).await.unwrap() });

        // Give the listener a moment to actually bind.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        (bound_addr, can_bus, shutdown)
    }

    #[tokio::test]
    async fn s1_get_model_round_trips_over_tcp() {
        let (addr, _can_bus, shutdown) = spawn_bridge().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let request = UIMessage {
            device_id: 2,
            function_code: 0x0B,
            need_ack: true,
            need_checksum: true,
            data: vec![],
            aux_byte: 0,
            checksum: 0,
            som: 0xAA,
        };
        stream.write_all(&request.encode()).await.unwrap();

        let mut response = [0u8; FRAME_LEN];
        tokio::time::timeout(std::time::Duration::from_secs(1), stream.read_exact(&mut response))
            .await
            .unwrap()
            .unwrap();

        let decoded = UIMessage::decode(&response).unwrap();
        assert_eq!(decoded.data, vec![0x19, 0x17, 0x00, 0x00, 0x69, 0x7A, 0x00, 0x00]);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn s4_unaddressed_message_gets_no_reply() {
        let (addr, _can_bus, shutdown) = spawn_bridge().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let request = UIMessage {
            device_id: 99,
            function_code: 0x0B,
            need_ack: true,
            need_checksum: true,
            data: vec![],
            aux_byte: 0,
            checksum: 0,
            som: 0xAA,
        };
        stream.write_all(&request.encode()).await.unwrap();

        let mut response = [0u8; FRAME_LEN];
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(200), stream.read_exact(&mut response)).await;
        assert!(result.is_err(), "expected a timeout, got a reply");
        shutdown.cancel();
    }

    #[tokio::test]
    async fn s5_bad_checksum_is_dropped_and_connection_stays_open() {
        let (addr, _can_bus, shutdown) = spawn_bridge().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let request = UIMessage {
            device_id: 2,
            function_code: 0x0B,
            need_ack: true,
            need_checksum: true,
            data: vec![],
            aux_byte: 0,
            checksum: 0,
            som: 0xAA,
        };
        let mut bad_frame = request.encode();
        bad_frame[3] ^= 0x01; // corrupt data_length without fixing the CRC
        stream.write_all(&bad_frame).await.unwrap();

        let mut response = [0u8; FRAME_LEN];
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(200), stream.read_exact(&mut response))
                .await
                .is_err();
        assert!(timed_out, "bad-checksum frame should not produce a reply");

        // Connection is still open: a subsequent valid frame still works.
        let good = UIMessage { data: vec![], ..request };
        stream.write_all(&good.encode()).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), stream.read_exact(&mut response))
            .await
            .unwrap()
            .unwrap();
        shutdown.cancel();
    }

    /// S6 — a CAN frame fans out identically to every connected client.
    #[tokio::test]
    async fn s6_can_frame_fans_out_to_all_stream_clients() {
        let (addr, can_bus, shutdown) = spawn_bridge().await;
        let mut client_a = TcpStream::connect(addr).await.unwrap();
        let mut client_b = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let identifier = SimpleCanIdentifier::new(7, 0, 0x0F);
        can_bus.inject(CanFrame::new(identifier.pack(), vec![0xDE, 0xAD]));

        let mut buf_a = [0u8; FRAME_LEN];
        let mut buf_b = [0u8; FRAME_LEN];
        tokio::time::timeout(std::time::Duration::from_secs(1), client_a.read_exact(&mut buf_a))
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), client_b.read_exact(&mut buf_b))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(buf_a, buf_b);
        let decoded = UIMessage::decode(&buf_a).unwrap();
        assert_eq!(decoded.device_id, 7);
        assert_eq!(decoded.function_code, 0x0F);
        assert!(!decoded.need_ack);
        assert_eq!(decoded.data, vec![0xDE, 0xAD]);
        shutdown.cancel();
    }

    /// Unit-level: drives `handle_stream_frame` directly so the assertion
    /// can read the published CAN frame without racing the bridge's own
    /// CAN-drain task for the same channel receiver.
    #[tokio::test]
    async fn stream_frame_is_always_translated_to_can_regardless_of_addressing() {
        let can_bus = Arc::new(LoopbackCanBus::new());
        let gateway =
            GatewayResponder::new(GatewayModel::Uim2523, GatewayState::new(UIM2523, UIM2523, 2 /* Kbps500 */, 1234512345, 0x4141, 0x4242));
        let bridge = Bridge::new("127.0.0.1:0".parse().unwrap(), can_bus.clone(), gateway);

        // device_id 99 is not addressed to the gateway, but must still be
        // published onto the CAN bus (bridge is promiscuous).
        let request = UIMessage {
            device_id: 99,
            function_code: 0x0B,
            need_ack: true,
            need_checksum: true,
            data: vec![],
            aux_byte: 0,
            checksum: 0,
            som: 0xAA,
        };
        let sink = crate::transport::RecordingReplySink::default();
        bridge.handle_stream_frame(&request.encode(), &sink, 0).await;
        assert!(sink.frames.lock().await.is_empty(), "device 99 should get no gateway reply");

        let published = can_bus.recv().await.unwrap().unwrap();
        let identifier = SimpleCanIdentifier::unpack(published.arbitration_id);
        assert_eq!(identifier.producer_id, MASTER);
        assert_eq!(identifier.consumer_id, 99);
    }
}
