//! Transport: one socket, one reader task, one writer task.
//!
//! A [`Connection`] owns either a TCP stream or a connected UDP socket. The
//! reader task turns incoming bytes into frames and posts them to its bridge
//! lane. Sends never touch the socket: they hand the encoded frame to a
//! bounded queue that the writer task drains, so a peer that stops reading
//! stalls only the writer.
//!
//! Closing is synchronous and idempotent. It flips the liveness flag once and
//! wakes both tasks through a `watch` channel. A write failure closes the
//! connection and the reader reports it as the disconnect reason.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use bytes::Bytes;
use netcore_shared::{
    assembler::{decode_datagram, StreamAssembler},
    config::ClientConfig,
    encoder::{encode_empty, encode_typed},
    error::{NetError, Result},
    message::Message,
    wire::{Protocol, HEADER_SIZE},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::bridge::BridgeSender;

/// Bytes requested per stream read.
const READ_CHUNK: usize = 4096;

enum Writer {
    Stream(OwnedWriteHalf),
    Datagram(Arc<UdpSocket>),
}

impl Writer {
    /// Sends one whole frame. Stream writes retry partial writes internally.
    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        match self {
            Writer::Stream(half) => half.write_all(frame).await.map_err(NetError::WriteFailed),
            Writer::Datagram(socket) => {
                let sent = socket.send(frame).await.map_err(NetError::WriteFailed)?;
                if sent != frame.len() {
                    return Err(NetError::WriteFailed(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short datagram send: {sent} of {} bytes", frame.len()),
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Resolves once the shutdown flag is set.
async fn closed(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let closed = *shutdown.borrow_and_update();
        if closed || shutdown.changed().await.is_err() {
            return;
        }
    }
}

struct Inner {
    protocol: Protocol,
    remote: SocketAddr,
    local: SocketAddr,
    alive: AtomicBool,
    queue: mpsc::Sender<Bytes>,
    /// First write failure, picked up by the reader when it reports.
    fault: Mutex<Option<NetError>>,
    shutdown: watch::Sender<bool>,
}

/// A live (or closed) connection to the server. Cheap to clone.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("protocol", &self.inner.protocol)
            .field("remote", &self.inner.remote)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Connection {
    /// Connects and starts the reader and writer tasks.
    pub async fn connect(
        protocol: Protocol,
        remote: SocketAddr,
        bridge: BridgeSender,
        cfg: &ClientConfig,
    ) -> anyhow::Result<Self> {
        match protocol {
            Protocol::Reliable => {
                let stream = TcpStream::connect(remote)
                    .await
                    .with_context(|| format!("tcp connect {remote}"))?;
                stream.set_nodelay(true).context("tcp nodelay")?;
                let local = stream.local_addr().context("tcp local_addr")?;
                let (read, write) = stream.into_split();

                let (conn, queue) = Self::new(protocol, remote, local, cfg.send_queue_capacity);
                tokio::spawn(conn.clone().write_frames(Writer::Stream(write), queue));
                tokio::spawn(conn.clone().read_stream(read, bridge));
                info!(%protocol, %remote, %local, "Connected");
                Ok(conn)
            }
            Protocol::Unreliable => {
                let bind: SocketAddr = if remote.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(bind).await.context("udp bind")?;
                socket
                    .connect(remote)
                    .await
                    .with_context(|| format!("udp connect {remote}"))?;
                let local = socket.local_addr().context("udp local_addr")?;
                let socket = Arc::new(socket);

                let (conn, queue) = Self::new(protocol, remote, local, cfg.send_queue_capacity);
                tokio::spawn(
                    conn.clone()
                        .write_frames(Writer::Datagram(Arc::clone(&socket)), queue),
                );
                tokio::spawn(
                    conn.clone()
                        .read_datagrams(socket, bridge, cfg.max_datagram_size),
                );
                info!(%protocol, %remote, %local, "Connected");
                Ok(conn)
            }
        }
    }

    fn new(
        protocol: Protocol,
        remote: SocketAddr,
        local: SocketAddr,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let (shutdown, _) = watch::channel(false);
        let (queue, frames) = mpsc::channel(queue_capacity.max(1));
        let conn = Self {
            inner: Arc::new(Inner {
                protocol,
                remote,
                local,
                alive: AtomicBool::new(true),
                queue,
                fault: Mutex::new(None),
                shutdown,
            }),
        };
        (conn, frames)
    }

    pub fn protocol(&self) -> Protocol {
        self.inner.protocol
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Closes the connection. Returns `true` for the call that actually
    /// closed it; later calls are no-ops. Frames still queued are dropped.
    pub fn close(&self) -> bool {
        if !self.inner.alive.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.inner.shutdown.send_replace(true);
        debug!(protocol = %self.inner.protocol, remote = %self.inner.remote, "Connection closed");
        true
    }

    /// Records a write failure, then closes.
    fn fail(&self, error: NetError) {
        if let Ok(mut fault) = self.inner.fault.lock() {
            if fault.is_none() {
                *fault = Some(error);
            }
        }
        self.close();
    }

    fn take_fault(&self) -> Option<NetError> {
        self.inner.fault.lock().ok().and_then(|mut fault| fault.take())
    }

    /// Queues one fully encoded frame for the writer task. Never waits.
    ///
    /// `Ok` means the frame was queued, not that it reached the peer; a
    /// later write failure shows up as this connection's disconnect reason.
    pub fn send_frame(&self, frame: Bytes) -> Result<()> {
        if !self.is_alive() {
            return Err(NetError::Closed);
        }
        match self.inner.queue.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NetError::SendQueueFull),
            Err(TrySendError::Closed(_)) => Err(NetError::Closed),
        }
    }

    /// Encodes and queues a typed message.
    pub fn send_typed<M: Message>(&self, msg: &M) -> Result<()> {
        self.send_frame(encode_typed(msg)?)
    }

    /// Queues a header-only notification.
    pub fn send_empty(&self, kind: impl Into<u16>) -> Result<()> {
        self.send_frame(encode_empty(kind.into())?)
    }

    async fn write_frames(self, mut writer: Writer, mut frames: mpsc::Receiver<Bytes>) {
        let protocol = self.inner.protocol;
        let mut shutdown = self.inner.shutdown.subscribe();

        loop {
            let frame = tokio::select! {
                biased;
                _ = closed(&mut shutdown) => break,
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            let res = tokio::select! {
                biased;
                _ = closed(&mut shutdown) => break,
                res = writer.write_frame(&frame) => res,
            };
            match res {
                Ok(()) => trace!(%protocol, bytes = frame.len(), "Sent frame"),
                Err(e) => {
                    warn!(%protocol, error = %e, "Send failed");
                    self.fail(e);
                    break;
                }
            }
        }
        debug!(%protocol, "Writer stopped");
    }

    async fn read_stream(self, mut read: OwnedReadHalf, bridge: BridgeSender) {
        let protocol = self.inner.protocol;
        let mut shutdown = self.inner.shutdown.subscribe();
        let mut assembler = StreamAssembler::new();
        let mut buf = vec![0u8; READ_CHUNK];

        let reason = 'read: loop {
            let n = tokio::select! {
                _ = closed(&mut shutdown) => break None,
                res = read.read(&mut buf) => match res {
                    Ok(0) => {
                        if !assembler.is_idle() {
                            debug!(%protocol, "Peer closed mid-frame");
                        }
                        break Some(NetError::peer_closed());
                    }
                    Ok(n) => n,
                    Err(e) => break Some(NetError::ReadFailed(e)),
                },
            };
            trace!(%protocol, bytes = n, "Read chunk");

            let frames = match assembler.push(&buf[..n]) {
                Ok(frames) => frames,
                Err(e) => break Some(e),
            };
            for frame in frames {
                if !bridge.post_frame(protocol, frame).await {
                    break 'read None;
                }
            }
        };

        self.finish(reason, &bridge).await;
    }

    async fn read_datagrams(
        self,
        socket: Arc<UdpSocket>,
        bridge: BridgeSender,
        max_datagram_size: usize,
    ) {
        let protocol = self.inner.protocol;
        let mut shutdown = self.inner.shutdown.subscribe();
        let mut buf = vec![0u8; max_datagram_size.max(HEADER_SIZE)];

        let reason = loop {
            let n = tokio::select! {
                _ = closed(&mut shutdown) => break None,
                res = socket.recv(&mut buf) => match res {
                    Ok(n) => n,
                    Err(e) => break Some(NetError::ReadFailed(e)),
                },
            };

            match decode_datagram(&buf[..n]) {
                Ok(frame) => {
                    if !bridge.post_frame(protocol, frame).await {
                        break None;
                    }
                }
                Err(reason) => debug!(%protocol, %reason, "Dropped datagram"),
            }
        };

        self.finish(reason, &bridge).await;
    }

    /// Reader exit path: close, then report exactly once. A write failure
    /// that caused the close is the reason when the reader saw none.
    async fn finish(&self, reason: Option<NetError>, bridge: &BridgeSender) {
        let protocol = self.inner.protocol;
        self.close();
        let reason = reason.or_else(|| self.take_fault());
        match &reason {
            Some(e) => warn!(%protocol, remote = %self.inner.remote, error = %e, "Connection lost"),
            None => debug!(%protocol, "Reader stopped"),
        }
        bridge.post_disconnect(protocol, reason).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeEvent, BridgeReceiver};
    use netcore_shared::message::{MessageKind, SendChatMessage};
    use netcore_shared::wire::decode_frame;
    use tokio::net::TcpListener;

    async fn tcp_pair_with(cfg: &ClientConfig) -> (Connection, BridgeReceiver, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut rx = BridgeReceiver::new(16);
        let tx = rx.open();
        let (conn, accepted) = tokio::join!(
            Connection::connect(Protocol::Reliable, addr, tx, cfg),
            listener.accept()
        );
        (conn.unwrap(), rx, accepted.unwrap().0)
    }

    async fn tcp_pair() -> (Connection, BridgeReceiver, TcpStream) {
        tcp_pair_with(&ClientConfig::default()).await
    }

    #[tokio::test]
    async fn split_frame_arrives_whole() {
        let (_conn, mut rx, mut peer) = tcp_pair().await;

        let frame = [9u8, 0, 5, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD];
        peer.write_all(&frame[..3]).await.unwrap();
        peer.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        peer.write_all(&frame[3..]).await.unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::Frame { protocol, frame } => {
                assert_eq!(protocol, Protocol::Reliable);
                assert_eq!(frame.kind(), 5);
                assert_eq!(&frame.payload[..], &[0xAA, 0xBB, 0xCC, 0xDD]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn peer_close_reports_read_failure_once() {
        let (conn, mut rx, peer) = tcp_pair().await;
        drop(peer);

        match rx.recv().await.unwrap() {
            BridgeEvent::Disconnected { protocol, reason } => {
                assert_eq!(protocol, Protocol::Reliable);
                assert!(matches!(reason, Some(NetError::ReadFailed(_))));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!conn.is_alive());
        assert!(rx.try_next().is_none());
    }

    #[tokio::test]
    async fn short_header_length_is_fatal() {
        let (_conn, mut rx, mut peer) = tcp_pair().await;
        peer.write_all(&[3, 0, 1, 0, 0]).await.unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::Disconnected { reason, .. } => {
                assert!(matches!(reason, Some(NetError::ProtocolViolation(_))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_sends() {
        let (conn, mut rx, _peer) = tcp_pair().await;

        assert!(conn.close());
        assert!(!conn.close());
        assert!(matches!(
            conn.send_empty(MessageKind::InventoryInfoRequest),
            Err(NetError::Closed)
        ));

        match rx.recv().await.unwrap() {
            BridgeEvent::Disconnected { reason, .. } => assert!(reason.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn typed_send_reaches_peer() {
        let (conn, _rx, mut peer) = tcp_pair().await;
        conn.send_typed(&SendChatMessage {
            message: "gg".into(),
        })
        .unwrap();

        let mut buf = vec![0u8; 5 + 64];
        peer.read_exact(&mut buf).await.unwrap();
        let frame = decode_frame(&buf).unwrap();
        assert_eq!(frame.kind(), MessageKind::SendChatMessage.id());
        assert_eq!(
            SendChatMessage::decode(&frame.payload).unwrap().message,
            "gg"
        );
    }

    #[tokio::test]
    async fn full_queue_is_reported_without_closing() {
        let cfg = ClientConfig {
            send_queue_capacity: 1,
            ..ClientConfig::default()
        };
        let (conn, _rx, mut peer) = tcp_pair_with(&cfg).await;

        // Nothing yields in between, so the writer task has not taken the
        // first frame yet.
        conn.send_empty(MessageKind::InventoryInfoRequest).unwrap();
        assert!(matches!(
            conn.send_empty(MessageKind::InventoryInfoRequest),
            Err(NetError::SendQueueFull)
        ));
        assert!(conn.is_alive());

        let mut buf = [0u8; HEADER_SIZE];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(
            decode_frame(&buf).unwrap().kind(),
            MessageKind::InventoryInfoRequest.id()
        );
        conn.send_empty(MessageKind::InventoryInfoRequest).unwrap();
    }

    #[tokio::test]
    async fn write_failure_becomes_disconnect_reason() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut rx = BridgeReceiver::new(16);
        let conn = Connection::connect(
            Protocol::Unreliable,
            peer.local_addr().unwrap(),
            rx.open(),
            &ClientConfig::default(),
        )
        .await
        .unwrap();

        // Larger than any datagram the socket will carry.
        conn.send_frame(Bytes::from(vec![0u8; 70_000])).unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::Disconnected { protocol, reason } => {
                assert_eq!(protocol, Protocol::Unreliable);
                assert!(matches!(reason, Some(NetError::WriteFailed(_))));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!conn.is_alive());
    }

    #[tokio::test]
    async fn datagrams_validate_standalone() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut rx = BridgeReceiver::new(16);
        let conn = Connection::connect(
            Protocol::Unreliable,
            peer.local_addr().unwrap(),
            rx.open(),
            &ClientConfig::default(),
        )
        .await
        .unwrap();
        let client = conn.local_addr();
        let client = SocketAddr::new(peer.local_addr().unwrap().ip(), client.port());

        // Runt, then truncated, then a good one.
        peer.send_to(&[1, 2, 3], client).await.unwrap();
        peer.send_to(&[20, 0, 5, 0, 0, 1, 2], client).await.unwrap();
        peer.send_to(&[9, 0, 5, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD], client)
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            BridgeEvent::Frame { protocol, frame } => {
                assert_eq!(protocol, Protocol::Unreliable);
                assert_eq!(&frame.payload[..], &[0xAA, 0xBB, 0xCC, 0xDD]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(conn.is_alive());
    }
}
