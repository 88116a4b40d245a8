//! Loopback server stub for integration tests.
//!
//! Speaks the wire format over a real TCP listener and UDP socket so tests can
//! drive a [`GameClient`] exactly as a game server would: split or coalesce
//! frames, send broken datagrams, or drop the connection.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context};
use netcore_client::{GameClient, PumpReport};
use netcore_shared::{
    config::ClientConfig,
    encoder::encode_typed,
    message::Message,
    wire::{decode_frame, Frame, FrameHeader, HEADER_SIZE},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::{sleep, timeout, Instant};

/// How long helpers wait before failing a test.
pub const WAIT: Duration = Duration::from_secs(5);

pub struct TestServer {
    tcp: TcpListener,
    udp: UdpSocket,
    stream: Option<TcpStream>,
    udp_peer: Option<SocketAddr>,
}

/// Binds a server stub on ephemeral loopback ports and returns a client
/// config pointing at it.
pub async fn bind_ephemeral() -> anyhow::Result<(TestServer, ClientConfig)> {
    let tcp = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .context("tcp bind")?;
    let udp = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .context("udp bind")?;

    let cfg = ClientConfig {
        host: Ipv4Addr::LOCALHOST.to_string(),
        tcp_port: tcp.local_addr()?.port(),
        udp_port: udp.local_addr()?.port(),
        player_name: "TestPlayer".to_string(),
        ..ClientConfig::default()
    };

    Ok((
        TestServer {
            tcp,
            udp,
            stream: None,
            udp_peer: None,
        },
        cfg,
    ))
}

/// Connects a client to `server` and accepts its stream.
pub async fn connect_pair(
    server: &mut TestServer,
    cfg: &ClientConfig,
) -> anyhow::Result<GameClient> {
    let (client, accepted) = tokio::join!(GameClient::connect(cfg), server.accept_one());
    accepted?;
    client
}

impl TestServer {
    pub async fn accept_one(&mut self) -> anyhow::Result<()> {
        let (stream, _) = timeout(WAIT, self.tcp.accept())
            .await
            .context("accept timed out")??;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stream(&mut self) -> anyhow::Result<&mut TcpStream> {
        self.stream.as_mut().context("no client accepted")
    }

    /// Writes raw bytes on the stream.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let stream = self.stream()?;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Writes `bytes` in the given pieces, pausing between them so each piece
    /// is likely to arrive in its own read.
    pub async fn write_chunked(&mut self, bytes: &[u8], cuts: &[usize]) -> anyhow::Result<()> {
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&bytes.len())) {
            self.write_raw(&bytes[start..cut]).await?;
            start = cut;
            sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }

    pub async fn send<M: Message>(&mut self, msg: &M) -> anyhow::Result<()> {
        let frame = encode_typed(msg)?;
        self.write_raw(&frame).await
    }

    /// Reads one frame from the stream.
    pub async fn read_frame(&mut self) -> anyhow::Result<Frame> {
        let stream = self.stream()?;
        let mut header = [0u8; HEADER_SIZE];
        timeout(WAIT, stream.read_exact(&mut header))
            .await
            .context("read timed out")??;
        let length = FrameHeader::decode(&header)?.length as usize;
        if length < HEADER_SIZE {
            bail!("client sent header length {length}");
        }

        let mut buf = header.to_vec();
        buf.resize(length, 0);
        timeout(WAIT, stream.read_exact(&mut buf[HEADER_SIZE..]))
            .await
            .context("read timed out")??;
        Ok(decode_frame(&buf)?)
    }

    /// Drops the stream, which the client sees as the peer closing.
    pub fn drop_client(&mut self) {
        self.stream = None;
    }

    /// Receives one datagram and remembers who sent it.
    pub async fn recv_datagram(&mut self) -> anyhow::Result<Vec<u8>> {
        let mut buf = vec![0u8; 64 * 1024];
        let (n, from) = timeout(WAIT, self.udp.recv_from(&mut buf))
            .await
            .context("udp recv timed out")??;
        self.udp_peer = Some(from);
        buf.truncate(n);
        Ok(buf)
    }

    /// Sends raw bytes to the last datagram sender.
    pub async fn send_datagram(&self, bytes: &[u8]) -> anyhow::Result<()> {
        let peer = self.udp_peer.context("no datagram received yet")?;
        self.udp.send_to(bytes, peer).await?;
        Ok(())
    }
}

/// Pumps `client` until `done` returns true, collecting every report.
pub async fn pump_until<F>(client: &mut GameClient, mut done: F) -> anyhow::Result<Vec<PumpReport>>
where
    F: FnMut(&GameClient, &[PumpReport]) -> bool,
{
    let deadline = Instant::now() + WAIT;
    let mut reports = Vec::new();
    loop {
        reports.push(client.pump());
        if done(client, &reports) {
            return Ok(reports);
        }
        if Instant::now() >= deadline {
            bail!("condition not reached after {} pumps", reports.len());
        }
        sleep(Duration::from_millis(5)).await;
    }
}

/// Pumps for a short while regardless of what arrives.
pub async fn pump_for(client: &mut GameClient, period: Duration) -> Vec<PumpReport> {
    let deadline = Instant::now() + period;
    let mut reports = Vec::new();
    while Instant::now() < deadline {
        reports.push(client.pump());
        sleep(Duration::from_millis(5)).await;
    }
    reports
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}
