//! Client implementation.
//!
//! The client maintains:
//! - A reliable connection (login, match, combat, inventory, quests)
//! - An unreliable connection (movement and patrol updates)
//! - One receiver registry per connection
//! - The dispatch bridge, one lane per reader task
//! - An outbox consumers fill while handling frames
//!
//! Everything except the connection tasks runs on the host task, one
//! [`GameClient::pump`] per tick. Nothing here waits on a socket: sends hand
//! frames to each connection's writer task and return at once.

use anyhow::Context;
use netcore_shared::{
    config::ClientConfig,
    encoder::Outbox,
    error::{NetError, Result},
    message::{Message, MessageKind},
    wire::Protocol,
};
use tracing::{info, warn};

use crate::{
    bridge::{BridgeEvent, BridgeReceiver},
    registry::{ReceiverHandle, ReceiverRegistry},
    transport::Connection,
};

/// A connection that went away during a pump.
#[derive(Debug)]
pub struct Disconnect {
    pub protocol: Protocol,
    /// `None` when the connection was closed locally.
    pub reason: Option<NetError>,
}

/// What one host tick did.
#[derive(Debug, Default)]
pub struct PumpReport {
    /// Frames handed to receivers.
    pub frames: usize,
    /// Queued frames handed to a connection's writer.
    pub sent: usize,
    /// Queued frames refused because the connection was closed or behind.
    pub send_failures: usize,
    pub disconnected: Vec<Disconnect>,
}

impl PumpReport {
    pub fn lost(&self, protocol: Protocol) -> bool {
        self.disconnected.iter().any(|d| d.protocol == protocol)
    }
}

/// High-level game client.
pub struct GameClient {
    reliable: Connection,
    unreliable: Connection,
    reliable_receivers: ReceiverRegistry,
    unreliable_receivers: ReceiverRegistry,
    events: BridgeReceiver,
    outbox: Outbox,
}

impl GameClient {
    /// Connects both transports. Nothing is sent yet.
    pub async fn connect(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let tcp = cfg
            .endpoint(Protocol::Reliable)
            .context("resolve tcp endpoint")?;
        let udp = cfg
            .endpoint(Protocol::Unreliable)
            .context("resolve udp endpoint")?;
        info!(host = %cfg.host, %tcp, %udp, "Connecting to server");

        let mut events = BridgeReceiver::new(cfg.bridge_capacity);
        let reliable = Connection::connect(Protocol::Reliable, tcp, events.open(), cfg).await?;
        let unreliable =
            match Connection::connect(Protocol::Unreliable, udp, events.open(), cfg).await {
                Ok(conn) => conn,
                Err(e) => {
                    reliable.close();
                    return Err(e);
                }
            };

        Ok(Self {
            reliable,
            unreliable,
            reliable_receivers: ReceiverRegistry::new(),
            unreliable_receivers: ReceiverRegistry::new(),
            events,
            outbox: Outbox::new(),
        })
    }

    pub fn connection(&self, protocol: Protocol) -> &Connection {
        match protocol {
            Protocol::Reliable => &self.reliable,
            Protocol::Unreliable => &self.unreliable,
        }
    }

    pub fn receivers(&self, protocol: Protocol) -> &ReceiverRegistry {
        match protocol {
            Protocol::Reliable => &self.reliable_receivers,
            Protocol::Unreliable => &self.unreliable_receivers,
        }
    }

    /// Registers `receiver` for frames from `protocol`. Idempotent.
    pub fn subscribe(&self, protocol: Protocol, receiver: ReceiverHandle) -> bool {
        self.receivers(protocol).add(receiver)
    }

    pub fn unsubscribe(&self, protocol: Protocol, receiver: &ReceiverHandle) -> bool {
        self.receivers(protocol).remove(receiver)
    }

    pub fn is_connected(&self, protocol: Protocol) -> bool {
        self.connection(protocol).is_alive()
    }

    /// Queues `msg` on the connection's writer right away.
    pub fn send<M: Message>(&self, protocol: Protocol, msg: &M) -> Result<()> {
        self.connection(protocol).send_typed(msg)
    }

    pub fn send_empty(&self, protocol: Protocol, kind: MessageKind) -> Result<()> {
        self.connection(protocol).send_empty(kind)
    }

    /// Frames queued here go out at the end of the next pump.
    pub fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    /// One host tick: deliver what the readers posted, then hand the outbox
    /// to the writers. Never waits on the network.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        for event in self.events.drain() {
            match event {
                BridgeEvent::Frame { protocol, frame } => {
                    report.frames += 1;
                    let receivers = self.receivers(protocol).clone();
                    receivers.deliver(&frame, &mut self.outbox);
                }
                BridgeEvent::Disconnected { protocol, reason } => {
                    match &reason {
                        Some(e) => warn!(%protocol, error = %e, "Disconnected from server"),
                        None => info!(%protocol, "Connection closed"),
                    }
                    self.receivers(protocol).notify_disconnect(protocol);
                    report.disconnected.push(Disconnect { protocol, reason });
                }
            }
        }

        for queued in self.outbox.drain() {
            match self.connection(queued.protocol).send_frame(queued.bytes) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.send_failures += 1;
                    warn!(protocol = %queued.protocol, error = %e, "Dropping queued frame");
                }
            }
        }

        report
    }

    /// Closes both connections. Their disconnect notices arrive on a later pump.
    pub fn close(&self) {
        self.reliable.close();
        self.unreliable.close();
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.close();
    }
}
