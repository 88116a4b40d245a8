//! Dispatch bridge.
//!
//! Reader tasks post decoded frames here; the host drains them on its own
//! task, so consumer code never runs on a reader. Each connection gets its
//! own bounded lane: frames from one connection stay in order, and a reader
//! flooding its lane never holds up the other connection's posts.

use std::future::poll_fn;
use std::task::Poll;

use netcore_shared::{
    error::NetError,
    wire::{Frame, Protocol},
};
use tokio::sync::mpsc;

/// Something a reader task reports to the host.
#[derive(Debug)]
pub enum BridgeEvent {
    Frame {
        protocol: Protocol,
        frame: Frame,
    },
    /// Posted exactly once per connection, after its reader stops.
    Disconnected {
        protocol: Protocol,
        /// `None` when the connection was closed locally.
        reason: Option<NetError>,
    },
}

impl BridgeEvent {
    pub fn protocol(&self) -> Protocol {
        match self {
            BridgeEvent::Frame { protocol, .. } | BridgeEvent::Disconnected { protocol, .. } => {
                *protocol
            }
        }
    }
}

/// Reader-side handle for one lane.
#[derive(Debug)]
pub struct BridgeSender {
    tx: mpsc::Sender<BridgeEvent>,
}

impl BridgeSender {
    /// Waits for room when the host is behind on this lane. Returns `false`
    /// once the host has dropped its receiver.
    pub async fn post_frame(&self, protocol: Protocol, frame: Frame) -> bool {
        self.tx
            .send(BridgeEvent::Frame { protocol, frame })
            .await
            .is_ok()
    }

    pub async fn post_disconnect(&self, protocol: Protocol, reason: Option<NetError>) -> bool {
        self.tx
            .send(BridgeEvent::Disconnected { protocol, reason })
            .await
            .is_ok()
    }
}

/// Host-side handle over every lane.
#[derive(Debug)]
pub struct BridgeReceiver {
    lanes: Vec<mpsc::Receiver<BridgeEvent>>,
    capacity: usize,
}

impl BridgeReceiver {
    /// Each lane holds at most `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            lanes: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Opens a lane for one reader.
    pub fn open(&mut self) -> BridgeSender {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lanes.push(rx);
        BridgeSender { tx }
    }

    /// Next queued event without waiting, from the first lane that has one.
    pub fn try_next(&mut self) -> Option<BridgeEvent> {
        self.lanes.iter_mut().find_map(|lane| lane.try_recv().ok())
    }

    /// Takes what is queued right now, one event per lane in turn and at
    /// most one lane's worth from each, so a flooding reader cannot keep a
    /// single tick busy forever.
    pub fn drain(&mut self) -> Vec<BridgeEvent> {
        let mut taken = vec![0usize; self.lanes.len()];
        let mut events = Vec::new();
        loop {
            let mut progressed = false;
            for (lane, taken) in self.lanes.iter_mut().zip(taken.iter_mut()) {
                if *taken >= self.capacity {
                    continue;
                }
                if let Ok(event) = lane.try_recv() {
                    events.push(event);
                    *taken += 1;
                    progressed = true;
                }
            }
            if !progressed {
                return events;
            }
        }
    }

    /// Waits for the next event on any lane. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        poll_fn(|cx| {
            let mut open = false;
            for lane in self.lanes.iter_mut() {
                match lane.poll_recv(cx) {
                    Poll::Ready(Some(event)) => return Poll::Ready(Some(event)),
                    Poll::Ready(None) => {}
                    Poll::Pending => open = true,
                }
            }
            if open {
                Poll::Pending
            } else {
                Poll::Ready(None)
            }
        })
        .await
    }
}
