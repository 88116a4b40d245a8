//! Receiver registry: fan-out of frames to interested consumers.
//!
//! Consumers live on the host task only (`Rc<RefCell<..>>`), so the registry
//! needs no locking. Delivery iterates a snapshot of the list and re-checks
//! membership before each call, which makes it safe for a consumer to
//! subscribe or unsubscribe anyone (itself included) from inside `on_frame`.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use netcore_shared::{
    encoder::Outbox,
    wire::{Frame, FrameHeader, Protocol},
};
use tracing::{error, warn};

/// Something that wants to see frames from a connection.
pub trait FrameReceiver {
    /// Handles one frame. Queue replies on `outbox`; the host sends them
    /// after the delivery round.
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        outbox: &mut Outbox,
    ) -> anyhow::Result<()>;

    /// The connection this receiver is subscribed to went away.
    fn on_disconnect(&mut self, _protocol: Protocol) {}
}

/// Shared handle to a registered consumer.
pub type ReceiverHandle = Rc<RefCell<dyn FrameReceiver>>;

/// Wraps a consumer into a handle that can be registered.
pub fn handle<R: FrameReceiver + 'static>(receiver: R) -> (Rc<RefCell<R>>, ReceiverHandle) {
    let typed = Rc::new(RefCell::new(receiver));
    let erased: ReceiverHandle = typed.clone();
    (typed, erased)
}

/// Ordered set of consumers for one connection.
#[derive(Clone, Default)]
pub struct ReceiverRegistry {
    receivers: Rc<RefCell<Vec<ReceiverHandle>>>,
}

impl std::fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `receiver`. Registering the same handle twice is a no-op.
    pub fn add(&self, receiver: ReceiverHandle) -> bool {
        let mut receivers = self.receivers.borrow_mut();
        if receivers.iter().any(|r| same(r, &receiver)) {
            return false;
        }
        receivers.push(receiver);
        true
    }

    /// Unregisters `receiver`; absent handles are ignored.
    pub fn remove(&self, receiver: &ReceiverHandle) -> bool {
        let mut receivers = self.receivers.borrow_mut();
        let before = receivers.len();
        receivers.retain(|r| !same(r, receiver));
        receivers.len() != before
    }

    pub fn contains(&self, receiver: &ReceiverHandle) -> bool {
        self.receivers.borrow().iter().any(|r| same(r, receiver))
    }

    pub fn len(&self) -> usize {
        self.receivers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.borrow().is_empty()
    }

    /// Hands `frame` to every consumer in registration order. Returns the
    /// number of consumers that handled it without error.
    ///
    /// Consumers added during delivery first see the next frame; consumers
    /// removed during delivery are not called for the rest of this one.
    pub fn deliver(&self, frame: &Frame, outbox: &mut Outbox) -> usize {
        let snapshot = self.receivers.borrow().clone();
        let mut handled = 0;

        for receiver in &snapshot {
            if !self.contains(receiver) {
                continue;
            }
            let Ok(mut consumer) = receiver.try_borrow_mut() else {
                warn!(kind = frame.kind(), "Receiver busy, skipping re-entrant delivery");
                continue;
            };

            let res = catch_unwind(AssertUnwindSafe(|| {
                consumer.on_frame(&frame.header, &frame.payload, outbox)
            }));
            match res {
                Ok(Ok(())) => handled += 1,
                Ok(Err(e)) => {
                    warn!(kind = frame.kind(), error = %e, "Receiver failed to handle frame");
                }
                Err(panic) => {
                    error!(
                        kind = frame.kind(),
                        panic = panic_message(&*panic),
                        "Receiver panicked while handling frame"
                    );
                }
            }
        }
        handled
    }

    /// Tells every consumer the connection is gone.
    pub fn notify_disconnect(&self, protocol: Protocol) {
        let snapshot = self.receivers.borrow().clone();
        for receiver in &snapshot {
            if !self.contains(receiver) {
                continue;
            }
            let Ok(mut consumer) = receiver.try_borrow_mut() else {
                warn!(%protocol, "Receiver busy, skipping disconnect notice");
                continue;
            };
            if catch_unwind(AssertUnwindSafe(|| consumer.on_disconnect(protocol))).is_err() {
                error!(%protocol, "Receiver panicked while handling disconnect");
            }
        }
    }
}

/// Identity comparison on the allocation, ignoring vtable pointers.
fn same(a: &ReceiverHandle, b: &ReceiverHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
