//! Outbound encoding.
//!
//! Turns typed messages into complete frames. A message whose `write` does
//! not produce exactly `encoded_len()` bytes is a bug in its layout; the frame
//! is refused rather than sent corrupt.

use bytes::Bytes;
use tracing::error;

use crate::error::{NetError, Result};
use crate::message::{Message, MessageKind};
use crate::wire::{encode_frame, PayloadWriter, Protocol};

/// Encodes `msg` into a full frame (header + payload).
pub fn encode_typed<M: Message>(msg: &M) -> Result<Bytes> {
    let expected = msg.encoded_len();
    let mut w = PayloadWriter::with_capacity(expected);
    msg.write(&mut w);

    if w.len() != expected {
        let err = NetError::Serialization {
            kind: M::KIND.id(),
            expected,
            actual: w.len(),
        };
        error!(kind = ?M::KIND, expected, actual = w.len(), "refusing to send malformed payload");
        return Err(err);
    }

    Ok(encode_frame(M::KIND.id(), &w.into_bytes())?)
}

/// Encodes a header-only notification frame.
pub fn encode_empty(kind: u16) -> Result<Bytes> {
    Ok(encode_frame(kind, &[])?)
}

/// A frame queued for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFrame {
    pub protocol: Protocol,
    pub bytes: Bytes,
}

/// Commands produced by consumers while handling inbound frames.
///
/// Frames are encoded when pushed, so layout errors surface at the call site;
/// the host sends them after the delivery round.
#[derive(Debug, Default)]
pub struct Outbox {
    frames: Vec<OutgoingFrame>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `msg` on its preferred channel.
    pub fn push<M: Message>(&mut self, msg: &M) -> Result<()> {
        self.push_on(M::KIND.channel(), msg)
    }

    pub fn push_on<M: Message>(&mut self, protocol: Protocol, msg: &M) -> Result<()> {
        let bytes = encode_typed(msg)?;
        self.frames.push(OutgoingFrame { protocol, bytes });
        Ok(())
    }

    pub fn push_empty(&mut self, protocol: Protocol, kind: MessageKind) -> Result<()> {
        let bytes = encode_empty(kind.id())?;
        self.frames.push(OutgoingFrame { protocol, bytes });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Takes every queued frame, oldest first.
    pub fn drain(&mut self) -> Vec<OutgoingFrame> {
        std::mem::take(&mut self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WireError;
    use crate::message::{PlayerMovement, SendChatMessage};
    use crate::math::Quat;
    use crate::wire::{decode_frame, PayloadReader};

    /// Claims 8 bytes but writes 4.
    struct Lying;

    impl Message for Lying {
        const KIND: MessageKind = MessageKind::HitReport;

        fn encoded_len(&self) -> usize {
            8
        }

        fn write(&self, w: &mut PayloadWriter) {
            w.put_u32(1);
        }

        fn read(_r: &mut PayloadReader<'_>) -> std::result::Result<Self, WireError> {
            Ok(Lying)
        }
    }

    #[test]
    fn typed_frame_has_header_and_layout() {
        let bytes = encode_typed(&SendChatMessage {
            message: "hi".into(),
        })
        .unwrap();
        assert_eq!(bytes.len(), 5 + 64);
        let frame = decode_frame(&bytes).unwrap();
        assert_eq!(frame.kind(), MessageKind::SendChatMessage.id());
        assert_eq!(
            SendChatMessage::decode(&frame.payload).unwrap().message,
            "hi"
        );
    }

    #[test]
    fn layout_mismatch_fails_loudly() {
        match encode_typed(&Lying) {
            Err(NetError::Serialization {
                kind,
                expected,
                actual,
            }) => {
                assert_eq!(kind, 301);
                assert_eq!(expected, 8);
                assert_eq!(actual, 4);
            }
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[test]
    fn empty_frame_is_header_only() {
        let bytes = encode_empty(401).unwrap();
        assert_eq!(&bytes[..], &[5, 0, 0x91, 0x01, 0]);
    }

    #[test]
    fn outbox_routes_by_channel() {
        let mut outbox = Outbox::new();
        outbox
            .push(&PlayerMovement {
                player_id: 1,
                dx: 0.0,
                dy: 1.0,
                rotation: Quat::IDENTITY,
            })
            .unwrap();
        outbox
            .push_empty(Protocol::Reliable, MessageKind::InventoryInfoRequest)
            .unwrap();
        assert!(outbox.push(&Lying).is_err());

        let frames = outbox.drain();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].protocol, Protocol::Unreliable);
        assert_eq!(frames[1].protocol, Protocol::Reliable);
        assert!(outbox.is_empty());
    }
}
