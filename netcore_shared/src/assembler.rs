//! Frame assembly.
//!
//! Two independent algorithms:
//! - [`StreamAssembler`] rebuilds frame boundaries from a reliable byte stream
//!   that may split or coalesce frames arbitrarily.
//! - [`decode_datagram`] validates one unreliable datagram on its own; nothing
//!   is ever carried over between datagrams.
//!
//! Neither looks at the message kind. Unknown kinds come out as ordinary
//! frames and the consumers decide what to do with them.

use bytes::{BufMut, BytesMut};

use crate::error::{DatagramDrop, NetError};
use crate::wire::{Frame, FrameHeader, HEADER_SIZE};

/// Pending frame state.
#[derive(Debug)]
enum State {
    /// Collecting the 5 header bytes.
    AwaitingHeader {
        buf: [u8; HEADER_SIZE],
        filled: usize,
    },
    /// Header known; `buf` holds `header.length` bytes once complete, header
    /// bytes included.
    AwaitingPayload {
        header: FrameHeader,
        buf: BytesMut,
    },
    /// A fatal violation was seen; the stream cannot be resynchronised.
    Poisoned { reason: String },
}

impl State {
    fn idle() -> Self {
        State::AwaitingHeader {
            buf: [0; HEADER_SIZE],
            filled: 0,
        }
    }
}

/// Stream-mode frame assembler for the reliable transport.
#[derive(Debug)]
pub struct StreamAssembler {
    state: State,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self {
            state: State::idle(),
        }
    }

    /// True when no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::AwaitingHeader { filled: 0, .. })
    }

    /// Feeds one chunk read from the stream and returns every frame it
    /// completes, in stream order.
    ///
    /// A header declaring fewer than 5 bytes is a [`NetError::ProtocolViolation`].
    /// After that the assembler stays poisoned and keeps returning the error.
    pub fn push(&mut self, mut chunk: &[u8]) -> Result<Vec<Frame>, NetError> {
        let mut frames = Vec::new();

        while !chunk.is_empty() {
            match &mut self.state {
                State::Poisoned { reason } => {
                    return Err(NetError::ProtocolViolation(reason.clone()));
                }
                State::AwaitingHeader { buf, filled } => {
                    let n = (HEADER_SIZE - *filled).min(chunk.len());
                    buf[*filled..*filled + n].copy_from_slice(&chunk[..n]);
                    *filled += n;
                    chunk = &chunk[n..];

                    if *filled < HEADER_SIZE {
                        continue;
                    }

                    let header = FrameHeader::decode(&buf[..])?;
                    if header.payload_len().is_none() {
                        let reason = format!(
                            "header declares length {} (< {HEADER_SIZE}) for kind {}",
                            header.length, header.kind
                        );
                        self.state = State::Poisoned {
                            reason: reason.clone(),
                        };
                        return Err(NetError::ProtocolViolation(reason));
                    }

                    let mut payload = BytesMut::with_capacity(header.length as usize);
                    payload.put_slice(&buf[..]);
                    self.state = State::AwaitingPayload {
                        header,
                        buf: payload,
                    };
                    self.complete_if_ready(&mut frames);
                }
                State::AwaitingPayload { header, buf } => {
                    let missing = header.length as usize - buf.len();
                    let n = missing.min(chunk.len());
                    buf.put_slice(&chunk[..n]);
                    chunk = &chunk[n..];
                    self.complete_if_ready(&mut frames);
                }
            }
        }

        if let State::Poisoned { reason } = &self.state {
            return Err(NetError::ProtocolViolation(reason.clone()));
        }
        Ok(frames)
    }

    fn complete_if_ready(&mut self, frames: &mut Vec<Frame>) {
        let State::AwaitingPayload { header, buf } = &self.state else {
            return;
        };
        if buf.len() < header.length as usize {
            return;
        }
        let State::AwaitingPayload { header, buf } =
            std::mem::replace(&mut self.state, State::idle())
        else {
            return;
        };
        let payload = buf.freeze().slice(HEADER_SIZE..);
        frames.push(Frame::new(header, payload));
    }
}

/// Datagram-mode validation for the unreliable transport.
///
/// Bytes past the declared length are ignored.
pub fn decode_datagram(datagram: &[u8]) -> Result<Frame, DatagramDrop> {
    let Ok(header) = FrameHeader::decode(datagram) else {
        return Err(DatagramDrop::Runt {
            size: datagram.len(),
        });
    };
    let declared = header.length as usize;
    if declared < HEADER_SIZE {
        return Err(DatagramDrop::BadLength { declared });
    }
    if declared > datagram.len() {
        return Err(DatagramDrop::Truncated {
            declared,
            received: datagram.len(),
        });
    }
    Ok(Frame::new(
        header,
        bytes::Bytes::copy_from_slice(&datagram[HEADER_SIZE..declared]),
    ))
}
