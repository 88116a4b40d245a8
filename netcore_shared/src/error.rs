//! Error taxonomy for the network core.
//!
//! - [`WireError`]: pure codec failures (header/payload parsing).
//! - [`DatagramDrop`]: reasons a single datagram is discarded; never fatal.
//! - [`NetError`]: everything a connection or the encoder can report.

use thiserror::Error;

/// Failures while encoding or decoding bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Fewer than `HEADER_SIZE` bytes were available.
    #[error("malformed header: {available} bytes available, 5 required")]
    MalformedHeader { available: usize },

    /// The header's declared length disagrees with a fully received buffer.
    #[error("length mismatch: header declares {declared} bytes, {available} available")]
    LengthMismatch { declared: usize, available: usize },

    /// Header + payload does not fit the u16 length field.
    #[error("frame of {size} bytes exceeds the 65535 byte limit")]
    FrameTooLarge { size: usize },

    /// A payload ended before its layout was fully read.
    #[error("payload too short: needed {needed} bytes at offset {offset}, {available} available")]
    PayloadTooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Why a datagram produced no frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DatagramDrop {
    #[error("runt datagram of {size} bytes")]
    Runt { size: usize },

    #[error("declared length {declared} is smaller than the header")]
    BadLength { declared: usize },

    /// The header claims more bytes than were received.
    #[error("truncated datagram: declared {declared} bytes, received {received}")]
    Truncated { declared: usize, received: usize },
}

/// Errors surfaced by transports and the outbound encoder.
#[derive(Debug, Error)]
pub enum NetError {
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The byte stream can no longer be parsed; the connection must close.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// A typed payload did not match its declared fixed layout.
    #[error("serialization of kind {kind} produced {actual} bytes, layout declares {expected}")]
    Serialization {
        kind: u16,
        expected: usize,
        actual: usize,
    },

    /// The writer task is behind; the frame was not queued.
    #[error("send queue full")]
    SendQueueFull,

    #[error("connection is closed")]
    Closed,
}

impl NetError {
    /// Read failure for a stream read that returned zero bytes.
    pub fn peer_closed() -> Self {
        NetError::ReadFailed(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by peer",
        ))
    }
}

/// Result alias for network core operations.
pub type Result<T> = std::result::Result<T, NetError>;
