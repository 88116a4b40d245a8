//! Wire format.
//!
//! Every message on either transport is a frame:
//! ```text
//! ┌──────────────┬──────────────┬──────┬─────────────────────┐
//! │ total length │ message kind │ tag  │ payload             │
//! │ u16 LE       │ u16 LE       │ u8   │ length - 5 bytes    │
//! └──────────────┴──────────────┴──────┴─────────────────────┘
//! ```
//!
//! The length counts the header itself. The tag byte is reserved and always
//! sent as zero. Payloads are explicit fixed layouts: little-endian integers,
//! little-endian IEEE-754 floats, and NUL-padded UTF-8 strings with a fixed
//! byte budget. [`PayloadWriter`] and [`PayloadReader`] implement those rules.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::math::{Quat, Vec3};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 5;

/// Largest frame the u16 length field can describe.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Transport a frame travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// TCP stream.
    Reliable,
    /// UDP datagrams.
    Unreliable,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Reliable => write!(f, "tcp"),
            Protocol::Unreliable => write!(f, "udp"),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame length, header included.
    pub length: u16,
    /// Message kind discriminant.
    pub kind: u16,
    /// Reserved type tag.
    pub tag: u8,
}

impl FrameHeader {
    pub fn new(length: u16, kind: u16) -> Self {
        Self {
            length,
            kind,
            tag: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.length.to_le_bytes());
        buf[2..4].copy_from_slice(&self.kind.to_le_bytes());
        buf[4] = self.tag;
        buf
    }

    /// Decodes the first five bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::MalformedHeader {
                available: buf.len(),
            });
        }
        Ok(Self {
            length: u16::from_le_bytes([buf[0], buf[1]]),
            kind: u16::from_le_bytes([buf[2], buf[3]]),
            tag: buf[4],
        })
    }

    /// Payload size implied by the header, or `None` if `length < HEADER_SIZE`.
    pub fn payload_len(&self) -> Option<usize> {
        (self.length as usize).checked_sub(HEADER_SIZE)
    }
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(header: FrameHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    #[inline]
    pub fn kind(&self) -> u16 {
        self.header.kind
    }
}

/// Builds `header || payload` for the given kind.
pub fn encode_frame(kind: u16, payload: &[u8]) -> Result<Bytes, WireError> {
    let total = HEADER_SIZE + payload.len();
    if total > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge { size: total });
    }
    let mut buf = BytesMut::with_capacity(total);
    buf.put_slice(&FrameHeader::new(total as u16, kind).encode());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Decodes an already fully received frame buffer.
pub fn decode_frame(buf: &[u8]) -> Result<Frame, WireError> {
    let header = FrameHeader::decode(buf)?;
    let declared = header.length as usize;
    if declared != buf.len() || declared < HEADER_SIZE {
        return Err(WireError::LengthMismatch {
            declared,
            available: buf.len(),
        });
    }
    Ok(Frame::new(
        header,
        Bytes::copy_from_slice(&buf[HEADER_SIZE..]),
    ))
}

/// Writes a fixed payload layout.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn put_vec3(&mut self, v: Vec3) {
        self.put_f32(v.x);
        self.put_f32(v.y);
        self.put_f32(v.z);
    }

    pub fn put_quat(&mut self, q: Quat) {
        self.put_f32(q.x);
        self.put_f32(q.y);
        self.put_f32(q.z);
        self.put_f32(q.w);
    }

    /// Writes `s` into exactly `budget` bytes, NUL-padded.
    ///
    /// At most `budget - 1` bytes of text are kept so the field always carries
    /// a terminator; longer strings are cut at the last char boundary that fits.
    pub fn put_fixed_str(&mut self, s: &str, budget: usize) {
        let max = budget.saturating_sub(1);
        let mut end = s.len().min(max);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.put_slice(&s.as_bytes()[..end]);
        self.buf.put_bytes(0, budget - end);
    }

    /// Pads with zero bytes.
    pub fn put_zeros(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads a fixed payload layout with bounds checks.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::PayloadTooShort {
                offset: self.offset,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn get_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn get_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn get_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn get_f32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn get_vec3(&mut self) -> Result<Vec3, WireError> {
        Ok(Vec3::new(self.get_f32()?, self.get_f32()?, self.get_f32()?))
    }

    pub fn get_quat(&mut self) -> Result<Quat, WireError> {
        Ok(Quat::new(
            self.get_f32()?,
            self.get_f32()?,
            self.get_f32()?,
            self.get_f32()?,
        ))
    }

    /// Reads a `budget`-byte NUL-padded string, stopping at the first NUL.
    pub fn get_fixed_str(&mut self, budget: usize) -> Result<String, WireError> {
        let raw = self.take(budget)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), WireError> {
        self.take(n).map(|_| ())
    }
}
