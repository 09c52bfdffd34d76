//! Message framing
//!
//! Stateless codec turning a raw byte payload into a self-delimiting wire
//! frame: a 4-byte ASCII decimal length header (space-padded to width 4)
//! followed by the body. Identical payloads always produce byte-identical
//! frames.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::constants::{HEADER_LENGTH, MAX_BODY_LENGTH};

/// Error type for framing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Body length at or above [`MAX_BODY_LENGTH`]
    PayloadTooLarge(usize),
    /// Header is not a well-formed ASCII decimal length
    InvalidHeader,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::PayloadTooLarge(len) => {
                write!(f, "Payload of {} bytes exceeds frame limit", len)
            }
            FrameError::InvalidHeader => write!(f, "Invalid frame header"),
        }
    }
}

impl std::error::Error for FrameError {}

/// A complete wire frame: header plus body
///
/// Immutable once built. Cloning is cheap (`Bytes` reference counting), so
/// one frame per publish is shared across all subscribers without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Encode a payload into a frame
    ///
    /// Fails, rather than truncating, when the payload is at or above
    /// [`MAX_BODY_LENGTH`]. The header always carries the formatted length
    /// value; the body follows it untouched.
    pub fn encode(payload: &[u8]) -> Result<Frame, FrameError> {
        if payload.len() >= MAX_BODY_LENGTH {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }

        let mut buf = BytesMut::with_capacity(HEADER_LENGTH + payload.len());
        let header = format!("{:>width$}", payload.len(), width = HEADER_LENGTH);
        buf.put_slice(header.as_bytes());
        buf.put_slice(payload);

        Ok(Frame { bytes: buf.freeze() })
    }

    /// Full frame contents, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame size: header plus body
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame carries at least its header
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The 4-byte length header
    pub fn header(&self) -> &[u8] {
        &self.bytes[..HEADER_LENGTH]
    }

    /// The frame body
    pub fn body(&self) -> &[u8] {
        &self.bytes[HEADER_LENGTH..]
    }

    pub fn body_len(&self) -> usize {
        self.bytes.len() - HEADER_LENGTH
    }

    /// Consume the frame, returning the underlying buffer
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Parse a frame header back into a body length
///
/// Used by subscriber clients to learn how many body bytes to read next.
pub fn decode_header(header: &[u8]) -> Result<usize, FrameError> {
    if header.len() != HEADER_LENGTH {
        return Err(FrameError::InvalidHeader);
    }

    let text = std::str::from_utf8(header).map_err(|_| FrameError::InvalidHeader)?;
    let length: usize = text
        .trim_start()
        .parse()
        .map_err(|_| FrameError::InvalidHeader)?;

    if length >= MAX_BODY_LENGTH {
        return Err(FrameError::PayloadTooLarge(length));
    }

    Ok(length)
}
