//! Frame Codec for Tokio
//!
//! Implements Encoder and Decoder traits for framed I/O.

use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use super::frame::{Frame, FrameHeader, HEADER_SIZE, MAX_PAYLOAD};

/// Tokio codec for protocol frames
///
/// The payload limit applies in both directions, so a peer using the same
/// codec can always read what this side writes.
#[derive(Debug, Clone, Copy)]
pub struct MemoCodec {
    max_payload: usize,
}

impl Default for MemoCodec {
    fn default() -> Self {
        Self {
            max_payload: MAX_PAYLOAD,
        }
    }
}

impl MemoCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn check_payload(&self, len: usize) -> io::Result<()> {
        if len > self.max_payload {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Payload too large: {} bytes (limit {})",
                    len, self.max_payload
                ),
            ));
        }
        Ok(())
    }
}

impl Decoder for MemoCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        // The header stays buffered until the whole frame has arrived
        let header = FrameHeader::parse(src)?;
        let payload_len = header.payload_len as usize;
        self.check_payload(payload_len)?;

        let frame_len = HEADER_SIZE + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Frame { header, payload }))
    }
}

impl Encoder<Frame> for MemoCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.check_payload(item.payload.len())?;
        dst.reserve(item.encoded_len());
        item.encode(dst);
        Ok(())
    }
}
