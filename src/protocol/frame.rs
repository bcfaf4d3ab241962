//! Frame Structure
//!
//! Binary frame format with a 20-byte header.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;

/// Magic bytes identifying the protocol: "MEMO"
pub const MAGIC: [u8; 4] = [0x4D, 0x45, 0x4D, 0x4F];

/// Protocol version
pub const VERSION: u8 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 20;

/// Largest payload either side of the codec will accept or produce
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Requests
    Echo = 0x01,
    Get = 0x02,
    Set = 0x03,
    Del = 0x04,
    BatchDel = 0x05,
    ExpiredKeys = 0x06,
    Cleanup = 0x07,

    // Responses
    Ok = 0x10,
    Error = 0x11,
    Value = 0x12,
    Integer = 0x13,
    Array = 0x14,
}

impl TryFrom<u8> for OpCode {
    type Error = io::Error;

    fn try_from(byte: u8) -> io::Result<Self> {
        const ALL: [OpCode; 12] = [
            OpCode::Echo,
            OpCode::Get,
            OpCode::Set,
            OpCode::Del,
            OpCode::BatchDel,
            OpCode::ExpiredKeys,
            OpCode::Cleanup,
            OpCode::Ok,
            OpCode::Error,
            OpCode::Value,
            OpCode::Integer,
            OpCode::Array,
        ];
        ALL.into_iter()
            .find(|op| *op as u8 == byte)
            .ok_or_else(|| invalid(format!("Invalid opcode: {:#04x}", byte)))
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Fixed-size frame header
///
/// Big-endian layout: magic `MEMO` (0..4), version (4), opcode (5),
/// flags (6..8), payload length (8..12), request id (12..20).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub opcode: OpCode,
    pub flags: u16,
    pub payload_len: u32,
    pub request_id: u64,
}

impl FrameHeader {
    pub fn new(opcode: OpCode, request_id: u64) -> Self {
        Self {
            opcode,
            flags: 0,
            payload_len: 0,
            request_id,
        }
    }

    pub fn with_payload_len(mut self, len: u32) -> Self {
        self.payload_len = len;
        self
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&MAGIC);
        buf.put_u8(VERSION);
        buf.put_u8(self.opcode as u8);
        buf.put_u16(self.flags);
        buf.put_u32(self.payload_len);
        buf.put_u64(self.request_id);
    }

    /// Parse the first [`HEADER_SIZE`] bytes of `bytes` without consuming them
    pub fn parse(bytes: &[u8]) -> io::Result<Self> {
        let Some(mut raw) = bytes.get(..HEADER_SIZE) else {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Not enough data for header",
            ));
        };

        if raw[..MAGIC.len()] != MAGIC {
            return Err(invalid("Invalid magic bytes"));
        }
        raw.advance(MAGIC.len());

        match raw.get_u8() {
            VERSION => {}
            other => return Err(invalid(format!("Unsupported protocol version: {}", other))),
        }

        Ok(Self {
            opcode: OpCode::try_from(raw.get_u8())?,
            flags: raw.get_u16(),
            payload_len: raw.get_u32(),
            request_id: raw.get_u64(),
        })
    }
}

/// Complete frame with header and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(opcode: OpCode, request_id: u64, payload: Bytes) -> Self {
        let header = FrameHeader::new(opcode, request_id).with_payload_len(payload.len() as u32);
        Self { header, payload }
    }

    pub fn ok(request_id: u64) -> Self {
        Self::new(OpCode::Ok, request_id, Bytes::new())
    }

    /// Error frame: one status byte followed by a UTF-8 message
    pub fn error(request_id: u64, code: u8, msg: &str) -> Self {
        let mut buf = BytesMut::with_capacity(1 + msg.len());
        buf.put_u8(code);
        buf.put_slice(msg.as_bytes());
        Self::new(OpCode::Error, request_id, buf.freeze())
    }

    pub fn value(request_id: u64, data: Bytes) -> Self {
        Self::new(OpCode::Value, request_id, data)
    }

    pub fn integer(request_id: u64, value: i64) -> Self {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_i64(value);
        Self::new(OpCode::Integer, request_id, buf.freeze())
    }

    /// Header plus payload size on the wire
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.header.encode(buf);
        buf.put_slice(&self.payload);
    }
}
