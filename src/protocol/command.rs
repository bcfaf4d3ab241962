//! Command Parsing
//!
//! Parses command arguments from request frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;

use super::frame::{Frame, OpCode};

/// Parsed command from a request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connectivity check, payload is sent back untouched
    Echo { message: Bytes },

    /// Get value by key
    Get { key: String },

    /// Set key-value; `ttl_ms` of 0 means no expiration
    Set {
        key: String,
        value: String,
        ttl_ms: u64,
    },

    /// Delete key
    Del { key: String },

    /// Delete several keys
    BatchDel { keys: Vec<String> },

    /// List keys past their expiration
    ExpiredKeys,

    /// Remove expired keys now
    Cleanup,
}

impl Command {
    /// Parse command from a request frame
    pub fn from_frame(frame: &Frame) -> io::Result<Self> {
        let mut payload = frame.payload.clone();

        match frame.header.opcode {
            OpCode::Echo => Ok(Command::Echo { message: payload }),

            OpCode::Get => {
                let key = read_string(&mut payload)?;
                Ok(Command::Get { key })
            }

            OpCode::Set => {
                let key = read_string(&mut payload)?;
                let value = read_string(&mut payload)?;
                let ttl_ms = if payload.remaining() >= 8 {
                    payload.get_u64()
                } else {
                    0
                };
                Ok(Command::Set { key, value, ttl_ms })
            }

            OpCode::Del => {
                let key = read_string(&mut payload)?;
                Ok(Command::Del { key })
            }

            OpCode::BatchDel => {
                if payload.remaining() < 4 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "Not enough data for key count",
                    ));
                }
                let count = payload.get_u32() as usize;
                // Every key needs at least its 4-byte length prefix
                let mut keys = Vec::with_capacity(count.min(payload.remaining() / 4));
                for _ in 0..count {
                    keys.push(read_string(&mut payload)?);
                }
                Ok(Command::BatchDel { keys })
            }

            OpCode::ExpiredKeys => Ok(Command::ExpiredKeys),

            OpCode::Cleanup => Ok(Command::Cleanup),

            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unexpected opcode for command: {:?}", frame.header.opcode),
            )),
        }
    }

    /// Encode command to frame payload bytes
    pub fn encode(&self) -> (OpCode, Bytes) {
        match self {
            Command::Echo { message } => (OpCode::Echo, message.clone()),

            Command::Get { key } => (OpCode::Get, single_string(key)),

            Command::Set { key, value, ttl_ms } => {
                let mut buf = BytesMut::with_capacity(16 + key.len() + value.len());
                write_string(&mut buf, key);
                write_string(&mut buf, value);
                buf.put_u64(*ttl_ms);
                (OpCode::Set, buf.freeze())
            }

            Command::Del { key } => (OpCode::Del, single_string(key)),

            Command::BatchDel { keys } => {
                let mut buf = BytesMut::new();
                buf.put_u32(keys.len() as u32);
                for key in keys {
                    write_string(&mut buf, key);
                }
                (OpCode::BatchDel, buf.freeze())
            }

            Command::ExpiredKeys => (OpCode::ExpiredKeys, Bytes::new()),

            Command::Cleanup => (OpCode::Cleanup, Bytes::new()),
        }
    }

    /// Short name used for metrics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Echo { .. } => "ECHO",
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::Del { .. } => "DEL",
            Command::BatchDel { .. } => "BATCHDEL",
            Command::ExpiredKeys => "EXPIREDKEYS",
            Command::Cleanup => "CLEANUP",
        }
    }
}

pub(crate) fn read_string(buf: &mut Bytes) -> io::Result<String> {
    if buf.remaining() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Not enough data for length prefix",
        ));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Not enough data for payload",
        ));
    }
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub(crate) fn write_string(buf: &mut BytesMut, data: &str) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data.as_bytes());
}

fn single_string(data: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + data.len());
    write_string(&mut buf, data);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reparse(cmd: &Command) -> Command {
        let (opcode, payload) = cmd.encode();
        Command::from_frame(&Frame::new(opcode, 1, payload)).unwrap()
    }

    #[test]
    fn test_echo_command() {
        let cmd = Command::Echo {
            message: Bytes::from_static(b"hi"),
        };
        assert_eq!(reparse(&cmd), cmd);
    }

    #[test]
    fn test_set_command_with_ttl() {
        let cmd = Command::Set {
            key: "key".to_string(),
            value: "12.5".to_string(),
            ttl_ms: 3600,
        };
        assert_eq!(reparse(&cmd), cmd);
    }

    #[test]
    fn test_set_without_ttl_field() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "key");
        write_string(&mut buf, "value");
        let frame = Frame::new(OpCode::Set, 1, buf.freeze());

        match Command::from_frame(&frame).unwrap() {
            Command::Set { ttl_ms, .. } => assert_eq!(ttl_ms, 0),
            other => panic!("Expected Set command, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_del_command() {
        let cmd = Command::BatchDel {
            keys: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(reparse(&cmd), cmd);
    }

    #[test]
    fn test_truncated_batch_del() {
        let mut buf = BytesMut::new();
        buf.put_u32(3);
        write_string(&mut buf, "only-one");
        let frame = Frame::new(OpCode::BatchDel, 1, buf.freeze());

        let err = Command::from_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_utf8_key() {
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.put_slice(&[0xFF, 0xFE]);
        let frame = Frame::new(OpCode::Get, 1, buf.freeze());

        let err = Command::from_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_response_opcode_is_not_a_command() {
        assert!(Command::from_frame(&Frame::ok(1)).is_err());
    }
}
