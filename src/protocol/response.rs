//! Response types
//!
//! Response variants for command execution results.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io;

use super::command::{read_string, write_string};
use super::frame::{Frame, OpCode};
use crate::storage::RepositoryError;

/// Status carried by an error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    NotFound = 1,
    Expired = 2,
    Invalid = 3,
    Internal = 4,
}

impl ErrorCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ErrorCode::NotFound),
            2 => Some(ErrorCode::Expired),
            3 => Some(ErrorCode::Invalid),
            4 => Some(ErrorCode::Internal),
            _ => None,
        }
    }
}

impl From<&RepositoryError> for ErrorCode {
    fn from(err: &RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => ErrorCode::NotFound,
            RepositoryError::Expired(_) => ErrorCode::Expired,
        }
    }
}

/// Response to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Simple OK response
    Ok,

    /// Text or raw value
    Value(Bytes),

    /// Integer value (delete counts)
    Integer(i64),

    /// List of strings (expired keys)
    Array(Vec<String>),

    /// Error response
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    /// Convert response to a frame
    pub fn to_frame(&self, request_id: u64) -> Frame {
        match self {
            Response::Ok => Frame::ok(request_id),
            Response::Value(data) => Frame::value(request_id, data.clone()),
            Response::Integer(n) => Frame::integer(request_id, *n),
            Response::Error { code, message } => Frame::error(request_id, *code as u8, message),
            Response::Array(items) => {
                let mut buf = BytesMut::new();
                buf.put_u32(items.len() as u32);
                for item in items {
                    write_string(&mut buf, item);
                }
                Frame::new(OpCode::Array, request_id, buf.freeze())
            }
        }
    }

    /// Parse response from a frame
    pub fn from_frame(frame: &Frame) -> io::Result<Self> {
        let mut payload = frame.payload.clone();

        match frame.header.opcode {
            OpCode::Ok => Ok(Response::Ok),
            OpCode::Value => Ok(Response::Value(payload)),
            OpCode::Integer => {
                if payload.remaining() < 8 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "Invalid integer payload",
                    ));
                }
                Ok(Response::Integer(payload.get_i64()))
            }
            OpCode::Error => {
                if !payload.has_remaining() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "Missing error code",
                    ));
                }
                let code_byte = payload.get_u8();
                let code = ErrorCode::from_u8(code_byte).unwrap_or(ErrorCode::Internal);
                let message = String::from_utf8_lossy(&payload).to_string();
                Ok(Response::Error { code, message })
            }
            OpCode::Array => {
                if payload.remaining() < 4 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "Invalid array payload",
                    ));
                }
                let count = payload.get_u32() as usize;
                let mut items = Vec::with_capacity(count.min(payload.remaining() / 4));
                for _ in 0..count {
                    items.push(read_string(&mut payload)?);
                }
                Ok(Response::Array(items))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unexpected opcode for response: {:?}", frame.header.opcode),
            )),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Value(data) => {
                let s = String::from_utf8_lossy(data);
                write!(f, "\"{}\"", s)
            }
            Response::Integer(n) => write!(f, "(integer) {}", n),
            Response::Error { code, message } => write!(f, "(error {:?}) {}", code, message),
            Response::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) \"{}\"", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_keeps_code() {
        let response = Response::error(ErrorCode::Expired, "key \"a\" has expired");
        let parsed = Response::from_frame(&response.to_frame(3)).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_unknown_error_code_maps_to_internal() {
        let frame = Frame::error(1, 200, "boom");
        match Response::from_frame(&frame).unwrap() {
            Response::Error { code, message } => {
                assert_eq!(code, ErrorCode::Internal);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected error response, got {:?}", other),
        }
    }

    #[test]
    fn test_array_response() {
        let response = Response::Array(vec!["k1".to_string(), "k2".to_string()]);
        let parsed = Response::from_frame(&response.to_frame(1)).unwrap();
        assert_eq!(parsed, response);
        assert_eq!(parsed.to_string(), "1) \"k1\"\n2) \"k2\"");
    }

    #[test]
    fn test_repository_error_codes() {
        let not_found = RepositoryError::NotFound("a".to_string());
        let expired = RepositoryError::Expired("a".to_string());
        assert_eq!(ErrorCode::from(&not_found), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from(&expired), ErrorCode::Expired);
    }

    #[test]
    fn test_display() {
        assert_eq!(Response::Ok.to_string(), "OK");
        assert_eq!(Response::Integer(2).to_string(), "(integer) 2");
        assert_eq!(Response::Array(vec![]).to_string(), "(empty array)");
        assert_eq!(
            Response::Value(Bytes::from_static(b"12")).to_string(),
            "\"12\""
        );
    }
}
