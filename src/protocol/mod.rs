//! Wire Protocol
//!
//! Length-prefixed binary frames carrying repository commands.

mod codec;
mod command;
mod frame;
mod response;

pub use codec::MemoCodec;
pub use command::Command;
pub use frame::{Frame, FrameHeader, OpCode, HEADER_SIZE, MAGIC, MAX_PAYLOAD};
pub use response::{ErrorCode, Response};
