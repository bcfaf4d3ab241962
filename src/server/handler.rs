//! Connection Handler
//!
//! Processes request frames and dispatches commands to the repository.

use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::metrics::Metrics;
use crate::protocol::{Command, ErrorCode, Frame, MemoCodec, OpCode, Response};
use crate::storage::CommandRepository;

/// Connection handler
pub struct Handler {
    repository: Arc<dyn CommandRepository>,
    metrics: Arc<Metrics>,
}

impl Handler {
    pub fn new(repository: Arc<dyn CommandRepository>, metrics: Arc<Metrics>) -> Self {
        Self {
            repository,
            metrics,
        }
    }

    /// Serve one connection until the peer closes it
    pub async fn run<T>(self, mut framed: Framed<T, MemoCodec>) -> std::io::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        while let Some(result) = framed.next().await {
            let frame = result?;
            let start = Instant::now();
            let request_id = frame.header.request_id;

            let (name, response) = match Command::from_frame(&frame) {
                Ok(cmd) => (cmd.name(), self.execute(cmd)),
                Err(e) => ("INVALID", Response::error(ErrorCode::Invalid, e.to_string())),
            };
            let reply = fit_reply(response, request_id, framed.codec().max_payload());
            let failed = reply.header.opcode == OpCode::Error;

            framed.send(reply).await?;

            let elapsed = start.elapsed();
            self.metrics.record_operation(name, elapsed, failed);
            debug!(cmd = name, latency = ?elapsed, failed, "Command executed");
        }

        Ok(())
    }

    /// Execute a command and return response
    pub fn execute(&self, cmd: Command) -> Response {
        match cmd {
            Command::Echo { message } => Response::Value(message),

            Command::Get { key } => match self.repository.get(&key) {
                Ok(value) => Response::Value(Bytes::from(value)),
                Err(e) => Response::error(ErrorCode::from(&e), e.to_string()),
            },

            Command::Set { key, value, ttl_ms } => {
                let expires_at = if ttl_ms == 0 {
                    None
                } else {
                    let expires_at = i64::try_from(ttl_ms)
                        .ok()
                        .and_then(TimeDelta::try_milliseconds)
                        .and_then(|ttl| Utc::now().checked_add_signed(ttl));
                    match expires_at {
                        Some(at) => Some(at),
                        None => {
                            return Response::error(
                                ErrorCode::Invalid,
                                format!("ttl of {}ms is out of range", ttl_ms),
                            )
                        }
                    }
                };

                match self.repository.set(&key, &value, expires_at) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::error(ErrorCode::from(&e), e.to_string()),
                }
            }

            Command::Del { key } => Response::Integer(self.repository.delete(&key) as i64),

            Command::BatchDel { keys } => {
                Response::Integer(self.repository.batch_delete(&keys) as i64)
            }

            Command::ExpiredKeys => match self.repository.get_expired_keys() {
                Ok(keys) => Response::Array(keys),
                Err(e) => Response::error(ErrorCode::Internal, e.to_string()),
            },

            Command::Cleanup => match self.repository.cleanup() {
                Ok(deleted) => Response::Integer(deleted as i64),
                Err(e) => Response::error(ErrorCode::Internal, e.to_string()),
            },
        }
    }
}

/// Encode `response`, swapping it for an error if the peer could not read it
fn fit_reply(response: Response, request_id: u64, max_payload: usize) -> Frame {
    let frame = response.to_frame(request_id);
    if frame.payload.len() <= max_payload {
        return frame;
    }

    warn!(
        request_id,
        size = frame.payload.len(),
        "Response exceeds frame limit"
    );
    Response::error(
        ErrorCode::Internal,
        format!(
            "response of {} bytes exceeds the {} byte frame limit",
            frame.payload.len(),
            max_payload
        ),
    )
    .to_frame(request_id)
}
