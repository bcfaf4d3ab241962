//! Async Client
//!
//! Typed access to a running server over the framed protocol.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::protocol::{Command, ErrorCode, Frame, MemoCodec, Response};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Expired(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for one server connection
///
/// Requests are answered in order, one at a time.
pub struct Client<T = TcpStream> {
    framed: Framed<T, MemoCodec>,
    next_request_id: u64,
}

impl Client<TcpStream> {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected transport
    pub fn new(io: T) -> Self {
        Self {
            framed: Framed::new(io, MemoCodec::new()),
            next_request_id: 1,
        }
    }

    pub async fn echo(&mut self, message: impl Into<Bytes>) -> Result<Bytes> {
        let cmd = Command::Echo {
            message: message.into(),
        };
        match self.call(cmd).await? {
            Response::Value(data) => Ok(data),
            other => Err(unexpected("value", &other)),
        }
    }

    pub async fn get(&mut self, key: &str) -> Result<String> {
        let cmd = Command::Get {
            key: key.to_string(),
        };
        match self.call(cmd).await? {
            Response::Value(data) => String::from_utf8(data.to_vec())
                .map_err(|e| ClientError::Protocol(e.to_string())),
            other => Err(unexpected("value", &other)),
        }
    }

    /// Store a value; `ttl` of `None` never expires
    ///
    /// The wire carries whole milliseconds with zero meaning "no expiry", so
    /// any `Some` ttl is rounded up to at least one millisecond.
    pub async fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let ttl_ms = ttl.map_or(0, ttl_millis);
        let cmd = Command::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl_ms,
        };
        match self.call(cmd).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected("OK", &other)),
        }
    }

    pub async fn delete(&mut self, key: &str) -> Result<u64> {
        let cmd = Command::Del {
            key: key.to_string(),
        };
        self.call_count(cmd).await
    }

    pub async fn batch_delete(&mut self, keys: &[String]) -> Result<u64> {
        let cmd = Command::BatchDel {
            keys: keys.to_vec(),
        };
        self.call_count(cmd).await
    }

    pub async fn expired_keys(&mut self) -> Result<Vec<String>> {
        match self.call(Command::ExpiredKeys).await? {
            Response::Array(keys) => Ok(keys),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Trigger an immediate sweep, returning the number of keys removed
    pub async fn cleanup(&mut self) -> Result<u64> {
        self.call_count(Command::Cleanup).await
    }

    /// Send a raw command and return the raw response, error frames included
    pub async fn request(&mut self, cmd: Command) -> Result<Response> {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);

        let (opcode, payload) = cmd.encode();
        self.framed.send(Frame::new(opcode, request_id, payload)).await?;

        let frame = self
            .framed
            .next()
            .await
            .ok_or(ClientError::ConnectionClosed)??;
        if frame.header.request_id != request_id {
            return Err(ClientError::Protocol(format!(
                "Response for request {} while waiting for {}",
                frame.header.request_id, request_id
            )));
        }

        Ok(Response::from_frame(&frame)?)
    }

    async fn call(&mut self, cmd: Command) -> Result<Response> {
        match self.request(cmd).await? {
            Response::Error { code, message } => Err(match code {
                ErrorCode::NotFound => ClientError::NotFound(message),
                ErrorCode::Expired => ClientError::Expired(message),
                ErrorCode::Invalid | ErrorCode::Internal => ClientError::Server(message),
            }),
            response => Ok(response),
        }
    }

    async fn call_count(&mut self, cmd: Command) -> Result<u64> {
        match self.call(cmd).await? {
            Response::Integer(n) => {
                u64::try_from(n).map_err(|_| ClientError::Protocol(format!("Negative count {}", n)))
            }
            other => Err(unexpected("integer", &other)),
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_nanos().div_ceil(1_000_000).max(1);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

fn unexpected(expected: &str, got: &Response) -> ClientError {
    ClientError::Protocol(format!("Expected {} response, got {:?}", expected, got))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::server::Handler;
    use crate::storage::InMemoryRepository;
    use std::sync::Arc;

    fn connected() -> Client<tokio::io::DuplexStream> {
        let (client, server) = tokio::io::duplex(8192);
        let handler = Handler::new(Arc::new(InMemoryRepository::new()), Arc::new(Metrics::new()));
        tokio::spawn(handler.run(Framed::new(server, MemoCodec::new())));
        Client::new(client)
    }

    #[tokio::test]
    async fn test_typed_values() {
        let mut client = connected();
        client.set("i", "42", None).await.unwrap();
        client.set("f", "2.50", None).await.unwrap();
        client.set("s", "text", Some(Duration::from_secs(60))).await.unwrap();

        assert_eq!(client.get("i").await.unwrap(), "42");
        assert_eq!(client.get("f").await.unwrap(), "2.5");
        assert_eq!(client.get("s").await.unwrap(), "text");
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let mut client = connected();
        let err = client.get("absent").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref msg) if msg.contains("absent")));
    }

    #[tokio::test]
    async fn test_request_returns_error_frames() {
        let mut client = connected();
        let response = client
            .request(Command::Get {
                key: "absent".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            response,
            Response::Error {
                code: ErrorCode::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut client = Client::new(client);

        assert!(client.cleanup().await.is_err());
    }

    #[test]
    fn test_ttl_rounds_up_to_whole_millis() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_nanos(1)), 1);
        assert_eq!(ttl_millis(Duration::from_micros(500)), 1);
        assert_eq!(ttl_millis(Duration::from_micros(1500)), 2);
        assert_eq!(ttl_millis(Duration::from_millis(250)), 250);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_sub_millisecond_ttl_still_expires() {
        let mut client = connected();
        client
            .set("blink", "v", Some(Duration::from_micros(500)))
            .await
            .unwrap();
        client.set("zero", "v", Some(Duration::ZERO)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(client.get("blink").await, Err(ClientError::Expired(_))));
        assert!(matches!(client.get("zero").await, Err(ClientError::Expired(_))));
        let mut expired = client.expired_keys().await.unwrap();
        expired.sort();
        assert_eq!(expired, vec!["blink".to_string(), "zero".to_string()]);
    }
}
