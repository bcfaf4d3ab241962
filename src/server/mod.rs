//! Server Module
//!
//! TCP server exposing the repository, plus the scheduled TTL sweep.

mod config;
mod handler;

pub use config::{Config, DEFAULT_CLEANUP_INTERVAL};
pub use handler::Handler;

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

use crate::metrics::Metrics;
use crate::protocol::MemoCodec;
use crate::schedule::{IntervalScheduler, JobId, ScheduleError, Scheduler};
use crate::storage::{CommandRepository, InMemoryRepository, TtlCleaner};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduler error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Memorabilia server
///
/// Owns the repository and the scheduler that sweeps it. Both can be
/// replaced before the server runs, e.g. to share one scheduler between
/// several components.
pub struct Server {
    config: Config,
    repository: Arc<dyn CommandRepository>,
    scheduler: Arc<dyn Scheduler>,
    metrics: Arc<Metrics>,
}

impl Server {
    /// Create a new server with an empty in-memory repository
    pub fn new(config: Config) -> Self {
        Self {
            config,
            repository: Arc::new(InMemoryRepository::new()),
            scheduler: Arc::new(IntervalScheduler::new()),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn CommandRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn repository(&self) -> &Arc<dyn CommandRepository> {
        &self.repository
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from `listener` until `shutdown` resolves
    ///
    /// The cleanup job is registered and the scheduler started before the
    /// first connection is accepted; on shutdown the scheduler is stopped and
    /// the job removed.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;

        let job_id = TtlCleaner::new(self.repository.clone())
            .schedule(self.scheduler.as_ref(), &self.config.cleanup_interval)?;
        if let Err(e) = self.scheduler.start() {
            release_job(self.scheduler.as_ref(), &job_id);
            return Err(e.into());
        }

        info!(
            "Memorabilia server listening on {} (cleanup every {})",
            addr, self.config.cleanup_interval
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server...");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        info!("New connection from {}", peer_addr);

                        let handler = Handler::new(self.repository.clone(), self.metrics.clone());
                        tokio::spawn(async move {
                            let framed = Framed::new(socket, MemoCodec::new());
                            if let Err(e) = handler.run(framed).await {
                                error!("Connection error from {}: {}", peer_addr, e);
                            }

                            info!("Connection closed: {}", peer_addr);
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        }

        // Stopping joins the timer thread
        let scheduler = self.scheduler.clone();
        tokio::task::spawn_blocking(move || {
            let stopped = scheduler.stop();
            release_job(scheduler.as_ref(), &job_id);
            stopped
        })
        .await??;

        info!("Application stopped | {}", self.metrics.summary());
        Ok(())
    }
}

/// Remove the cleanup job, tolerating it being gone already
fn release_job(scheduler: &dyn Scheduler, job_id: &JobId) {
    match scheduler.remove_job(job_id) {
        Ok(()) | Err(ScheduleError::JobNotFound(_)) => {}
        Err(e) => warn!(job_id = %job_id, "Failed to remove cleanup job: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, ClientError};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio_test::{assert_err, assert_ok};

    async fn spawn_server(
        server: Server,
    ) -> (
        std::net::SocketAddr,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<Result<(), ServerError>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));
        (addr, tx, handle)
    }

    #[tokio::test]
    async fn test_serves_repository_commands() {
        let server = Server::new(Config::default().with_cleanup_interval("1h"));
        let (addr, stop, handle) = spawn_server(server).await;

        let mut client = Client::connect(addr).await.unwrap();
        assert_eq!(
            client.echo("hello").await.unwrap(),
            bytes::Bytes::from_static(b"hello")
        );

        assert_ok!(client.set("count", "10", None).await);
        assert_eq!(client.get("count").await.unwrap(), "10");
        assert!(matches!(client.get("missing").await, Err(ClientError::NotFound(_))));

        assert_ok!(client.set("a", "1", None).await);
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(client.batch_delete(&keys).await.unwrap(), 1);
        assert_eq!(client.delete("count").await.unwrap(), 1);
        assert_eq!(client.delete("count").await.unwrap(), 0);

        stop.send(()).unwrap();
        assert_ok!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_keys_over_the_wire() {
        let server = Server::new(Config::default().with_cleanup_interval("1h"));
        let (addr, stop, handle) = spawn_server(server).await;

        let mut client = Client::connect(addr).await.unwrap();
        assert_ok!(client.set("brief", "x", Some(Duration::from_millis(5))).await);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(matches!(client.get("brief").await, Err(ClientError::Expired(_))));
        assert_eq!(client.expired_keys().await.unwrap(), vec!["brief".to_string()]);
        assert_eq!(client.cleanup().await.unwrap(), 1);
        assert!(client.expired_keys().await.unwrap().is_empty());
        assert!(matches!(client.get("brief").await, Err(ClientError::NotFound(_))));

        stop.send(()).unwrap();
        assert_ok!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_background_cleanup_runs() {
        let scheduler = Arc::new(IntervalScheduler::new());
        let server = Server::new(Config::default().with_cleanup_interval("1s"))
            .with_scheduler(scheduler.clone());
        let repository = server.repository().clone();
        let (_addr, stop, handle) = spawn_server(server).await;

        repository
            .set("stale", "v", Some(chrono::Utc::now() - chrono::Duration::seconds(1)))
            .unwrap();
        let swept = tokio::time::timeout(Duration::from_secs(10), async {
            while !repository.get_expired_keys().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        assert_ok!(swept);
        assert_eq!(scheduler.list_jobs().unwrap().len(), 1);

        stop.send(()).unwrap();
        assert_ok!(handle.await.unwrap());
        assert!(scheduler.list_jobs().unwrap().is_empty());
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_invalid_cleanup_interval() {
        let server = Server::new(Config::default().with_cleanup_interval("4"));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let err = assert_err!(server.serve(listener, async {}).await);
        assert!(matches!(
            err,
            ServerError::Schedule(ScheduleError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_after_job_removed_elsewhere() {
        let scheduler = Arc::new(IntervalScheduler::new());
        let server = Server::new(Config::default().with_cleanup_interval("1h"))
            .with_scheduler(scheduler.clone());
        let (addr, stop, handle) = spawn_server(server).await;

        // Once a request is answered the cleanup job is registered
        let mut client = Client::connect(addr).await.unwrap();
        assert_ok!(client.echo("ready").await);
        let jobs = scheduler.list_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        scheduler.remove_job(&jobs[0].job_id).unwrap();

        stop.send(()).unwrap();
        assert_ok!(handle.await.unwrap());
        assert!(!scheduler.is_running());
    }
}
