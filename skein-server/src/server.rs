//! Server implementation for the skein broker

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

use skein_metadata::TopicRegistry;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::frame::{read_frame, write_frame};
use crate::Result;

/// Main server type for the skein broker
#[derive(Debug)]
pub struct Server {
    /// The TCP listener
    listener: TcpListener,
    /// Bounds the number of connections served at once
    connection_limit: Arc<Semaphore>,
    /// Channel for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    dispatcher: Dispatcher,
    idle_timeout: Option<Duration>,
    max_frame_bytes: usize,
}

impl Server {
    /// Create a new server instance on an already bound listener
    pub fn new(
        listener: TcpListener,
        config: &ServerConfig,
        registry: Arc<TopicRegistry>,
    ) -> (Self, broadcast::Sender<()>) {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        (
            Self {
                listener,
                connection_limit: Arc::new(Semaphore::new(config.max_connections)),
                shutdown_tx: shutdown_tx.clone(),
                dispatcher: Dispatcher::new(registry, config.supported_apis.clone()),
                idle_timeout: config.idle_timeout,
                max_frame_bytes: config.max_frame_bytes,
            },
            shutdown_tx,
        )
    }

    /// Binds `config.bind_addr` and creates the server
    pub async fn bind(
        config: &ServerConfig,
        registry: Arc<TopicRegistry>,
    ) -> Result<(Self, broadcast::Sender<()>)> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        Ok(Self::new(listener, config, registry))
    }

    /// Get the local address of the server
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        info!("Server listening on {}", self.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&self.connection_limit).acquire_owned() => {
                    permit.map_err(|_| ServerError::Config("connection limit closed".to_string()))?
                }
                _ = shutdown_rx.recv() => break,
            };

            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("Accepted connection from {}", addr);
                            let connection = Connection {
                                dispatcher: self.dispatcher.clone(),
                                idle_timeout: self.idle_timeout,
                                max_frame_bytes: self.max_frame_bytes,
                            };
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            tokio::spawn(async move {
                                handle_connection(stream, addr, connection, shutdown_rx).await;
                                drop(permit);
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        info!("Shutdown signal received, shutting down...");
        Ok(())
    }
}

/// Per-connection state.
#[derive(Debug, Clone)]
struct Connection {
    dispatcher: Dispatcher,
    idle_timeout: Option<Duration>,
    max_frame_bytes: usize,
}

impl Connection {
    /// Serves requests one at a time until the peer closes or an error occurs.
    async fn serve<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let frame = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, read_frame(stream, self.max_frame_bytes))
                    .await
                    .map_err(|_| ServerError::Timeout)??,
                None => read_frame(stream, self.max_frame_bytes).await?,
            };
            let Some(frame) = frame else {
                return Ok(());
            };

            if let Some(response) = self.dispatcher.dispatch(&frame).await? {
                write_frame(stream, &response).await?;
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    connection: Connection,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tokio::select! {
        result = connection.serve(&mut stream) => match result {
            Ok(()) => info!("Closing connection with {}", addr),
            Err(ServerError::Timeout) => debug!("Connection with {} idle, closing", addr),
            Err(e) => error!("Error processing request from {}: {}", addr, e),
        },
        _ = shutdown_rx.recv() => warn!("Dropping connection with {} on shutdown", addr),
    }
}
