//! `ZombeansServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → directory → rooms.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, error, info};
use zombeans_protocol::{Codec, JsonCodec};
use zombeans_room::RoomConfig;
use zombeans_session::Directory;
use zombeans_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, ZombeansError};

/// State shared by every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) directory: Arc<Directory>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use zombeans::prelude::*;
///
/// # async fn run() -> Result<(), ZombeansError> {
/// let server = ZombeansServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ZombeansServerBuilder {
    config: ServerConfig,
}

impl ZombeansServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Starts from a full configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the configuration every new room uses.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the listener. Uses [`JsonCodec`] and [`WebSocketTransport`].
    pub async fn build(self) -> Result<ZombeansServer<JsonCodec>, ZombeansError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;
        let state = Arc::new(ServerState {
            directory: Arc::new(Directory::new(self.config.room)),
            codec: JsonCodec,
        });
        Ok(ZombeansServer { transport, state })
    }
}

impl Default for ZombeansServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound zombeans server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ZombeansServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ZombeansServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ZombeansServerBuilder {
        ZombeansServerBuilder::new()
    }
}

impl<C: Codec> ZombeansServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The directory behind this server, for inspection.
    pub fn directory(&self) -> Arc<Directory> {
        Arc::clone(&self.state.directory)
    }

    /// Runs the accept loop.
    ///
    /// Every accepted connection gets its own handler task. Runs until
    /// the process is terminated.
    pub async fn run(mut self) -> Result<(), ZombeansError> {
        info!(addr = ?self.local_addr().ok(), "zombeans server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(conn, state).await {
                            debug!(error = %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => {
                    error!(error = %err, "accept failed");
                }
            }
        }
    }
}
