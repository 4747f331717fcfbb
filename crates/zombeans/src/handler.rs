//! Per-connection handler: role selection, mailbox forwarding, and
//! request decoding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Map the request path to a role; close the connection if none fits
//!   2. Register with the directory and start forwarding its mailbox
//!   3. Loop: receive frames → decode for the role → route to the directory

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zombeans_protocol::{Codec, ConnectionId, Inbound, Outbound, ProtocolError, Role};
use zombeans_transport::{Connection, WebSocketConnection};

use crate::ZombeansError;
use crate::server::ServerState;

/// Drop guard that removes the connection from the directory when the
/// handler exits.
///
/// `Drop` is synchronous, so the async cleanup runs in a spawned task.
struct DisconnectGuard<C: Codec> {
    connection: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(err) = state.directory.disconnect(connection).await {
                debug!(%connection, %err, "disconnect cleanup");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ZombeansError> {
    let connection = conn.id();

    let Some(role) = Role::from_path(conn.path()) else {
        warn!(%connection, path = conn.path(), "no role for path, closing");
        conn.close().await?;
        return Err(ProtocolError::InvalidMessage(format!("no role for path {}", conn.path())).into());
    };

    let (mailbox, outbox) = mpsc::unbounded_channel();
    state.directory.connect(connection, role, mailbox).await?;
    let _guard = DisconnectGuard {
        connection,
        state: Arc::clone(&state),
    };
    info!(%connection, %role, "connected");

    let conn = Arc::new(conn);
    let forwarder = tokio::spawn(forward(Arc::clone(&conn), outbox, Arc::clone(&state)));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                info!(%connection, %role, "connection closed");
                break;
            }
            Err(err) => {
                debug!(%connection, %err, "recv error");
                break;
            }
        };

        let inbound = match decode(&state.codec, role, &data) {
            Ok(inbound) => inbound,
            Err(err) => {
                debug!(%connection, %role, %err, "undecodable frame skipped");
                continue;
            }
        };

        // The directory logs failures and answers the ones clients see.
        let _ = state.directory.handle(connection, inbound).await;
    }

    forwarder.abort();
    Ok(())
}

/// Decodes a frame as a request of the connection's role.
fn decode<C: Codec>(codec: &C, role: Role, data: &[u8]) -> Result<Inbound, ProtocolError> {
    Ok(match role {
        Role::Owner => Inbound::Owner(codec.decode(data)?),
        Role::Player => Inbound::Player(codec.decode(data)?),
        Role::Viewer => Inbound::Viewer(codec.decode(data)?),
    })
}

/// Drains a connection's mailbox to its socket until either side goes away.
async fn forward<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<ServerState<C>>,
) {
    let connection = conn.id();
    while let Some(message) = outbox.recv().await {
        let bytes = match state.codec.encode(&message) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%connection, %err, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(err) = conn.send(&bytes).await {
            debug!(%connection, %err, "send failed, stopping forwarder");
            break;
        }
    }
}
