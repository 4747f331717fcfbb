//! The session directory: every connection, every room, and the routing
//! between them.
//!
//! # Concurrency
//!
//! The connection and room tables sit behind one `tokio::sync::Mutex`;
//! each room sits behind its own. Whenever both are needed the tables
//! are locked first. Room tick drivers only ever take their room's lock,
//! so they can never wait on the directory.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zombeans_protocol::{
    AbilityCode, ConnectionId, Direction, Inbound, JoinResponse, OwnerEvent, OwnerRequest,
    PlayerEvent, PlayerRequest, Role, RoomCode, RosterEntry, Slot, ViewResponse, ViewerEvent,
    ViewerRequest,
};
use zombeans_room::{Mailbox, Room, RoomConfig, RoomError, RoomState, SharedRoom};

use crate::code::unique_code;
use crate::record::{Entry, MembershipState, PlayerRecord, Record, ViewerRecord};
use crate::SessionError;

#[derive(Default)]
struct Tables {
    connections: HashMap<ConnectionId, Entry>,
    rooms: HashMap<RoomCode, SharedRoom>,
}

impl Tables {
    fn entry(&self, connection: ConnectionId) -> Result<&Entry, SessionError> {
        self.connections
            .get(&connection)
            .ok_or(SessionError::UnknownConnection(connection))
    }

    fn entry_mut(&mut self, connection: ConnectionId) -> Result<&mut Entry, SessionError> {
        self.connections
            .get_mut(&connection)
            .ok_or(SessionError::UnknownConnection(connection))
    }

    fn room(&self, code: &RoomCode) -> Result<SharedRoom, RoomError> {
        self.rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// The room a player is bound to.
    fn player_room(&self, connection: ConnectionId) -> Result<SharedRoom, SessionError> {
        match &self.entry(connection)?.record {
            Record::Player(PlayerRecord {
                room: Some(code), ..
            }) => Ok(self.room(code)?),
            Record::Player(_) => Err(RoomError::Precondition(format!(
                "{connection} is not in a room"
            ))
            .into()),
            other => Err(wrong_role(connection, other.role(), Role::Player)),
        }
    }
}

/// Tracks all connections and rooms and routes requests between them.
///
/// Cheap to share: wrap it in an `Arc` and hand a clone to every
/// connection task.
pub struct Directory {
    config: RoomConfig,
    tables: Mutex<Tables>,
}

impl Directory {
    /// Creates an empty directory. Every room it creates uses `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config: config.validated(),
            tables: Mutex::new(Tables::default()),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Connect / disconnect
    // -----------------------------------------------------------------------

    /// Registers a new connection.
    ///
    /// An owner gets a fresh room right away and is sent its code,
    /// which is also returned.
    pub async fn connect(
        &self,
        connection: ConnectionId,
        role: Role,
        mailbox: Mailbox,
    ) -> Result<Option<RoomCode>, SessionError> {
        let mut tables = self.tables.lock().await;
        if tables.connections.contains_key(&connection) {
            return Err(SessionError::AlreadyConnected(connection));
        }

        let (record, code) = match role {
            Role::Owner => {
                let code = unique_code(&mut rand::rng(), |c| tables.rooms.contains_key(c));
                let room = Room::new(code.clone(), connection, mailbox.clone(), self.config.clone());
                room.send_owner(OwnerEvent::RoomCode { code: code.clone() });
                tables.rooms.insert(code.clone(), room.shared());
                info!(%connection, %code, rooms = tables.rooms.len(), "room created");
                (Record::Owner { room: code.clone() }, Some(code))
            }
            Role::Player => (Record::Player(PlayerRecord::unbound()), None),
            Role::Viewer => (Record::Viewer(ViewerRecord::default()), None),
        };

        tables.connections.insert(connection, Entry { record, mailbox });
        debug!(%connection, %role, "connection registered");
        Ok(code)
    }

    /// Forgets a connection and cleans up after it.
    ///
    /// An owner leaving tears its room down: the tick driver stops, every
    /// member and viewer is told the session ended and goes back to
    /// unbound, and the code stops resolving. A player leaving only
    /// leaves its room; the game goes on.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), SessionError> {
        let mut tables = self.tables.lock().await;
        let entry = tables
            .connections
            .remove(&connection)
            .ok_or(SessionError::UnknownConnection(connection))?;

        match entry.record {
            Record::Owner { room: code } => {
                let Some(room) = tables.rooms.remove(&code) else {
                    warn!(%connection, %code, "owner's room already gone");
                    return Ok(());
                };
                let departed = room.lock().await.end_session();

                for player in &departed.players {
                    if let Some(Entry {
                        record: Record::Player(record),
                        ..
                    }) = tables.connections.get_mut(player)
                    {
                        record.unbind();
                    }
                }
                for viewer in &departed.viewers {
                    if let Some(Entry {
                        record: Record::Viewer(record),
                        ..
                    }) = tables.connections.get_mut(viewer)
                    {
                        record.room = None;
                    }
                }
                info!(
                    %connection,
                    %code,
                    players = departed.players.len(),
                    viewers = departed.viewers.len(),
                    rooms = tables.rooms.len(),
                    "owner left, room removed"
                );
            }
            Record::Player(PlayerRecord {
                room: Some(code), ..
            }) => {
                if let Some(room) = tables.rooms.get(&code) {
                    if let Err(err) = room.lock().await.leave(connection) {
                        warn!(%connection, %code, %err, "player leave");
                    }
                }
            }
            Record::Viewer(ViewerRecord { room: Some(code) }) => {
                if let Some(room) = tables.rooms.get(&code) {
                    room.lock().await.remove_viewer(connection);
                }
            }
            Record::Player(_) | Record::Viewer(_) => {}
        }

        debug!(%connection, "connection removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Routes one inbound request.
    ///
    /// Failures are logged here; requests the connection's role may not
    /// make are dropped with a warning.
    pub async fn handle(&self, connection: ConnectionId, inbound: Inbound) -> Result<(), SessionError> {
        let result = match inbound {
            Inbound::Owner(OwnerRequest::StartGame) => self.start_request(connection).await,
            Inbound::Player(PlayerRequest::JoinRequest {
                room_code,
                display_name,
            }) => self
                .join_request(connection, &room_code, display_name)
                .await
                .map(drop),
            Inbound::Player(PlayerRequest::Move { direction, pressed }) => {
                self.input(connection, direction, pressed).await
            }
            Inbound::Player(PlayerRequest::Ability { code }) => {
                self.ability_input(connection, code).await.map(drop)
            }
            Inbound::Viewer(ViewerRequest::ViewRequest { room_code }) => {
                self.view_request(connection, &room_code).await
            }
        };

        if let Err(err) = &result {
            if err.is_invalid_role() {
                warn!(%connection, %err, "request dropped");
            } else {
                debug!(%connection, %err, "request failed");
            }
        }
        result
    }

    /// Adds a player to a room's roster.
    ///
    /// The player always gets a `join_response`; on success the owner
    /// also gets `player_joined`.
    pub async fn join_request(
        &self,
        connection: ConnectionId,
        code: &RoomCode,
        display_name: String,
    ) -> Result<Slot, SessionError> {
        let mut tables = self.tables.lock().await;
        let entry = tables.entry(connection)?;
        let mailbox = entry.mailbox.clone();

        let result = self
            .try_join(&mut tables, connection, code, display_name)
            .await;
        let response = match &result {
            Ok((slot, is_controller)) => Some(JoinResponse::success(*slot, *is_controller)),
            Err(SessionError::Room(err)) if !matches!(err, RoomError::InvalidRole(_)) => {
                Some(JoinResponse::failure(err.to_string()))
            }
            Err(_) => None,
        };
        if let Some(response) = response {
            let _ = mailbox.send(PlayerEvent::JoinResponse(response).into());
        }
        result.map(|(slot, _)| slot)
    }

    async fn try_join(
        &self,
        tables: &mut Tables,
        connection: ConnectionId,
        code: &RoomCode,
        display_name: String,
    ) -> Result<(Slot, bool), SessionError> {
        let entry = tables.entry(connection)?;
        let bound = match &entry.record {
            Record::Player(record) => record.room.clone(),
            other => return Err(wrong_role(connection, other.role(), Role::Player)),
        };
        let mailbox = entry.mailbox.clone();

        if let Some(bound) = bound {
            // Only a binding to a finished or vanished room can be replaced.
            if let Ok(old) = tables.room(&bound) {
                let mut old = old.lock().await;
                if !old.state().is_terminal() {
                    return Err(RoomError::NotOpen {
                        code: code.clone(),
                        reason: "already in a room".into(),
                    }
                    .into());
                }
                let _ = old.leave(connection);
            }
            debug!(%connection, code = %bound, "released binding to finished room");
            if let Record::Player(record) = &mut tables.entry_mut(connection)?.record {
                record.unbind();
            }
        }

        let room = tables.room(code)?;
        let (slot, is_controller) = {
            let mut room = room.lock().await;
            let slot = room.join(connection, display_name.clone(), mailbox)?;
            (slot, room.is_controller_slot(slot))
        };

        if let Record::Player(record) = &mut tables.entry_mut(connection)?.record {
            record.display_name = Some(display_name);
            record.slot = Some(slot);
            record.state = MembershipState::Lobby;
            record.room = Some(code.clone());
        }
        Ok((slot, is_controller))
    }

    /// Attaches a viewer to a room and answers with its roster and arena.
    pub async fn view_request(&self, connection: ConnectionId, code: &RoomCode) -> Result<(), SessionError> {
        let mut tables = self.tables.lock().await;
        let entry = tables.entry(connection)?;
        let mailbox = entry.mailbox.clone();
        let previous = match &entry.record {
            Record::Viewer(record) => record.room.clone(),
            other => return Err(wrong_role(connection, other.role(), Role::Viewer)),
        };

        let room = match tables.room(code) {
            Ok(room) => room,
            Err(err) => {
                let _ = mailbox.send(ViewerEvent::ViewResponse(ViewResponse::failure(err.to_string())).into());
                return Err(err.into());
            }
        };

        if let Some(previous) = previous.filter(|p| p != code) {
            if let Ok(old) = tables.room(&previous) {
                old.lock().await.remove_viewer(connection);
            }
        }

        let (roster, arena) = room.lock().await.add_viewer(connection, mailbox.clone());
        if let Record::Viewer(record) = &mut tables.entry_mut(connection)?.record {
            record.room = Some(code.clone());
        }
        let _ = mailbox.send(ViewerEvent::ViewResponse(ViewResponse::success(roster, arena)).into());
        Ok(())
    }

    /// Starts the owner's game.
    ///
    /// Below the minimum roster size nothing changes and the owner gets
    /// `start_rejected`.
    pub async fn start_request(&self, connection: ConnectionId) -> Result<(), SessionError> {
        let mut tables = self.tables.lock().await;
        let entry = tables.entry(connection)?;
        let code = match &entry.record {
            Record::Owner { room } => room.clone(),
            other => return Err(wrong_role(connection, other.role(), Role::Owner)),
        };
        let mailbox = entry.mailbox.clone();
        let room = tables.room(&code)?;

        let started = room.lock().await.start(&room);
        if let Err(err) = started {
            info!(%connection, %code, %err, "start rejected");
            let _ = mailbox.send(
                OwnerEvent::StartRejected {
                    reason: err.to_string(),
                }
                .into(),
            );
            return Err(err.into());
        }

        for entry in tables.connections.values_mut() {
            if let Record::Player(record) = &mut entry.record {
                if record.room.as_ref() == Some(&code) {
                    record.state = MembershipState::InGame;
                }
            }
        }
        Ok(())
    }

    /// Forwards a movement key to the player's room.
    pub async fn input(
        &self,
        connection: ConnectionId,
        direction: Direction,
        pressed: bool,
    ) -> Result<(), SessionError> {
        let room = self.tables.lock().await.player_room(connection)?;
        room.lock().await.input(connection, direction, pressed)?;
        Ok(())
    }

    /// Forwards an ability activation to the player's room. Returns
    /// whether the ability took effect.
    pub async fn ability_input(
        &self,
        connection: ConnectionId,
        code: AbilityCode,
    ) -> Result<bool, SessionError> {
        let room = self.tables.lock().await.player_room(connection)?;
        let activated = room.lock().await.ability(connection, code)?;
        Ok(activated)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub async fn room_count(&self) -> usize {
        self.tables.lock().await.rooms.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.tables.lock().await.connections.len()
    }

    /// The room behind a code, for callers that need more than the
    /// summaries below.
    pub async fn room(&self, code: &RoomCode) -> Option<SharedRoom> {
        self.tables.lock().await.rooms.get(code).cloned()
    }

    pub async fn room_state(&self, code: &RoomCode) -> Option<RoomState> {
        let room = self.room(code).await?;
        let state = room.lock().await.state();
        Some(state)
    }

    pub async fn roster(&self, code: &RoomCode) -> Option<Vec<RosterEntry>> {
        let room = self.room(code).await?;
        let roster = room.lock().await.roster();
        Some(roster)
    }

    pub async fn player_state(&self, connection: ConnectionId) -> Option<MembershipState> {
        match &self.tables.lock().await.connections.get(&connection)?.record {
            Record::Player(record) => Some(record.state),
            _ => None,
        }
    }

    pub async fn player_record(&self, connection: ConnectionId) -> Option<PlayerRecord> {
        match &self.tables.lock().await.connections.get(&connection)?.record {
            Record::Player(record) => Some(record.clone()),
            _ => None,
        }
    }

    pub async fn viewer_room(&self, connection: ConnectionId) -> Option<RoomCode> {
        match &self.tables.lock().await.connections.get(&connection)?.record {
            Record::Viewer(record) => record.room.clone(),
            _ => None,
        }
    }

    /// The code of the room an owner connection owns.
    pub async fn owned_room(&self, connection: ConnectionId) -> Option<RoomCode> {
        match &self.tables.lock().await.connections.get(&connection)?.record {
            Record::Owner { room } => Some(room.clone()),
            _ => None,
        }
    }
}

fn wrong_role(connection: ConnectionId, actual: Role, required: Role) -> SessionError {
    RoomError::InvalidRole(format!("{connection} is a {actual}, not a {required}")).into()
}
