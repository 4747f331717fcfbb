//! A single game room: roster, lifecycle, simulation, and fan-out.
//!
//! A `Room` is plain data guarded by one `tokio::sync::Mutex`
//! ([`SharedRoom`]). Everything that touches it (joins, input, ticks,
//! teardown) runs under that lock, so a tick never sees half of a
//! roster change and a stop never races a publish.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zombeans_protocol::{
    AbilityCode, ArenaDescription, ConnectionId, Direction, GameOverReason, Outbound, OwnerEvent,
    PlayerEvent, RoomCode, RosterEntry, Slot, ViewerEvent,
};
use zombeans_sim::World;
use zombeans_tick::StopSignal;

use crate::{RoomConfig, RoomError, RoomState, ticker};

/// Channel sender for delivering outbound messages to one connection.
pub type Mailbox = mpsc::UnboundedSender<Outbound>;

/// A room behind its per-room lock.
pub type SharedRoom = Arc<Mutex<Room>>;

/// A joined player.
#[derive(Debug)]
struct Member {
    connection: ConnectionId,
    slot: Slot,
    display_name: String,
    mailbox: Mailbox,
}

/// Whether the tick driver should keep going after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickProgress {
    Continue,
    Finished,
}

/// Everyone who was attached to a room when it was torn down.
#[derive(Debug, Default)]
pub struct Departed {
    pub players: Vec<ConnectionId>,
    pub viewers: Vec<ConnectionId>,
}

/// One room and everything it owns.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    owner: ConnectionId,
    owner_mailbox: Mailbox,
    config: RoomConfig,
    state: RoomState,
    /// Join order.
    members: Vec<Member>,
    viewers: BTreeMap<ConnectionId, Mailbox>,
    next_slot: u32,
    world: Option<World>,
    stop: StopSignal,
    ticker: Option<JoinHandle<()>>,
}

impl Room {
    /// Creates a room in `Lobby`. The config is validated first.
    pub fn new(
        code: RoomCode,
        owner: ConnectionId,
        owner_mailbox: Mailbox,
        config: RoomConfig,
    ) -> Self {
        Self {
            code,
            owner,
            owner_mailbox,
            config: config.validated(),
            state: RoomState::Lobby,
            members: Vec::new(),
            viewers: BTreeMap::new(),
            next_slot: 0,
            world: None,
            stop: StopSignal::new(),
            ticker: None,
        }
    }

    /// Wraps the room in its lock.
    pub fn shared(self) -> SharedRoom {
        Arc::new(Mutex::new(self))
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Appends a player to the roster and tells the owner.
    ///
    /// Returns the slot the player now holds.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        display_name: String,
        mailbox: Mailbox,
    ) -> Result<Slot, RoomError> {
        if !self.state.is_joinable() {
            let reason = if self.state.is_running() {
                "game already started"
            } else {
                "game is over"
            };
            return Err(RoomError::NotOpen {
                code: self.code.clone(),
                reason: reason.into(),
            });
        }
        if self.is_member(connection) {
            return Err(RoomError::NotOpen {
                code: self.code.clone(),
                reason: "already in a room".into(),
            });
        }
        if self.members.len() >= self.config.max_players {
            return Err(RoomError::Full(self.code.clone()));
        }

        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        self.members.push(Member {
            connection,
            slot,
            display_name: display_name.clone(),
            mailbox,
        });

        info!(
            code = %self.code,
            %connection,
            %slot,
            players = self.members.len(),
            "player joined"
        );

        self.send_owner(OwnerEvent::PlayerJoined {
            roster: self.roster(),
            new_player_name: display_name,
        });
        Ok(slot)
    }

    /// Removes a player. While running, its entity leaves the world and
    /// the game carries on without it.
    pub fn leave(&mut self, connection: ConnectionId) -> Result<Slot, RoomError> {
        let index = self
            .members
            .iter()
            .position(|m| m.connection == connection)
            .ok_or_else(|| {
                RoomError::Precondition(format!("{connection} is not in room {}", self.code))
            })?;
        let member = self.members.remove(index);

        if self.state.is_running() {
            if let Some(world) = self.world.as_mut() {
                world.remove(member.slot)?;
            }
        }

        info!(
            code = %self.code,
            %connection,
            slot = %member.slot,
            players = self.members.len(),
            "player left"
        );
        Ok(member.slot)
    }

    /// Attaches a viewer and returns what it needs for its `view_response`.
    pub fn add_viewer(
        &mut self,
        connection: ConnectionId,
        mailbox: Mailbox,
    ) -> (Vec<RosterEntry>, ArenaDescription) {
        self.viewers.insert(connection, mailbox);
        debug!(code = %self.code, %connection, viewers = self.viewers.len(), "viewer attached");
        (self.viewer_roster(), self.arena_description())
    }

    pub fn remove_viewer(&mut self, connection: ConnectionId) -> bool {
        let removed = self.viewers.remove(&connection).is_some();
        if removed {
            debug!(code = %self.code, %connection, "viewer detached");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts the game and its tick driver.
    ///
    /// `handle` must be the lock this room lives in; the driver task
    /// keeps a clone of it.
    pub fn start(&mut self, handle: &SharedRoom) -> Result<(), RoomError> {
        if !self.state.is_joinable() {
            return Err(RoomError::NotOpen {
                code: self.code.clone(),
                reason: format!("cannot start a room in state {}", self.state),
            });
        }
        let have = self.members.len();
        if have < self.config.min_players {
            return Err(RoomError::InsufficientPlayers {
                have,
                need: self.config.min_players,
            });
        }

        let slots: Vec<Slot> = self.members.iter().map(|m| m.slot).collect();
        let (seed, controller) = self.roles(&slots);
        let world = World::seeded(
            self.config.sim.clone(),
            self.config.arena,
            &slots,
            Some(seed),
            controller,
        )?;
        self.world = Some(world);
        self.transition(RoomState::Running)?;

        info!(
            code = %self.code,
            players = have,
            %seed,
            controller = ?controller,
            "game started"
        );

        self.send_players(PlayerEvent::GameStarting);
        self.send_viewers(ViewerEvent::GameStarting {
            arena: self.arena_description(),
        });

        self.ticker = Some(ticker::spawn(
            Arc::clone(handle),
            self.code.clone(),
            self.config.tick.clone(),
            self.stop.clone(),
        ));
        Ok(())
    }

    /// Picks the seed and controller among the slots present at start.
    ///
    /// Configured slots are used while their players are still here. A
    /// departed seed falls to the lowest remaining slot, a departed
    /// controller to the higher of the first two remaining slots. The
    /// two roles never share a slot.
    fn roles(&self, slots: &[Slot]) -> (Slot, Option<Slot>) {
        let present = |slot: &Slot| slots.contains(slot);
        let seed = Some(self.config.seed_slot)
            .filter(present)
            .or_else(|| slots.first().copied())
            .unwrap_or(self.config.seed_slot);

        let controller = self.config.controller_slot.and_then(|wanted| {
            if present(&wanted) && wanted != seed {
                return Some(wanted);
            }
            slots
                .iter()
                .take(2)
                .copied()
                .filter(|slot| *slot != seed)
                .last()
                .or_else(|| slots.iter().copied().find(|slot| *slot != seed))
        });

        if seed != self.config.seed_slot || controller != self.config.controller_slot {
            info!(
                code = %self.code,
                %seed,
                controller = ?controller,
                "configured role slots left the lobby, roles reassigned"
            );
        }
        (seed, controller)
    }

    /// Runs one simulation step and publishes its result.
    ///
    /// On a terminal outcome the room finishes, everyone gets
    /// `game_over`, and the stop signal is raised.
    pub fn tick(&mut self, dt: Duration) -> TickProgress {
        let Some(world) = self.world.as_mut() else {
            warn!(code = %self.code, "tick without a world, stopping");
            self.stop.stop();
            return TickProgress::Finished;
        };
        let snapshot = world.advance(dt);

        if let Some(reason) = GameOverReason::from_outcome(snapshot.outcome) {
            if let Err(err) = self.transition(RoomState::Finished) {
                warn!(code = %self.code, %err, "finishing room");
            }
            self.stop.stop();
            info!(code = %self.code, tick = snapshot.tick, ?reason, "game over");
            self.send_players(PlayerEvent::GameOver { reason });
            self.send_viewers(ViewerEvent::GameOver { reason });
            return TickProgress::Finished;
        }

        self.send_viewers(ViewerEvent::Tick {
            tick: snapshot.tick,
            per_slot: snapshot.entities,
        });
        if let Some(abilities) = snapshot.abilities {
            self.send_players(PlayerEvent::AbilityState(abilities));
        }
        TickProgress::Continue
    }

    /// Tears the room down after its owner left.
    ///
    /// Stops the driver, finishes the room, tells every member and
    /// viewer the session ended, and hands back who was attached.
    pub fn end_session(&mut self) -> Departed {
        self.stop.stop();
        if !self.state.is_terminal() {
            if let Err(err) = self.transition(RoomState::Finished) {
                warn!(code = %self.code, %err, "finishing room");
            }
        }

        let reason = GameOverReason::SessionEnded;
        self.send_players(PlayerEvent::GameOver { reason });
        self.send_viewers(ViewerEvent::GameOver { reason });

        // The driver exits on its own once it sees the flag.
        self.ticker = None;
        self.world = None;

        let departed = Departed {
            players: self.members.drain(..).map(|m| m.connection).collect(),
            viewers: std::mem::take(&mut self.viewers).into_keys().collect(),
        };
        info!(
            code = %self.code,
            players = departed.players.len(),
            viewers = departed.viewers.len(),
            "session ended"
        );
        departed
    }

    fn transition(&mut self, target: RoomState) -> Result<(), RoomError> {
        if !self.state.can_transition_to(target) {
            return Err(RoomError::Precondition(format!(
                "illegal transition {} -> {target}",
                self.state
            )));
        }
        debug!(code = %self.code, from = %self.state, to = %target, "room state changed");
        self.state = target;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Forwards a key press or release. A no-op unless running.
    pub fn input(
        &mut self,
        connection: ConnectionId,
        direction: Direction,
        pressed: bool,
    ) -> Result<(), RoomError> {
        let slot = self.require_slot(connection)?;
        match self.world.as_mut() {
            Some(world) if self.state.is_running() => {
                world.apply_input(slot, direction, pressed)?;
            }
            _ => debug!(code = %self.code, %slot, state = %self.state, "input outside a running game"),
        }
        Ok(())
    }

    /// Activates a controller ability. Returns whether it took effect.
    pub fn ability(&mut self, connection: ConnectionId, code: AbilityCode) -> Result<bool, RoomError> {
        let slot = self.require_slot(connection)?;
        match self.world.as_mut() {
            Some(world) if self.state.is_running() => Ok(world.activate_ability(slot, code)?),
            _ => {
                debug!(code = %self.code, %slot, ability = %code, "ability outside a running game");
                Ok(false)
            }
        }
    }

    fn require_slot(&self, connection: ConnectionId) -> Result<Slot, RoomError> {
        self.slot_of(connection).ok_or_else(|| {
            RoomError::Precondition(format!("{connection} is not in room {}", self.code))
        })
    }

    // -----------------------------------------------------------------------
    // Fan-out
    // -----------------------------------------------------------------------

    /// Sends to the owner. Silently drops if the owner is gone.
    pub fn send_owner(&self, event: impl Into<Outbound>) {
        let _ = self.owner_mailbox.send(event.into());
    }

    /// Sends to every player in the roster.
    pub fn send_players(&self, event: impl Into<Outbound>) {
        let event = event.into();
        for member in &self.members {
            let _ = member.mailbox.send(event.clone());
        }
    }

    /// Sends to every attached viewer.
    pub fn send_viewers(&self, event: impl Into<Outbound>) {
        let event = event.into();
        for mailbox in self.viewers.values() {
            let _ = mailbox.send(event.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn owner(&self) -> ConnectionId {
        self.owner
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_member(&self, connection: ConnectionId) -> bool {
        self.members.iter().any(|m| m.connection == connection)
    }

    pub fn slot_of(&self, connection: ConnectionId) -> Option<Slot> {
        self.members
            .iter()
            .find(|m| m.connection == connection)
            .map(|m| m.slot)
    }

    /// Whether `slot` is the configured controller slot.
    /// Whether `slot` holds the controller role: the configured slot in
    /// the lobby, the one actually assigned once the game started.
    pub fn is_controller_slot(&self, slot: Slot) -> bool {
        match &self.world {
            Some(world) => world.controller() == Some(slot),
            None => self.config.controller_slot == Some(slot),
        }
    }

    /// The roster as the owner sees it.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.members
            .iter()
            .map(|m| RosterEntry {
                slot: m.slot,
                display_name: m.display_name.clone(),
                connection: None,
            })
            .collect()
    }

    /// The roster as viewers see it, with connection ids.
    pub fn viewer_roster(&self) -> Vec<RosterEntry> {
        self.members
            .iter()
            .map(|m| RosterEntry {
                slot: m.slot,
                display_name: m.display_name.clone(),
                connection: Some(m.connection.into_inner()),
            })
            .collect()
    }

    pub fn arena_description(&self) -> ArenaDescription {
        self.config.arena.describe(self.config.sim.entity_radius)
    }

    /// The running simulation, if the game has started.
    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }
}
