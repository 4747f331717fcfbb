//! The simulation world: entities, controller abilities, and the
//! fixed-step update.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, trace};
use zombeans_protocol::{AbilityCode, AbilityState, Direction, EntityState, Outcome, Slot, Vec2};

use crate::{AbilitySet, Arena, Entity, SimConfig, SimError};

/// What one tick produced: every entity's state plus the verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Number of ticks elapsed, including the one that produced this.
    pub tick: u64,
    pub entities: BTreeMap<Slot, EntityState>,
    /// `None` when the room has no controller.
    pub abilities: Option<AbilityState>,
    pub outcome: Outcome,
}

/// A deterministic tag-game simulation.
///
/// Nothing in here knows about time or connections: callers inject
/// input and call [`advance`](Self::advance) once per tick.
#[derive(Debug, Clone)]
pub struct World {
    config: SimConfig,
    arena: Arena,
    entities: BTreeMap<Slot, Entity>,
    controller: Option<Slot>,
    abilities: Option<AbilitySet>,
    elapsed_ticks: u64,
    outcome: Outcome,
}

impl World {
    /// An empty world.
    pub fn new(config: SimConfig, arena: Arena) -> Self {
        Self {
            config,
            arena,
            entities: BTreeMap::new(),
            controller: None,
            abilities: None,
            elapsed_ticks: 0,
            outcome: Outcome::None,
        }
    }

    /// A world with one entity per slot, laid out on a ring around the
    /// arena centre in the order given.
    ///
    /// `seed` starts infected. `controller` gets the ability set if one
    /// of `slots` holds it and is otherwise ignored.
    pub fn seeded(
        config: SimConfig,
        arena: Arena,
        slots: &[Slot],
        seed: Option<Slot>,
        controller: Option<Slot>,
    ) -> Result<Self, SimError> {
        let mut world = Self::new(config, arena);
        for (&slot, position) in slots.iter().zip(arena.ring_positions(slots.len())) {
            let entity = Entity::new(slot, position);
            if Some(slot) == seed {
                world.spawn(entity.infected())?;
            } else {
                world.spawn(entity)?;
            }
        }
        if let Some(slot) = controller.filter(|slot| world.entities.contains_key(slot)) {
            world.set_controller(slot)?;
        }
        Ok(world)
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Adds an entity, pulling it inside the arena if it was placed
    /// outside.
    pub fn spawn(&mut self, mut entity: Entity) -> Result<(), SimError> {
        let slot = entity.slot();
        if self.entities.contains_key(&slot) {
            return Err(SimError::DuplicateSlot(slot));
        }
        entity.set_position(self.arena.clamp(entity.position(), self.config.entity_radius));
        if self.controller == Some(slot) {
            entity.set_infected(false);
        }
        self.entities.insert(slot, entity);
        Ok(())
    }

    /// Makes `slot` the controller: it is healed, can never be infected
    /// again, and gets a fresh ability set.
    pub fn set_controller(&mut self, slot: Slot) -> Result<(), SimError> {
        let entity = self
            .entities
            .get_mut(&slot)
            .ok_or(SimError::UnknownSlot(slot))?;
        entity.set_infected(false);
        self.controller = Some(slot);
        self.abilities = Some(AbilitySet::new());
        debug!(%slot, "controller assigned");
        Ok(())
    }

    /// Drops an entity mid-game. The controller's abilities go with it.
    pub fn remove(&mut self, slot: Slot) -> Result<Entity, SimError> {
        let entity = self
            .entities
            .remove(&slot)
            .ok_or(SimError::UnknownSlot(slot))?;
        if self.controller == Some(slot) {
            self.controller = None;
            self.abilities = None;
        }
        debug!(%slot, remaining = self.entities.len(), "entity removed");
        Ok(entity)
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Sets or clears one direction key. Movement happens at the next
    /// [`advance`](Self::advance).
    pub fn apply_input(
        &mut self,
        slot: Slot,
        direction: Direction,
        pressed: bool,
    ) -> Result<(), SimError> {
        let entity = self
            .entities
            .get_mut(&slot)
            .ok_or(SimError::UnknownSlot(slot))?;
        entity.set_pressed(direction, pressed);
        Ok(())
    }

    /// Activates one of the controller's abilities.
    ///
    /// Returns `Ok(false)` without changing anything if the ability is
    /// active or cooling down. Cure takes effect immediately.
    pub fn activate_ability(&mut self, slot: Slot, code: AbilityCode) -> Result<bool, SimError> {
        if !self.entities.contains_key(&slot) {
            return Err(SimError::UnknownSlot(slot));
        }
        let abilities = match (self.controller, self.abilities.as_mut()) {
            (Some(controller), Some(abilities)) if controller == slot => abilities,
            _ => return Err(SimError::NotController(slot)),
        };
        if !abilities.activate(code, &self.config) {
            debug!(%slot, %code, "ability not available");
            return Ok(false);
        }

        if code == AbilityCode::Cure {
            let mut cured = 0;
            for entity in self.entities.values_mut().filter(|e| e.is_infected()) {
                entity.set_infected(false);
                cured += 1;
            }
            debug!(%slot, cured, "cure applied");
        } else {
            debug!(%slot, %code, "ability activated");
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Runs one fixed step: velocity, position, infection, ability
    /// timers, then the win check.
    pub fn advance(&mut self, dt: Duration) -> Snapshot {
        let dt = dt.as_secs_f32();
        let frozen = self.ability_active(AbilityCode::Freeze);
        let boosted = self.ability_active(AbilityCode::SpeedUp);
        let immune = self.ability_active(AbilityCode::Immune);
        let radius = self.config.entity_radius;
        let arena = self.arena;

        for entity in self.entities.values_mut() {
            if frozen && entity.is_infected() {
                entity.set_velocity(Vec2::ZERO);
                continue;
            }
            let boost = if boosted && !entity.is_infected() {
                self.config.speed_up_factor
            } else {
                1.0
            };
            let accel = self.config.acceleration * boost;
            let max = self.config.max_velocity * boost;

            let v = entity.velocity();
            let v = Vec2::new(
                step_axis(v.x, entity.axis_x(), accel, max),
                step_axis(v.y, entity.axis_y(), accel, max),
            );
            entity.set_velocity(v);
            entity.set_position(arena.clamp(entity.position() + v * dt, radius));
        }

        if !immune {
            self.spread_infection();
        }

        if let Some(abilities) = self.abilities.as_mut() {
            abilities.tick(&self.config);
        }
        if boosted && !self.ability_active(AbilityCode::SpeedUp) {
            self.end_speed_up();
        }

        self.elapsed_ticks += 1;
        let outcome = self.evaluate();
        if outcome.is_terminal() && !self.outcome.is_terminal() {
            info!(tick = self.elapsed_ticks, ?outcome, "game decided");
        }
        self.outcome = outcome;

        trace!(tick = self.elapsed_ticks, "world advanced");
        self.snapshot()
    }

    /// Pulls boosted velocities back under the normal limit.
    fn end_speed_up(&mut self) {
        let max = self.config.max_velocity;
        for entity in self.entities.values_mut() {
            let v = entity.velocity();
            entity.set_velocity(Vec2::new(v.x.clamp(-max, max), v.y.clamp(-max, max)));
        }
        debug!(tick = self.elapsed_ticks + 1, "speed up expired");
    }

    /// Infects every healthy entity touching an entity that was already
    /// infected when this step began.
    fn spread_infection(&mut self) {
        let carriers: Vec<Vec2> = self
            .entities
            .values()
            .filter(|e| e.is_infected())
            .map(Entity::position)
            .collect();
        if carriers.is_empty() {
            return;
        }

        let reach = 2.0 * self.config.entity_radius;
        let reach_squared = reach * reach;
        let controller = self.controller;

        for entity in self.entities.values_mut() {
            if entity.is_infected() || Some(entity.slot()) == controller {
                continue;
            }
            let touched = carriers
                .iter()
                .any(|&c| (c - entity.position()).length_squared() <= reach_squared);
            if touched {
                entity.set_infected(true);
                debug!(slot = %entity.slot(), "entity infected");
            }
        }
    }

    fn evaluate(&self) -> Outcome {
        let everyone_infected = self
            .entities
            .values()
            .filter(|e| Some(e.slot()) != self.controller)
            .all(Entity::is_infected);

        if everyone_infected {
            Outcome::InfectedWin
        } else if self.elapsed_ticks > self.config.max_ticks {
            Outcome::SurvivorsWin
        } else {
            Outcome::None
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.elapsed_ticks,
            entities: self
                .entities
                .iter()
                .map(|(&slot, e)| (slot, e.state()))
                .collect(),
            abilities: self.ability_state(),
            outcome: self.outcome,
        }
    }

    pub fn ability_state(&self) -> Option<AbilityState> {
        self.abilities.as_ref().map(AbilitySet::state)
    }

    pub fn ability_active(&self, code: AbilityCode) -> bool {
        self.abilities
            .as_ref()
            .is_some_and(|abilities| abilities.is_active(code))
    }

    pub fn entity(&self, slot: Slot) -> Option<&Entity> {
        self.entities.get(&slot)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn controller(&self) -> Option<Slot> {
        self.controller
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// New velocity along one axis. With no key held (or both) the axis
/// stops dead; otherwise it accelerates towards the held side and is
/// clamped to `±max`.
fn step_axis(velocity: f32, direction: f32, accel: f32, max: f32) -> f32 {
    if direction == 0.0 {
        0.0
    } else {
        (velocity + direction * accel).clamp(-max, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AbilityTiming;

    const DT: Duration = Duration::from_millis(10);

    fn config() -> SimConfig {
        SimConfig {
            entity_radius: 25.0,
            acceleration: 40.0,
            max_velocity: 200.0,
            speed_up_factor: 2.0,
            max_ticks: 100,
            freeze: AbilityTiming::new(3, 5),
            speed_up: AbilityTiming::new(3, 5),
            immune: AbilityTiming::new(3, 5),
            cure: AbilityTiming::new(0, 5),
        }
    }

    /// Three entities far apart: slot 0 infected, slot 1 controller,
    /// slot 2 healthy.
    fn world() -> World {
        let mut w = World::new(config(), Arena::new(800.0, 600.0));
        w.spawn(Entity::new(Slot(0), Vec2::new(100.0, 100.0)).infected())
            .unwrap();
        w.spawn(Entity::new(Slot(1), Vec2::new(400.0, 300.0))).unwrap();
        w.spawn(Entity::new(Slot(2), Vec2::new(700.0, 500.0))).unwrap();
        w.set_controller(Slot(1)).unwrap();
        w
    }

    // =====================================================================
    // Construction
    // =====================================================================

    #[test]
    fn test_spawn_duplicate_slot_fails() {
        let mut w = world();
        let err = w.spawn(Entity::new(Slot(2), Vec2::ZERO)).unwrap_err();
        assert_eq!(err, SimError::DuplicateSlot(Slot(2)));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn test_spawn_clamps_into_arena() {
        let mut w = World::new(config(), Arena::new(800.0, 600.0));
        w.spawn(Entity::new(Slot(0), Vec2::new(-50.0, 900.0))).unwrap();
        assert_eq!(w.entity(Slot(0)).unwrap().position(), Vec2::new(25.0, 575.0));
    }

    #[test]
    fn test_seeded_infects_seed_and_assigns_controller() {
        let slots = [Slot(0), Slot(1), Slot(2)];
        let w = World::seeded(config(), Arena::default(), &slots, Some(Slot(0)), Some(Slot(1)))
            .unwrap();
        assert!(w.entity(Slot(0)).unwrap().is_infected());
        assert!(!w.entity(Slot(2)).unwrap().is_infected());
        assert_eq!(w.controller(), Some(Slot(1)));
        assert!(w.ability_state().is_some());
    }

    #[test]
    fn test_seeded_without_controller_slot_has_no_abilities() {
        let w = World::seeded(config(), Arena::default(), &[Slot(0)], Some(Slot(0)), Some(Slot(1)))
            .unwrap();
        assert_eq!(w.controller(), None);
        assert_eq!(w.ability_state(), None);
    }

    #[test]
    fn test_controller_is_never_the_seed() {
        let w = World::seeded(config(), Arena::default(), &[Slot(0), Slot(1)], Some(Slot(1)), Some(Slot(1)))
            .unwrap();
        assert!(!w.entity(Slot(1)).unwrap().is_infected());
    }

    // =====================================================================
    // Input and movement
    // =====================================================================

    #[test]
    fn test_apply_input_unknown_slot_fails() {
        let mut w = world();
        let err = w.apply_input(Slot(9), Direction::Up, true).unwrap_err();
        assert_eq!(err, SimError::UnknownSlot(Slot(9)));
    }

    #[test]
    fn test_input_alone_does_not_move() {
        let mut w = world();
        w.apply_input(Slot(2), Direction::Left, true).unwrap();
        assert_eq!(w.entity(Slot(2)).unwrap().velocity(), Vec2::ZERO);
        assert_eq!(w.entity(Slot(2)).unwrap().position(), Vec2::new(700.0, 500.0));
    }

    #[test]
    fn test_velocity_accelerates_then_caps() {
        let mut w = world();
        w.apply_input(Slot(2), Direction::Left, true).unwrap();

        w.advance(DT);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().x, -40.0);
        for _ in 0..10 {
            w.advance(DT);
        }
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().x, -200.0);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().y, 0.0);
    }

    #[test]
    fn test_release_stops_axis() {
        let mut w = world();
        w.apply_input(Slot(2), Direction::Up, true).unwrap();
        w.advance(DT);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().y, -40.0);

        w.apply_input(Slot(2), Direction::Up, false).unwrap();
        w.advance(DT);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_position_integrates_velocity_times_dt() {
        let mut w = world();
        w.apply_input(Slot(2), Direction::Left, true).unwrap();
        w.advance(DT);
        // 40 units/s for 10 ms.
        let x = w.entity(Slot(2)).unwrap().position().x;
        assert!((x - 699.6).abs() < 1e-3, "x = {x}");
    }

    #[test]
    fn test_wall_clamp() {
        let mut w = World::new(config(), Arena::new(800.0, 600.0));
        w.spawn(Entity::new(Slot(0), Vec2::new(26.0, 300.0))).unwrap();
        w.apply_input(Slot(0), Direction::Left, true).unwrap();
        for _ in 0..20 {
            w.advance(DT);
        }
        assert_eq!(w.entity(Slot(0)).unwrap().position().x, 25.0);
    }

    // =====================================================================
    // Abilities
    // =====================================================================

    #[test]
    fn test_activate_ability_requires_controller() {
        let mut w = world();
        assert_eq!(
            w.activate_ability(Slot(2), AbilityCode::Freeze),
            Err(SimError::NotController(Slot(2)))
        );
        assert_eq!(
            w.activate_ability(Slot(7), AbilityCode::Freeze),
            Err(SimError::UnknownSlot(Slot(7)))
        );
        assert_eq!(w.activate_ability(Slot(1), AbilityCode::Freeze), Ok(true));
        assert_eq!(w.activate_ability(Slot(1), AbilityCode::Freeze), Ok(false));
    }

    #[test]
    fn test_freeze_stops_infected_only() {
        let mut w = world();
        w.apply_input(Slot(0), Direction::Right, true).unwrap();
        w.apply_input(Slot(2), Direction::Left, true).unwrap();
        w.activate_ability(Slot(1), AbilityCode::Freeze).unwrap();

        w.advance(DT);
        assert_eq!(w.entity(Slot(0)).unwrap().position(), Vec2::new(100.0, 100.0));
        assert_eq!(w.entity(Slot(0)).unwrap().velocity(), Vec2::ZERO);
        assert_ne!(w.entity(Slot(2)).unwrap().position(), Vec2::new(700.0, 500.0));
    }

    #[test]
    fn test_speed_up_raises_bound_for_healthy_only() {
        let mut w = world();
        w.apply_input(Slot(0), Direction::Right, true).unwrap();
        w.apply_input(Slot(2), Direction::Left, true).unwrap();
        w.activate_ability(Slot(1), AbilityCode::SpeedUp).unwrap();

        w.advance(DT);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().x, -80.0);
        assert_eq!(w.entity(Slot(0)).unwrap().velocity().x, 40.0);
    }

    #[test]
    fn test_speed_up_expiry_restores_normal_limit() {
        let mut w = world();
        w.apply_input(Slot(2), Direction::Left, true).unwrap();
        w.activate_ability(Slot(1), AbilityCode::SpeedUp).unwrap();

        w.advance(DT);
        w.advance(DT);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().x, -160.0);
        assert!(w.ability_active(AbilityCode::SpeedUp));

        // The third boosted step reaches -240, then the boost ends.
        w.advance(DT);
        assert!(!w.ability_active(AbilityCode::SpeedUp));
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().x, -200.0);

        w.advance(DT);
        assert_eq!(w.entity(Slot(2)).unwrap().velocity().x, -200.0);
    }

    #[test]
    fn test_cure_heals_everyone_at_once() {
        let mut w = world();
        assert_eq!(w.activate_ability(Slot(1), AbilityCode::Cure), Ok(true));
        assert!(w.entities().all(|e| !e.is_infected()));
        let state = w.ability_state().unwrap();
        assert_eq!(state.cooling_down[&AbilityCode::Cure], 5);
    }

    #[test]
    fn test_removing_controller_drops_abilities() {
        let mut w = world();
        w.remove(Slot(1)).unwrap();
        assert_eq!(w.controller(), None);
        assert_eq!(w.ability_state(), None);
        assert_eq!(w.remove(Slot(1)).unwrap_err(), SimError::UnknownSlot(Slot(1)));
    }

    // =====================================================================
    // Infection and outcome
    // =====================================================================

    #[test]
    fn test_contact_infects() {
        let mut w = World::new(config(), Arena::new(800.0, 600.0));
        w.spawn(Entity::new(Slot(0), Vec2::new(100.0, 100.0)).infected())
            .unwrap();
        w.spawn(Entity::new(Slot(1), Vec2::new(149.0, 100.0))).unwrap();
        w.spawn(Entity::new(Slot(2), Vec2::new(500.0, 100.0))).unwrap();

        let snap = w.advance(DT);
        assert!(snap.entities[&Slot(1)].infected);
        assert!(!snap.entities[&Slot(2)].infected);
    }

    #[test]
    fn test_infection_spreads_one_hop_per_tick() {
        let mut w = World::new(config(), Arena::new(800.0, 600.0));
        w.spawn(Entity::new(Slot(0), Vec2::new(100.0, 100.0)).infected())
            .unwrap();
        w.spawn(Entity::new(Slot(1), Vec2::new(140.0, 100.0))).unwrap();
        w.spawn(Entity::new(Slot(2), Vec2::new(180.0, 100.0))).unwrap();
        w.spawn(Entity::new(Slot(3), Vec2::new(700.0, 500.0))).unwrap();

        w.advance(DT);
        assert!(w.entity(Slot(1)).unwrap().is_infected());
        assert!(!w.entity(Slot(2)).unwrap().is_infected());
        w.advance(DT);
        assert!(w.entity(Slot(2)).unwrap().is_infected());
    }

    #[test]
    fn test_immune_blocks_infection() {
        let mut w = world();
        w.spawn(Entity::new(Slot(3), Vec2::new(120.0, 100.0))).unwrap();
        w.activate_ability(Slot(1), AbilityCode::Immune).unwrap();

        w.advance(DT);
        assert!(!w.entity(Slot(3)).unwrap().is_infected());
    }

    #[test]
    fn test_controller_is_never_infected() {
        let mut w = world();
        w.spawn(Entity::new(Slot(3), Vec2::new(400.0, 310.0)).infected())
            .unwrap();
        w.advance(DT);
        assert!(!w.entity(Slot(1)).unwrap().is_infected());
    }

    #[test]
    fn test_infected_win_ignores_controller() {
        let mut w = world();
        w.spawn(Entity::new(Slot(3), Vec2::new(700.0, 520.0)).infected())
            .unwrap();
        let snap = w.advance(DT);
        assert_eq!(snap.outcome, Outcome::InfectedWin);
    }

    #[test]
    fn test_survivors_win_after_max_ticks() {
        let mut w = world();
        for _ in 0..100 {
            assert_eq!(w.advance(DT).outcome, Outcome::None);
        }
        let snap = w.advance(DT);
        assert_eq!(snap.tick, 101);
        assert_eq!(snap.outcome, Outcome::SurvivorsWin);
    }

    #[test]
    fn test_snapshot_carries_abilities_and_tick() {
        let mut w = world();
        w.activate_ability(Slot(1), AbilityCode::Immune).unwrap();
        let snap = w.advance(DT);
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.entities.len(), 3);
        assert_eq!(snap.abilities.unwrap().active[&AbilityCode::Immune], 2);
    }
}
