//! Controller ability timers.

use std::collections::BTreeMap;

use zombeans_protocol::{AbilityCode, AbilityState};

use crate::SimConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Available,
    Active { remaining: u32 },
    CoolingDown { remaining: u32 },
}

/// The controller's four abilities and where each one is in its
/// available → active → cooling-down cycle.
#[derive(Debug, Clone)]
pub struct AbilitySet {
    phases: BTreeMap<AbilityCode, Phase>,
}

impl AbilitySet {
    pub fn new() -> Self {
        Self {
            phases: AbilityCode::ALL
                .into_iter()
                .map(|code| (code, Phase::Available))
                .collect(),
        }
    }

    pub fn is_active(&self, code: AbilityCode) -> bool {
        matches!(self.phase(code), Phase::Active { .. })
    }

    pub fn is_available(&self, code: AbilityCode) -> bool {
        self.phase(code) == Phase::Available
    }

    /// Starts `code` if it is available. Returns `false` (and changes
    /// nothing) while it is active or cooling down.
    pub fn activate(&mut self, code: AbilityCode, config: &SimConfig) -> bool {
        if !self.is_available(code) {
            return false;
        }
        let timing = config.timing(code);
        let phase = if timing.duration_ticks > 0 {
            Phase::Active {
                remaining: timing.duration_ticks,
            }
        } else {
            cooldown(timing.cooldown_ticks)
        };
        self.phases.insert(code, phase);
        true
    }

    /// Counts every timer down by one tick.
    pub fn tick(&mut self, config: &SimConfig) {
        for (code, phase) in self.phases.iter_mut() {
            *phase = match *phase {
                Phase::Available => Phase::Available,
                Phase::Active { remaining } if remaining > 1 => Phase::Active {
                    remaining: remaining - 1,
                },
                Phase::Active { .. } => cooldown(config.timing(*code).cooldown_ticks),
                Phase::CoolingDown { remaining } if remaining > 1 => Phase::CoolingDown {
                    remaining: remaining - 1,
                },
                Phase::CoolingDown { .. } => Phase::Available,
            };
        }
    }

    /// The wire view sent to every player.
    pub fn state(&self) -> AbilityState {
        let mut state = AbilityState::default();
        for (&code, &phase) in &self.phases {
            match phase {
                Phase::Available => state.available.push(code),
                Phase::Active { remaining } => {
                    state.active.insert(code, remaining);
                }
                Phase::CoolingDown { remaining } => {
                    state.cooling_down.insert(code, remaining);
                }
            }
        }
        state
    }

    fn phase(&self, code: AbilityCode) -> Phase {
        self.phases.get(&code).copied().unwrap_or(Phase::Available)
    }
}

impl Default for AbilitySet {
    fn default() -> Self {
        Self::new()
    }
}

fn cooldown(ticks: u32) -> Phase {
    if ticks > 0 {
        Phase::CoolingDown { remaining: ticks }
    } else {
        Phase::Available
    }
}
