//! Crown and score ledger.
//!
//! Match-global record of kills, bounties, crown possession and crown hold
//! time, keyed by participant id. Score records and the crown are only ever
//! changed through the operations on `ScoreLedger`.
//!
//! ## Rules
//! - Every participant kill adds a fixed bounty to the killer.
//! - Killing a participant with positive bounty pays that bounty to the
//!   killer as gold and zeroes it on the victim.
//! - The killer also takes half (rounded down) of the victim's kill counters.
//! - Killing the crown holder hands the crown straight to the killer.
//!
//! Operations naming an unregistered id are no-ops and log a warning.
//! After `freeze()` every mutation is ignored.

use crate::components::ActorId;
use crate::geometry::Vec2;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-participant score aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub monster_kills: u32,
    pub actor_kills: u32,
    pub bounty: i32,
    pub has_crown: bool,
    /// Seconds spent holding the crown.
    pub crown_hold_time: f32,
    /// Gold gained during this match.
    pub gold_earned: i32,
}

/// Where the crown currently is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CrownState {
    #[default]
    Unspawned,
    Dropped(Vec2),
    Held(ActorId),
}

/// What a participant kill changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KillOutcome {
    /// Victim bounty paid to the killer as gold.
    pub bounty_paid: i32,
    pub actor_kills_stolen: u32,
    pub monster_kills_stolen: u32,
    pub crown_transferred: bool,
}

/// One row of the final standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based placement.
    pub rank: usize,
    pub actor_id: ActorId,
    pub record: ScoreRecord,
}

/// Final standings computed once at match end.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalRanking {
    pub entries: Vec<RankingEntry>,
}

impl FinalRanking {
    pub fn winner(&self) -> Option<&RankingEntry> {
        self.entries.first()
    }

    pub fn placement_of(&self, actor_id: ActorId) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.actor_id == actor_id)
            .map(|e| e.rank)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct ScoreLedger {
    records: HashMap<ActorId, ScoreRecord>,
    /// Registration order, used as the stable tie-break.
    order: Vec<ActorId>,
    crown: CrownState,
    bounty_per_kill: i32,
    frozen: bool,
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ScoreLedger {
    pub fn new(bounty_per_kill: i32) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            crown: CrownState::Unspawned,
            bounty_per_kill,
            frozen: false,
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn record(&self, id: ActorId) -> Option<&ScoreRecord> {
        self.records.get(&id)
    }

    pub fn bounty_of(&self, id: ActorId) -> i32 {
        self.records.get(&id).map_or(0, |r| r.bounty)
    }

    pub fn crown(&self) -> CrownState {
        self.crown
    }

    pub fn crown_holder(&self) -> Option<ActorId> {
        match self.crown {
            CrownState::Held(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Registered ids in registration order.
    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &ScoreRecord)> {
        self.order
            .iter()
            .filter_map(move |id| self.records.get(id).map(|r| (*id, r)))
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Create a zeroed record for `id` if it has none.
    pub fn register_actor(&mut self, id: ActorId, display_name: &str) {
        if self.records.contains_key(&id) {
            return;
        }
        self.records.insert(
            id,
            ScoreRecord {
                name: display_name.to_string(),
                ..Default::default()
            },
        );
        self.order.push(id);
    }

    pub fn record_monster_kill(&mut self, killer: ActorId) -> bool {
        if self.frozen {
            return false;
        }
        match self.records.get_mut(&killer) {
            Some(record) => {
                record.monster_kills += 1;
                true
            }
            None => {
                log::warn!("monster kill for unregistered actor {:?}", killer);
                false
            }
        }
    }

    /// Score a participant kill. Returns `None` when nothing was recorded.
    pub fn record_actor_kill(&mut self, killer: ActorId, victim: ActorId) -> Option<KillOutcome> {
        if self.frozen || killer == victim {
            return None;
        }
        if !self.records.contains_key(&killer) || !self.records.contains_key(&victim) {
            log::warn!(
                "actor kill with unregistered participant: killer {:?}, victim {:?}",
                killer,
                victim
            );
            return None;
        }

        let mut outcome = KillOutcome::default();
        if let Some(v) = self.records.get_mut(&victim) {
            if v.bounty > 0 {
                outcome.bounty_paid = v.bounty;
                v.bounty = 0;
            }
            outcome.actor_kills_stolen = v.actor_kills / 2;
            outcome.monster_kills_stolen = v.monster_kills / 2;
            v.actor_kills -= outcome.actor_kills_stolen;
            v.monster_kills -= outcome.monster_kills_stolen;
        }

        let bounty_per_kill = self.bounty_per_kill;
        if let Some(k) = self.records.get_mut(&killer) {
            k.actor_kills += 1 + outcome.actor_kills_stolen;
            k.monster_kills += outcome.monster_kills_stolen;
            k.bounty += bounty_per_kill;
            k.gold_earned += outcome.bounty_paid;
        }

        if self.crown == CrownState::Held(victim) {
            self.set_holder(killer);
            outcome.crown_transferred = true;
            log::info!("crown taken from {:?} by {:?}", victim, killer);
        }

        Some(outcome)
    }

    /// Give the crown to `actor`, clearing the previous holder.
    pub fn handle_crown_pickup(&mut self, actor: ActorId) -> bool {
        if self.frozen {
            return false;
        }
        if !self.records.contains_key(&actor) {
            log::warn!("crown pickup by unregistered actor {:?}", actor);
            return false;
        }
        self.set_holder(actor);
        true
    }

    /// Place the crown in the arena. Only the first call has an effect.
    pub fn spawn_crown(&mut self, at: Vec2) -> bool {
        if self.frozen || self.crown != CrownState::Unspawned {
            return false;
        }
        self.crown = CrownState::Dropped(at);
        log::info!("crown spawned at ({:.1}, {:.1})", at.x, at.y);
        true
    }

    /// Drop the crown where its holder fell.
    pub fn drop_crown(&mut self, holder: ActorId, at: Vec2) -> bool {
        if self.frozen || self.crown != CrownState::Held(holder) {
            return false;
        }
        if let Some(record) = self.records.get_mut(&holder) {
            record.has_crown = false;
        }
        self.crown = CrownState::Dropped(at);
        log::info!("crown dropped by {:?}", holder);
        true
    }

    /// Add match gold to a participant.
    pub fn credit_gold(&mut self, actor: ActorId, amount: i32) -> bool {
        if self.frozen {
            return false;
        }
        match self.records.get_mut(&actor) {
            Some(record) => {
                record.gold_earned += amount;
                true
            }
            None => {
                log::warn!("gold credit for unregistered actor {:?}", actor);
                false
            }
        }
    }

    /// Accrue crown hold time for the current holder.
    pub fn tick(&mut self, dt: f32) {
        if self.frozen {
            return;
        }
        if let Some(holder) = self.crown_holder() {
            if let Some(record) = self.records.get_mut(&holder) {
                record.crown_hold_time += dt;
            }
        }
    }

    /// Stop accepting mutations.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Crown holder first, then participant kills, then monster kills, both
    /// descending. Equal rows keep registration order.
    pub fn compute_final_ranking(&self) -> FinalRanking {
        let mut rows: Vec<(ActorId, &ScoreRecord)> = self.actors().collect();
        rows.sort_by(|(_, a), (_, b)| {
            b.has_crown
                .cmp(&a.has_crown)
                .then(b.actor_kills.cmp(&a.actor_kills))
                .then(b.monster_kills.cmp(&a.monster_kills))
        });
        FinalRanking {
            entries: rows
                .into_iter()
                .enumerate()
                .map(|(i, (actor_id, record))| RankingEntry {
                    rank: i + 1,
                    actor_id,
                    record: record.clone(),
                })
                .collect(),
        }
    }

    fn set_holder(&mut self, actor: ActorId) {
        if let CrownState::Held(previous) = self.crown {
            if let Some(record) = self.records.get_mut(&previous) {
                record.has_crown = false;
            }
        }
        if let Some(record) = self.records.get_mut(&actor) {
            record.has_crown = true;
        }
        self.crown = CrownState::Held(actor);
    }
}
