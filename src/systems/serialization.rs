//! Serialization utilities for match state.

use crate::ledger::FinalRanking;
use crate::world::Snapshot;

/// Serialize a snapshot to JSON bytes.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(snapshot)
}

/// Serialize a snapshot to a JSON string.
pub fn snapshot_to_json_string(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

/// Deserialize a snapshot from JSON bytes.
pub fn snapshot_from_json(data: &[u8]) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Deserialize a snapshot from a JSON string.
pub fn snapshot_from_json_string(data: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(data)
}

/// Serialize the final standings to a JSON string.
pub fn ranking_to_json_string(ranking: &FinalRanking) -> Result<String, serde_json::Error> {
    serde_json::to_string(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ActorId, Archetype, BotState};
    use crate::geometry::Vec2;
    use crate::ledger::{CrownState, RankingEntry, ScoreRecord};
    use crate::safe_zone::ZoneStage;
    use crate::systems::clock::MatchPhase;
    use crate::world::{ActorSnapshot, ScoreSnapshot, ZoneSnapshot};

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = Snapshot {
            tick: 42,
            time: 2.1,
            remaining: 297.9,
            phase: MatchPhase::Running,
            actors: vec![ActorSnapshot {
                id: 1,
                name: "Rook".to_string(),
                is_bot: true,
                archetype: Archetype::Bazooka,
                x: 10.0,
                y: 20.0,
                facing_x: 0.0,
                facing_y: 1.0,
                health: 80.0,
                health_max: 100.0,
                alive: true,
                bot_state: Some(BotState::SeekCrown),
            }],
            monsters: vec![],
            projectiles: vec![],
            props: vec![],
            crown: CrownState::Held(ActorId(1)),
            zone: ZoneSnapshot {
                center: Vec2::ZERO,
                radius: 50.0,
                next_center: Vec2::new(3.0, -2.0),
                next_radius: 30.0,
                damage_per_second: 5.0,
                stage: ZoneStage::Warning {
                    phase: 0,
                    remaining: 4.0,
                },
            },
            scores: vec![ScoreSnapshot {
                id: 1,
                record: ScoreRecord {
                    name: "Rook".to_string(),
                    bounty: 20,
                    has_crown: true,
                    ..Default::default()
                },
            }],
        };

        let json = snapshot_to_json_string(&snapshot).unwrap();
        let restored = snapshot_from_json_string(&json).unwrap();

        assert_eq!(restored.tick, 42);
        assert_eq!(restored.actors.len(), 1);
        assert_eq!(restored.actors[0].bot_state, Some(BotState::SeekCrown));
        assert_eq!(restored.crown, CrownState::Held(ActorId(1)));
        assert_eq!(restored.scores[0].record.bounty, 20);
    }

    #[test]
    fn test_ranking_json_names_winner() {
        let ranking = FinalRanking {
            entries: vec![RankingEntry {
                rank: 1,
                actor_id: ActorId(3),
                record: ScoreRecord {
                    name: "Vale".to_string(),
                    actor_kills: 4,
                    ..Default::default()
                },
            }],
        };
        let json = ranking_to_json_string(&ranking).unwrap();
        assert!(json.contains("Vale"));
        assert!(json.contains("\"actor_kills\":4"));
    }
}
