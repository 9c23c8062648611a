//! Serializable snapshot of a running game
//!
//! The live state holds behavior objects and shared event handles, so it is
//! not serialized directly. `GameStatus` is the flat, serde-friendly view a
//! frontend or replay tool consumes.

use crate::core::{Ability, CardKind, GameOutcome, GameProgress, PlayerId};
use crate::game::state::GameState;
use crate::zones::Zone;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStatus {
    pub id: u32,
    pub card_id: u32,
    pub name: String,
    pub kind: CardKind,
    pub cost: i32,
    pub attack: i32,
    pub health: i32,
    pub max_health: i32,
    pub abilities: Vec<Ability>,
    pub exhausted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneStatus {
    pub zone: Zone,
    pub entities: Vec<EntityStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub id: PlayerId,
    pub name: String,
    pub mana: i32,
    pub max_mana: i32,
    pub fatigue: i32,
    pub hero_power_used: bool,
    pub deck_size: usize,
    pub zones: Vec<ZoneStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatus {
    pub progress: GameProgress,
    pub turn: i32,
    pub current_player: PlayerId,
    pub result: Option<GameOutcome>,
    pub players: Vec<PlayerStatus>,
}

impl GameStatus {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl GameState {
    /// Take a snapshot of the externally visible game state
    pub fn status(&self) -> GameStatus {
        let players = self
            .players
            .iter()
            .map(|player| {
                let shown = [Zone::Hero, Zone::HeroPower, Zone::Weapon, Zone::Play, Zone::Secret, Zone::Hand];
                let zones = shown
                    .into_iter()
                    .filter_map(|zone| {
                        let entities: Vec<EntityStatus> = self
                            .get_zone(zone, player.id)
                            .ok()?
                            .entities
                            .iter()
                            .filter_map(|&id| {
                                let e = self.entities.get(id).ok()?;
                                Some(EntityStatus {
                                    id: id.as_u32(),
                                    card_id: e.data.card_id,
                                    name: e.name().to_string(),
                                    kind: e.kind(),
                                    cost: e.data.cost,
                                    attack: e.attack,
                                    health: e.health(),
                                    max_health: e.max_health,
                                    abilities: e.abilities.to_vec(),
                                    exhausted: e.exhausted,
                                })
                            })
                            .collect();
                        Some(ZoneStatus { zone, entities })
                    })
                    .collect();
                PlayerStatus {
                    id: player.id,
                    name: player.name.clone(),
                    mana: player.mana,
                    max_mana: player.max_mana,
                    fatigue: player.fatigue,
                    hero_power_used: player.hero_power_used,
                    deck_size: self
                        .get_zone(Zone::Deck, player.id)
                        .map(|z| z.len())
                        .unwrap_or(0),
                    zones,
                }
            })
            .collect();

        GameStatus {
            progress: self.progress,
            turn: self.n_turns,
            current_player: self.current_player,
            result: self.game_result,
            players,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardData, NullBehavior};
    use crate::zones::ZoneLocator;
    use std::rc::Rc;

    #[test]
    fn test_status_round_trips_as_json() {
        let mut game = GameState::new_two_player("Alice", "Bob");
        let p0 = PlayerId::new(0);
        let mut data = CardData::new(3, "Croc", CardKind::Minion);
        data.attack = 2;
        data.health = 3;
        game.generate(p0, Zone::Play, ZoneLocator::Last, data, Rc::new(NullBehavior))
            .unwrap();

        let status = game.status();
        let json = status.to_json();
        let parsed: GameStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.players.len(), 2);
        let play = parsed.players[0]
            .zones
            .iter()
            .find(|z| z.zone == Zone::Play)
            .unwrap();
        assert_eq!(play.entities.len(), 1);
        assert_eq!(play.entities[0].name, "Croc");
        assert_eq!(play.entities[0].health, 3);
    }
}
