//! Player representation

use crate::core::{EntityId, PlayerId};
use serde::{Deserialize, Serialize};

pub const MAX_MANA: i32 = 10;

/// Per-player game data
///
/// Zone contents live in [`crate::zones::PlayerZones`]; the hero, weapon and
/// hero-power entities are reached through their single-slot zones, so this
/// struct only carries the scalar state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,

    pub name: String,

    /// Mana available this turn
    pub mana: i32,

    /// Mana crystals owned
    pub max_mana: i32,

    /// Escalating damage from drawing on an empty deck
    pub fatigue: i32,

    /// Hero power already used this turn
    pub hero_power_used: bool,

    /// The hero entity, set at game start
    pub hero: Option<EntityId>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Player {
            id,
            name: name.into(),
            mana: 0,
            max_mana: 0,
            fatigue: 0,
            hero_power_used: false,
            hero: None,
        }
    }

    /// Per-turn mana ramp and refresh
    pub fn start_turn(&mut self) {
        self.max_mana = (self.max_mana + 1).min(MAX_MANA);
        self.mana = self.max_mana;
        self.hero_power_used = false;
    }

    pub fn can_afford(&self, cost: i32) -> bool {
        self.mana >= cost
    }

    /// Spend mana; caller must have validated affordability
    pub fn spend_mana(&mut self, cost: i32) {
        self.mana -= cost;
    }

    /// Next fatigue hit (increments the counter)
    pub fn next_fatigue(&mut self) -> i32 {
        self.fatigue += 1;
        self.fatigue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mana_ramp() {
        let mut player = Player::new(PlayerId::new(0), "Alice");

        player.start_turn();
        assert_eq!(player.max_mana, 1);
        assert_eq!(player.mana, 1);

        for _ in 0..12 {
            player.start_turn();
        }
        assert_eq!(player.max_mana, MAX_MANA);
        assert_eq!(player.mana, MAX_MANA);

        player.spend_mana(4);
        assert_eq!(player.mana, 6);
    }

    #[test]
    fn test_fatigue_escalates() {
        let mut player = Player::new(PlayerId::new(1), "Bob");
        assert_eq!(player.next_fatigue(), 1);
        assert_eq!(player.next_fatigue(), 2);
        assert_eq!(player.next_fatigue(), 3);
    }
}
