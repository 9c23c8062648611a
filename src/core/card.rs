//! Card data records, entity instances and the content contract
//!
//! Card content (what each card does) lives outside the engine. A content
//! provider hands the engine a merged [`CardData`] record plus a
//! [`CardBehavior`] object; the engine never interprets effect bodies, it only
//! invokes them at the appropriate resolution points and consumes the
//! consequence phases they return.

use crate::core::{Ability, CardKind, EnchantId, EntityId, PlayerId};
use crate::game::event::{Event, Phase};
use crate::game::GameState;
use crate::zones::Zone;
use crate::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// Static card attributes, fully merged at construction
///
/// There is no attribute-chain walking at runtime: a card kind's base table
/// and its override table are folded into one flat record by
/// [`CardData::with_overrides`] before the entity is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardData {
    /// Numeric content identifier
    pub card_id: u32,

    pub name: String,

    pub kind: CardKind,

    /// Mana cost
    pub cost: i32,

    pub attack: i32,

    /// Maximum health for minions and heroes, durability for weapons
    pub health: i32,

    /// Printed keyword abilities
    pub abilities: SmallVec<[Ability; 2]>,

    /// Content id of the hero power granted by this hero card, if any
    pub hero_power: Option<u32>,

    /// Card text for display
    pub description: String,
}

impl CardData {
    pub fn new(card_id: u32, name: impl Into<String>, kind: CardKind) -> Self {
        CardData {
            card_id,
            name: name.into(),
            kind,
            cost: 0,
            attack: 0,
            health: 0,
            abilities: SmallVec::new(),
            hero_power: None,
            description: String::new(),
        }
    }

    /// Merge a base table with an override table into one immutable record
    pub fn with_overrides(base: &CardData, overrides: CardOverrides) -> Self {
        CardData {
            card_id: overrides.card_id.unwrap_or(base.card_id),
            name: overrides.name.unwrap_or_else(|| base.name.clone()),
            kind: base.kind,
            cost: overrides.cost.unwrap_or(base.cost),
            attack: overrides.attack.unwrap_or(base.attack),
            health: overrides.health.unwrap_or(base.health),
            abilities: overrides.abilities.unwrap_or_else(|| base.abilities.clone()),
            hero_power: overrides.hero_power.or(base.hero_power),
            description: overrides.description.unwrap_or_else(|| base.description.clone()),
        }
    }
}

/// Optional per-card overrides applied on top of a base attribute table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardOverrides {
    pub card_id: Option<u32>,
    pub name: Option<String>,
    pub cost: Option<i32>,
    pub attack: Option<i32>,
    pub health: Option<i32>,
    pub abilities: Option<SmallVec<[Ability; 2]>>,
    pub hero_power: Option<u32>,
    pub description: Option<String>,
}

/// Per-card effect callbacks, dispatched polymorphically by the engine
///
/// All methods default to "no effect / always legal" so simple vanilla cards
/// need no implementation beyond their data record.
pub trait CardBehavior {
    /// Main effect (spell text, hero power text). Returns consequence phases.
    fn run(&self, game: &mut GameState, event: &Event) -> Result<Vec<Phase>> {
        let _ = (game, event);
        Ok(Vec::new())
    }

    /// Battlecry effect of a played minion
    fn run_battlecry(&self, game: &mut GameState, event: &Event) -> Result<Vec<Phase>> {
        let _ = (game, event);
        Ok(Vec::new())
    }

    /// Is `target` a legal target for this card right now?
    fn check_target(&self, game: &GameState, this: EntityId, target: Option<EntityId>) -> bool {
        let _ = (game, this, target);
        true
    }

    /// Extra per-card gate on top of the generic action validation
    fn can_do_action(&self, game: &GameState, this: EntityId) -> bool {
        let _ = (game, this);
        true
    }

    /// Register standing triggers and auras when the entity enters play
    fn on_enter_play(&self, game: &mut GameState, this: EntityId) {
        let _ = (game, this);
    }

    /// Register deathrattle triggers. Called by the Death Creation Step
    /// strictly before the entity is moved to the graveyard, so location
    /// lookups against the dying entity are still valid.
    fn on_death(&self, game: &mut GameState, this: EntityId) {
        let _ = (game, this);
    }
}

/// Behavior for cards with no effect text
pub struct NullBehavior;

impl CardBehavior for NullBehavior {}

/// What a content provider returns for one card id
#[derive(Clone)]
pub struct CardDef {
    pub data: CardData,
    pub behavior: Rc<dyn CardBehavior>,
}

/// Content provider contract: numeric card id to constructor data
pub trait ContentProvider {
    fn create(&self, card_id: u32) -> Result<CardDef>;
}

/// A game object: a card in some zone, a hero, or a hero power
///
/// `attack`, `max_health` and `abilities` are the *recalculated* values,
/// rebuilt from the card data plus the attached enchantment list during aura
/// update passes. `damage` is retained across max-health changes, matching
/// the game's health rules.
pub struct Entity {
    pub id: EntityId,

    pub data: CardData,

    pub zone: Zone,

    /// Owning player. `None` for entities force-moved to a graveyard by the
    /// full-zone destroy policy.
    pub player: Option<PlayerId>,

    /// Order-of-play tag, assigned once on entering an in-play zone and
    /// stable for that life. The canonical tie-break for simultaneous events.
    pub oop: Option<u32>,

    pub attack: i32,
    pub max_health: i32,
    pub damage: i32,
    pub abilities: SmallVec<[Ability; 2]>,

    /// Marked by destroy effects; picked up by the Death Creation Step
    pub pending_destroy: bool,

    /// Heroes only: false once the hero's death has resolved (player lost)
    pub play_state: bool,

    /// Summoning sickness: set on entering play, cleared at the controller's
    /// next Begin-of-Turn
    pub exhausted: bool,

    pub attacks_this_turn: u32,

    /// Attached enchantments, in attach order
    pub enchantments: Vec<EnchantId>,

    pub behavior: Rc<dyn CardBehavior>,
}

impl Entity {
    pub fn new(id: EntityId, data: CardData, behavior: Rc<dyn CardBehavior>, player: PlayerId) -> Self {
        let attack = data.attack;
        let max_health = data.health;
        let abilities = data.abilities.clone();
        Entity {
            id,
            data,
            zone: Zone::SetAside,
            player: Some(player),
            oop: None,
            attack,
            max_health,
            damage: 0,
            abilities,
            pending_destroy: false,
            play_state: true,
            exhausted: false,
            attacks_this_turn: 0,
            enchantments: Vec::new(),
            behavior,
        }
    }

    pub fn kind(&self) -> CardKind {
        self.data.kind
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Current health (durability for weapons)
    pub fn health(&self) -> i32 {
        self.max_health - self.damage
    }

    /// Liveness predicate: mortally wounded or pending-destroy entities are
    /// not alive. Hero `play_state` is tracked separately (an already-lost
    /// hero is dead but must not be collected again).
    pub fn alive(&self) -> bool {
        !self.pending_destroy && self.health() > 0
    }

    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    /// Number of attacks this entity may make per turn
    pub fn max_attacks(&self) -> u32 {
        if self.has_ability(Ability::Windfury) {
            2
        } else {
            1
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.data.name)
            .field("kind", &self.data.kind)
            .field("zone", &self.zone)
            .field("player", &self.player)
            .field("oop", &self.oop)
            .field("attack", &self.attack)
            .field("health", &self.health())
            .finish()
    }
}
