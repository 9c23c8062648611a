//! Shared test card set: a tiny content provider with enough behaviors to
//! exercise spells, deathrattles, auras, weapons and hero powers.
#![allow(dead_code)]

use hearthrules::core::{
    Ability, CardBehavior, CardData, CardDef, CardKind, ContentProvider, DetachWhen, EnchantApply,
    EntityId, NullBehavior, PlayerId,
};
use hearthrules::game::{
    AuraEffect, AuraKind, Event, EventKind, GameState, Phase, Timing, Trigger, TriggerEffect,
};
use hearthrules::zones::{Zone, ZoneLocator};
use hearthrules::{HsError, Result};
use smallvec::smallvec;
use std::rc::Rc;

pub const HERO_HUNTER: u32 = 1;
pub const STEADY_SHOT: u32 = 2;
pub const WISP: u32 = 10;
pub const RAPTOR: u32 = 11;
pub const YETI: u32 = 12;
pub const HARVEST_GOLEM: u32 = 13;
pub const DAMAGED_GOLEM: u32 = 14;
pub const RAID_LEADER: u32 = 15;
pub const FLAG_BEARER: u32 = 16;
pub const BOLT: u32 = 20;
pub const WHIRLWIND: u32 = 21;
pub const WAR_AXE: u32 = 30;

pub fn minion(card_id: u32, name: &str, cost: i32, attack: i32, health: i32) -> CardData {
    let mut data = CardData::new(card_id, name, CardKind::Minion);
    data.cost = cost;
    data.attack = attack;
    data.health = health;
    data
}

fn spell(card_id: u32, name: &str, cost: i32) -> CardData {
    let mut data = CardData::new(card_id, name, CardKind::Spell);
    data.cost = cost;
    data
}

/// Deal 3 damage to the chosen target
struct BoltBehavior;

impl CardBehavior for BoltBehavior {
    fn run(&self, _game: &mut GameState, event: &Event) -> Result<Vec<Phase>> {
        let Some(target) = event.target else {
            return Ok(Vec::new());
        };
        let mut damage = Event::new(EventKind::Damage).with_target(target).with_amount(3);
        if let Some(source) = event.source {
            damage = damage.with_source(source);
        }
        Ok(vec![Phase::event(damage)])
    }

    fn check_target(&self, _game: &GameState, _this: EntityId, target: Option<EntityId>) -> bool {
        target.is_some()
    }
}

/// Deal 1 damage to every minion on both battlefields
struct WhirlwindBehavior;

impl CardBehavior for WhirlwindBehavior {
    fn run(&self, game: &mut GameState, event: &Event) -> Result<Vec<Phase>> {
        let mut phases = Vec::new();
        for idx in 0..2 {
            let player = PlayerId::new(idx);
            for id in game.get_zone(Zone::Play, player)?.entities.clone() {
                let mut damage = Event::new(EventKind::Damage).with_target(id).with_amount(1);
                if let Some(source) = event.source {
                    damage = damage.with_source(source);
                }
                phases.push(Phase::event(damage));
            }
        }
        Ok(phases)
    }
}

/// Deathrattle: summon a 2/1 golem at the recorded death location
struct GolemDeathrattle {
    owner: EntityId,
}

impl TriggerEffect for GolemDeathrattle {
    fn queue_condition(&self, _game: &GameState, event: &Event) -> bool {
        event.source == Some(self.owner)
    }

    fn process(&self, game: &mut GameState, event: &hearthrules::game::EventRef) -> Result<Vec<Phase>> {
        let (player, location) = {
            let b = event.borrow();
            (b.player, b.location)
        };
        let Some(player) = player else {
            return Ok(Vec::new());
        };
        let to = location.map(ZoneLocator::Index).unwrap_or(ZoneLocator::Last);
        game.summon_minion(
            player,
            minion(DAMAGED_GOLEM, "Damaged Golem", 1, 2, 1),
            Rc::new(NullBehavior),
            to,
        )?;
        Ok(Vec::new())
    }
}

struct HarvestGolemBehavior;

impl CardBehavior for HarvestGolemBehavior {
    fn on_death(&self, game: &mut GameState, this: EntityId) {
        let id = game.new_trigger_id();
        let oop = game.entities.get(this).ok().and_then(|e| e.oop).unwrap_or(0);
        let trigger = Trigger::new(
            id,
            Some(this),
            oop,
            smallvec![(EventKind::MinionDeath, Timing::After)],
            Rc::new(GolemDeathrattle { owner: this }),
        )
        .persistent()
        .one_shot();
        game.register_trigger(trigger);
    }
}

/// +1 attack to the owner's other minions
struct RaidLeaderAura;

impl AuraEffect for RaidLeaderAura {
    fn applies_to(&self, game: &GameState, owner: EntityId, entity: EntityId) -> bool {
        if entity == owner {
            return false;
        }
        let (Ok(o), Ok(e)) = (game.entities.get(owner), game.entities.get(entity)) else {
            return false;
        };
        e.kind() == CardKind::Minion && e.zone == Zone::Play && e.player == o.player && e.alive()
    }

    fn grant(&self) -> (EnchantApply, DetachWhen) {
        (EnchantApply::ModifyStats { attack: 1, health: 0 }, DetachWhen::Never)
    }
}

struct RaidLeaderBehavior;

impl CardBehavior for RaidLeaderBehavior {
    fn on_enter_play(&self, game: &mut GameState, this: EntityId) {
        game.register_aura(this, AuraKind::AttackHealth, Box::new(RaidLeaderAura));
    }
}

/// Grants Taunt to the owner's other minions (an "other" aura)
struct FlagBearerAura;

impl AuraEffect for FlagBearerAura {
    fn applies_to(&self, game: &GameState, owner: EntityId, entity: EntityId) -> bool {
        if entity == owner {
            return false;
        }
        let (Ok(o), Ok(e)) = (game.entities.get(owner), game.entities.get(entity)) else {
            return false;
        };
        e.kind() == CardKind::Minion && e.zone == Zone::Play && e.player == o.player && e.alive()
    }

    fn grant(&self) -> (EnchantApply, DetachWhen) {
        (EnchantApply::GrantAbility(Ability::Taunt), DetachWhen::Never)
    }
}

struct FlagBearerBehavior;

impl CardBehavior for FlagBearerBehavior {
    fn on_enter_play(&self, game: &mut GameState, this: EntityId) {
        game.register_aura(this, AuraKind::Other, Box::new(FlagBearerAura));
    }
}

/// Hero power: deal 2 damage to the enemy hero
struct SteadyShotBehavior;

impl CardBehavior for SteadyShotBehavior {
    fn run(&self, game: &mut GameState, event: &Event) -> Result<Vec<Phase>> {
        let Some(player) = event.player else {
            return Ok(Vec::new());
        };
        let hero = game.hero_of(player.opponent())?;
        Ok(vec![Phase::event(
            Event::new(EventKind::Damage).with_target(hero).with_amount(2),
        )])
    }
}

pub struct TestContent;

impl ContentProvider for TestContent {
    fn create(&self, card_id: u32) -> Result<CardDef> {
        let def = match card_id {
            HERO_HUNTER => {
                let mut data = CardData::new(HERO_HUNTER, "Hunter", CardKind::Hero);
                data.health = 30;
                data.hero_power = Some(STEADY_SHOT);
                CardDef {
                    data,
                    behavior: Rc::new(NullBehavior),
                }
            }
            STEADY_SHOT => {
                let mut data = CardData::new(STEADY_SHOT, "Steady Shot", CardKind::HeroPower);
                data.cost = 2;
                CardDef {
                    data,
                    behavior: Rc::new(SteadyShotBehavior),
                }
            }
            WISP => CardDef {
                data: minion(WISP, "Wisp", 0, 0, 1),
                behavior: Rc::new(NullBehavior),
            },
            RAPTOR => CardDef {
                data: minion(RAPTOR, "Bloodfen Raptor", 2, 3, 2),
                behavior: Rc::new(NullBehavior),
            },
            YETI => CardDef {
                data: minion(YETI, "Chillwind Yeti", 4, 4, 5),
                behavior: Rc::new(NullBehavior),
            },
            HARVEST_GOLEM => CardDef {
                data: minion(HARVEST_GOLEM, "Harvest Golem", 3, 2, 3),
                behavior: Rc::new(HarvestGolemBehavior),
            },
            DAMAGED_GOLEM => CardDef {
                data: minion(DAMAGED_GOLEM, "Damaged Golem", 1, 2, 1),
                behavior: Rc::new(NullBehavior),
            },
            RAID_LEADER => CardDef {
                data: minion(RAID_LEADER, "Raid Leader", 3, 2, 2),
                behavior: Rc::new(RaidLeaderBehavior),
            },
            FLAG_BEARER => CardDef {
                data: minion(FLAG_BEARER, "Flag Bearer", 2, 1, 3),
                behavior: Rc::new(FlagBearerBehavior),
            },
            BOLT => CardDef {
                data: spell(BOLT, "Bolt", 2),
                behavior: Rc::new(BoltBehavior),
            },
            WHIRLWIND => CardDef {
                data: spell(WHIRLWIND, "Whirlwind", 1),
                behavior: Rc::new(WhirlwindBehavior),
            },
            WAR_AXE => {
                let mut data = CardData::new(WAR_AXE, "War Axe", CardKind::Weapon);
                data.cost = 2;
                data.attack = 3;
                data.health = 2;
                CardDef {
                    data,
                    behavior: Rc::new(NullBehavior),
                }
            }
            other => return Err(HsError::UnknownCard(other)),
        };
        Ok(def)
    }
}

/// A running two-player game with heroes and hero powers but empty decks,
/// main phase, first player's turn with 10 mana.
pub fn running_game() -> GameState {
    let mut game = GameState::new_two_player("Alice", "Bob");
    let content = TestContent;
    for idx in 0..2 {
        let player = PlayerId::new(idx);
        let hero_def = content.create(HERO_HUNTER).unwrap();
        let (hero, _) = game
            .generate(player, Zone::Hero, ZoneLocator::Last, hero_def.data, hero_def.behavior)
            .unwrap();
        game.get_player_mut(player).unwrap().hero = Some(hero);

        let hp_def = content.create(STEADY_SHOT).unwrap();
        game.generate(player, Zone::HeroPower, ZoneLocator::Last, hp_def.data, hp_def.behavior)
            .unwrap();

        let p = game.get_player_mut(player).unwrap();
        p.max_mana = 10;
        p.mana = 10;
    }
    game.progress = hearthrules::core::GameProgress::Main;
    game
}

/// Put a card from the test set into a player's hand
pub fn to_hand(game: &mut GameState, player: PlayerId, card_id: u32) -> EntityId {
    let def = TestContent.create(card_id).unwrap();
    let (id, _) = game
        .generate(player, Zone::Hand, ZoneLocator::Last, def.data, def.behavior)
        .unwrap();
    id
}

/// Put a card from the test set on top of a player's deck
pub fn to_deck(game: &mut GameState, player: PlayerId, card_id: u32) -> EntityId {
    let def = TestContent.create(card_id).unwrap();
    let (id, _) = game
        .generate(player, Zone::Deck, ZoneLocator::Last, def.data, def.behavior)
        .unwrap();
    id
}

/// Put a minion from the test set straight onto the battlefield, with its
/// enter-play registration
pub fn to_board(game: &mut GameState, player: PlayerId, card_id: u32) -> EntityId {
    let def = TestContent.create(card_id).unwrap();
    game.summon_minion(player, def.data, def.behavior, ZoneLocator::Last)
        .unwrap()
        .unwrap()
}
