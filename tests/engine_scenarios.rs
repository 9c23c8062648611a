//! Resolution-engine scenarios: depth-first ordering, simultaneous deaths,
//! deathrattles, auras, cancellation and weapons.

mod common;

use common::*;
use hearthrules::core::{Ability, PlayerId};
use hearthrules::game::{EventKind, EventRef, GameState, Phase, PlayerAction, Timing, TriggerEffect};
use hearthrules::zones::Zone;
use hearthrules::Result;
use std::cell::RefCell;
use std::rc::Rc;

fn record_event_kinds(game: &mut GameState) -> Rc<RefCell<Vec<EventKind>>> {
    let kinds: Rc<RefCell<Vec<EventKind>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = kinds.clone();
    game.on_event(move |event| sink.borrow_mut().push(event.kind));
    kinds
}

#[test]
fn test_spell_consequences_resolve_depth_first() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    let p1 = PlayerId::new(1);
    let yeti = to_board(&mut game, p1, YETI);
    let bolt = to_hand(&mut game, p0, BOLT);

    let kinds = record_event_kinds(&mut game);
    game.run_player_action(PlayerAction::PlaySpell {
        player: p0,
        card: bolt,
        target: Some(yeti),
    })
    .unwrap();

    // The damage consequence settles before the next queued phase
    let recorded = kinds.borrow();
    let on_play = recorded.iter().position(|&k| k == EventKind::OnPlaySpell).unwrap();
    let text = recorded.iter().position(|&k| k == EventKind::SpellText).unwrap();
    let damage = recorded.iter().position(|&k| k == EventKind::Damage).unwrap();
    let after = recorded.iter().position(|&k| k == EventKind::AfterSpell).unwrap();
    assert!(on_play < text && text < damage && damage < after);

    assert_eq!(game.entities.get(yeti).unwrap().health(), 2);
    assert_eq!(game.entities.get(bolt).unwrap().zone, Zone::Graveyard);
    assert_eq!(game.get_player(p0).unwrap().mana, 8);
}

#[test]
fn test_simultaneous_deaths_ordered_by_play_order() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    // Board: [golem, wisp]; the golem entered play first
    let golem = to_board(&mut game, p0, HARVEST_GOLEM);
    let wisp = to_board(&mut game, p0, WISP);
    game.entities.get_mut(golem).unwrap().damage = 2;

    let deaths: Rc<RefCell<Vec<EventKind>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = deaths.clone();
    game.on_event(move |event| {
        if matches!(event.kind, EventKind::MinionDeath) {
            sink.borrow_mut().push(event.kind);
        }
    });

    let whirlwind = to_hand(&mut game, p0, WHIRLWIND);
    game.run_player_action(PlayerAction::PlaySpell {
        player: p0,
        card: whirlwind,
        target: None,
    })
    .unwrap();

    // Both died in one batch
    assert_eq!(deaths.borrow().len(), 2);
    assert_eq!(game.entities.get(golem).unwrap().zone, Zone::Graveyard);
    assert_eq!(game.entities.get(wisp).unwrap().zone, Zone::Graveyard);

    // The deathrattle token stands at the golem's recorded location
    let play = game.get_zone(Zone::Play, p0).unwrap();
    assert_eq!(play.len(), 1);
    let token = play.entities[0];
    let e = game.entities.get(token).unwrap();
    assert_eq!(e.data.card_id, DAMAGED_GOLEM);
    assert_eq!(e.attack, 2);
    assert_eq!(e.health(), 1);
}

#[test]
fn test_death_location_accounts_for_earlier_removals() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    // Board: [wisp, golem]; both die together. The wisp has the lower
    // play-order tag, so the golem's recorded location shifts left by one.
    let wisp = to_board(&mut game, p0, WISP);
    let golem = to_board(&mut game, p0, HARVEST_GOLEM);
    game.entities.get_mut(golem).unwrap().damage = 2;
    let _ = wisp;

    let locations: Rc<RefCell<Vec<(Option<usize>, u32)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = locations.clone();
    game.on_event(move |event| {
        if event.kind == EventKind::MinionDeath {
            sink.borrow_mut().push((event.location, event.oop));
        }
    });

    let whirlwind = to_hand(&mut game, p0, WHIRLWIND);
    game.run_player_action(PlayerAction::PlaySpell {
        player: p0,
        card: whirlwind,
        target: None,
    })
    .unwrap();

    let recorded = locations.borrow();
    assert_eq!(recorded.len(), 2);
    // Sorted by play order: wisp first at its raw location 0
    assert_eq!(recorded[0].0, Some(0));
    // Golem's raw location 1 corrected to 0
    assert_eq!(recorded[1].0, Some(0));
    assert!(recorded[0].1 < recorded[1].1);

    // Token summoned at the corrected slot
    let play = game.get_zone(Zone::Play, p0).unwrap();
    assert_eq!(play.len(), 1);
    assert_eq!(
        game.entities.get(play.entities[0]).unwrap().data.card_id,
        DAMAGED_GOLEM
    );
}

#[test]
fn test_attack_health_aura_follows_board() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    let leader = to_board(&mut game, p0, RAID_LEADER);
    let wisp = to_board(&mut game, p0, WISP);

    game.aura_update_attack_health();
    assert_eq!(game.entities.get(wisp).unwrap().attack, 1);
    // The aura never buffs its own source
    assert_eq!(game.entities.get(leader).unwrap().attack, 2);

    // Repeated passes are stable
    game.aura_update_attack_health();
    assert_eq!(game.entities.get(wisp).unwrap().attack, 1);
    assert_eq!(game.entities.get(wisp).unwrap().enchantments.len(), 1);

    // Source dies: the grant detaches exactly once
    game.entities.get_mut(leader).unwrap().pending_destroy = true;
    game.death_creation_step().unwrap();
    game.aura_update_attack_health();
    assert_eq!(game.entities.get(wisp).unwrap().attack, 0);
    assert!(game.entities.get(wisp).unwrap().enchantments.is_empty());

    game.aura_update_attack_health();
    assert_eq!(game.entities.get(wisp).unwrap().attack, 0);
}

#[test]
fn test_other_aura_grant_is_idempotent() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    to_board(&mut game, p0, FLAG_BEARER);
    let wisp = to_board(&mut game, p0, WISP);

    game.aura_update_other();
    game.aura_update_other();

    let e = game.entities.get(wisp).unwrap();
    assert_eq!(e.enchantments.len(), 1);
    assert_eq!(
        e.abilities.iter().filter(|&&a| a == Ability::Taunt).count(),
        1
    );
}

/// Disables the observed event and cancels the rest of its queue
struct Counterspell;

impl TriggerEffect for Counterspell {
    fn process(&self, game: &mut GameState, event: &EventRef) -> Result<Vec<Phase>> {
        event.borrow_mut().disable();
        game.stop_subsequent_phases();
        Ok(Vec::new())
    }
}

/// Records that it fired
struct Witness {
    fired: Rc<RefCell<bool>>,
}

impl TriggerEffect for Witness {
    fn process(&self, _game: &mut GameState, _event: &EventRef) -> Result<Vec<Phase>> {
        *self.fired.borrow_mut() = true;
        Ok(Vec::new())
    }
}

#[test]
fn test_cancellation_truncates_queue_and_stops_triggers() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    let p1 = PlayerId::new(1);
    let yeti = to_board(&mut game, p1, YETI);
    let bolt = to_hand(&mut game, p0, BOLT);

    use smallvec::smallvec;
    game.add_trigger(
        None,
        smallvec![(EventKind::SpellText, Timing::Before)],
        Rc::new(Counterspell),
    );
    let fired = Rc::new(RefCell::new(false));
    game.add_trigger(
        None,
        smallvec![(EventKind::SpellText, Timing::Before)],
        Rc::new(Witness { fired: fired.clone() }),
    );

    let kinds = record_event_kinds(&mut game);
    game.run_player_action(PlayerAction::PlaySpell {
        player: p0,
        card: bolt,
        target: Some(yeti),
    })
    .unwrap();

    // The spell text never resolved and the queue was cut short
    let recorded = kinds.borrow();
    assert!(recorded.contains(&EventKind::OnPlaySpell));
    assert!(!recorded.contains(&EventKind::SpellText));
    assert!(!recorded.contains(&EventKind::AfterSpell));
    assert_eq!(game.entities.get(yeti).unwrap().health(), 5);

    // Once the event was disabled, later queued triggers never ran
    assert!(!*fired.borrow());

    // Mana was spent by the on-play phase that did resolve
    assert_eq!(game.get_player(p0).unwrap().mana, 8);
}

#[test]
fn test_combat_trades_and_weapon_durability() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    let p1 = PlayerId::new(1);

    let raptor = to_board(&mut game, p0, RAPTOR);
    let enemy_raptor = to_board(&mut game, p1, RAPTOR);
    game.entities.get_mut(raptor).unwrap().exhausted = false;

    game.run_player_action(PlayerAction::ToAttack {
        player: p0,
        attacker: raptor,
        defender: enemy_raptor,
    })
    .unwrap();
    // 3/2 into 3/2: both die
    assert_eq!(game.entities.get(raptor).unwrap().zone, Zone::Graveyard);
    assert_eq!(game.entities.get(enemy_raptor).unwrap().zone, Zone::Graveyard);

    // Hero attack with a weapon
    let axe = to_hand(&mut game, p0, WAR_AXE);
    game.run_player_action(PlayerAction::PlayWeapon { player: p0, card: axe })
        .unwrap();
    assert_eq!(game.entities.get(axe).unwrap().zone, Zone::Weapon);

    let my_hero = game.hero_of(p0).unwrap();
    let enemy_hero = game.hero_of(p1).unwrap();
    game.run_player_action(PlayerAction::ToAttack {
        player: p0,
        attacker: my_hero,
        defender: enemy_hero,
    })
    .unwrap();

    assert_eq!(game.entities.get(enemy_hero).unwrap().health(), 27);
    // One durability gone, no counterattack against a weaponless hero
    assert_eq!(game.entities.get(axe).unwrap().health(), 1);
    assert_eq!(game.entities.get(my_hero).unwrap().health(), 30);
}

#[test]
fn test_weapon_replacement_destroys_old_weapon() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);

    let first = to_hand(&mut game, p0, WAR_AXE);
    game.run_player_action(PlayerAction::PlayWeapon { player: p0, card: first })
        .unwrap();

    let deaths: Rc<RefCell<Vec<EventKind>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = deaths.clone();
    game.on_event(move |event| {
        if event.kind == EventKind::WeaponDeath {
            sink.borrow_mut().push(event.kind);
        }
    });

    let second = to_hand(&mut game, p0, WAR_AXE);
    game.run_player_action(PlayerAction::PlayWeapon { player: p0, card: second })
        .unwrap();

    assert_eq!(deaths.borrow().len(), 1);
    assert_eq!(game.entities.get(first).unwrap().zone, Zone::Graveyard);
    assert_eq!(game.entities.get(second).unwrap().zone, Zone::Weapon);
    assert_eq!(game.weapon_of(p0), Some(second));
}

#[test]
fn test_lethal_combat_ends_game() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    let p1 = PlayerId::new(1);

    let raptor = to_board(&mut game, p0, RAPTOR);
    game.entities.get_mut(raptor).unwrap().exhausted = false;
    let enemy_hero = game.hero_of(p1).unwrap();
    game.entities.get_mut(enemy_hero).unwrap().damage = 28;

    let result = game
        .run_player_action(PlayerAction::ToAttack {
            player: p0,
            attacker: raptor,
            defender: enemy_hero,
        })
        .unwrap();

    assert_eq!(result, Some(hearthrules::core::GameOutcome::Win(p0)));
    assert_eq!(game.progress, hearthrules::core::GameProgress::Finished);
    // The hero never leaves its zone
    assert_eq!(game.entities.get(enemy_hero).unwrap().zone, Zone::Hero);
    assert!(!game.entities.get(enemy_hero).unwrap().play_state);
}

#[test]
fn test_overdraw_burns_the_card() {
    let mut game = running_game();
    let p1 = PlayerId::new(1);

    // Fill the off-turn player's hand and give them a one-card deck
    for _ in 0..10 {
        to_hand(&mut game, p1, WISP);
    }
    let buried = to_deck(&mut game, p1, YETI);

    game.run_player_action(PlayerAction::TurnEnd {
        player: PlayerId::new(0),
    })
    .unwrap();

    assert_eq!(game.current_player, p1);
    assert_eq!(game.entities.get(buried).unwrap().zone, Zone::Graveyard);
    assert_eq!(game.get_zone(Zone::Hand, p1).unwrap().len(), 10);
    // Burning is not fatigue
    assert_eq!(game.get_player(p1).unwrap().fatigue, 0);
}

#[test]
fn test_end_of_turn_enchantments_expire() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);
    let wisp = to_board(&mut game, p0, WISP);

    game.attach_enchantment(
        wisp,
        None,
        hearthrules::core::EnchantApply::ModifyStats { attack: 2, health: 0 },
        hearthrules::core::DetachWhen::EndOfTurn,
        None,
    )
    .unwrap();
    assert_eq!(game.entities.get(wisp).unwrap().attack, 2);

    game.run_player_action(PlayerAction::TurnEnd { player: p0 }).unwrap();
    assert_eq!(game.entities.get(wisp).unwrap().attack, 0);
    assert!(game.entities.get(wisp).unwrap().enchantments.is_empty());
}

#[test]
fn test_turn_sequence_event_order() {
    let mut game = running_game();
    let p0 = PlayerId::new(0);

    let kinds = record_event_kinds(&mut game);
    game.run_player_action(PlayerAction::TurnEnd { player: p0 }).unwrap();

    let expected = [EventKind::EndOfTurn, EventKind::BeginOfTurn, EventKind::DrawCard];
    let turn_events: Vec<EventKind> = kinds
        .borrow()
        .iter()
        .copied()
        .filter(|k| expected.contains(k))
        .collect();
    assert_eq!(turn_events, expected);
}
