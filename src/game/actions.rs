//! Player actions and their expansion into phase queues
//!
//! An action is validated up front: structurally bad requests (unknown
//! entities, wrong zones, a game that is not running) are hard errors, while
//! rule-legal rejections (not enough mana, invalid target, not your turn)
//! are reported through the message callback and leave the state untouched.
//! A valid action expands into its fixed phase template and hands the queue
//! to the resolution engine.

use crate::core::{Ability, CardKind, EntityId, GameOutcome, GameProgress, PlayerId};
use crate::game::event::{Event, EventKind, Phase};
use crate::game::state::GameState;
use crate::zones::Zone;
use crate::{HsError, Result};

/// Everything a player can submit
#[derive(Debug, Clone)]
pub enum PlayerAction {
    /// Mulligan: the hand indices to shuffle back. Only legal while the game
    /// waits for replacements.
    ReplaceStartCard { player: PlayerId, replace: Vec<usize> },
    TurnEnd { player: PlayerId },
    Concede { player: PlayerId },
    PlaySpell {
        player: PlayerId,
        card: EntityId,
        target: Option<EntityId>,
    },
    PlayWeapon { player: PlayerId, card: EntityId },
    PlayMinion {
        player: PlayerId,
        card: EntityId,
        location: usize,
        target: Option<EntityId>,
    },
    ToAttack {
        player: PlayerId,
        attacker: EntityId,
        defender: EntityId,
    },
    UseHeroPower {
        player: PlayerId,
        target: Option<EntityId>,
    },
}

impl GameState {
    /// Validate and run one player action to quiescence. Returns the game
    /// result if the action ended the game, `None` otherwise (including
    /// rule-legal rejections, which are messaged and change nothing).
    pub fn run_player_action(&mut self, action: PlayerAction) -> Result<Option<GameOutcome>> {
        match self.progress {
            GameProgress::Invalid => {
                return Err(HsError::IllegalAction("the game has not started".to_string()))
            }
            GameProgress::Finished => {
                return Err(HsError::IllegalAction("the game is over".to_string()))
            }
            GameProgress::WaitReplace | GameProgress::Main => {}
        }

        if let PlayerAction::ReplaceStartCard { player, replace } = &action {
            self.handle_replace(*player, replace.clone())?;
            return Ok(self.game_result);
        }
        if self.progress != GameProgress::Main {
            return Err(HsError::IllegalAction(
                "waiting for starting-hand replacements".to_string(),
            ));
        }

        if !self.validate_action(&action)? {
            return Ok(None);
        }

        let mut phases = self.build_phases(&action)?;
        self.resolve_events(&mut phases, 0)?;
        self.sweep_dead_triggers();
        if self.game_result.is_some() {
            self.end_game();
        }
        Ok(self.game_result)
    }

    fn handle_replace(&mut self, player: PlayerId, replace: Vec<usize>) -> Result<()> {
        if self.progress != GameProgress::WaitReplace {
            return Err(HsError::IllegalAction(
                "no starting-hand replacement is pending".to_string(),
            ));
        }
        if self.replaces[player.as_usize()].is_some() {
            return Err(HsError::IllegalAction(
                "replacement already submitted".to_string(),
            ));
        }
        let hand_len = self.get_zone(Zone::Hand, player)?.len();
        let mut seen = vec![false; hand_len];
        for &index in &replace {
            if index >= hand_len || seen[index] {
                return Err(HsError::IllegalAction(format!(
                    "bad replacement index {index}"
                )));
            }
            seen[index] = true;
        }

        self.replaces[player.as_usize()] = Some(replace);
        if self.replaces.iter().all(|r| r.is_some()) {
            self.on_replace_done()?;
            if self.game_result.is_some() {
                self.end_game();
            }
        }
        Ok(())
    }

    /// Returns `Ok(false)` for rule-legal rejections (already messaged),
    /// `Err` for structurally invalid requests.
    fn validate_action(&mut self, action: &PlayerAction) -> Result<bool> {
        match action {
            PlayerAction::ReplaceStartCard { .. } => Ok(true),
            PlayerAction::Concede { .. } => Ok(true),
            PlayerAction::TurnEnd { player } => {
                if *player != self.current_player {
                    return Ok(self.refuse("it is not your turn"));
                }
                Ok(true)
            }
            PlayerAction::PlaySpell { player, card, target } => {
                if !self.validate_play(*player, *card, CardKind::Spell)? {
                    return Ok(false);
                }
                self.validate_card_gates(*card, *target)
            }
            PlayerAction::PlayWeapon { player, card } => {
                if !self.validate_play(*player, *card, CardKind::Weapon)? {
                    return Ok(false);
                }
                self.validate_card_gates(*card, None)
            }
            PlayerAction::PlayMinion {
                player,
                card,
                location,
                target,
            } => {
                if !self.validate_play(*player, *card, CardKind::Minion)? {
                    return Ok(false);
                }
                let play = self.get_zone(Zone::Play, *player)?;
                if play.is_full() {
                    return Ok(self.refuse("the battlefield is full"));
                }
                if *location > play.len() {
                    return Ok(self.refuse("invalid battlefield position"));
                }
                self.validate_card_gates(*card, *target)
            }
            PlayerAction::ToAttack {
                player,
                attacker,
                defender,
            } => self.validate_attack(*player, *attacker, *defender),
            PlayerAction::UseHeroPower { player, target } => {
                if *player != self.current_player {
                    return Ok(self.refuse("it is not your turn"));
                }
                let hero_power = self
                    .hero_power_of(*player)
                    .ok_or_else(|| HsError::IllegalAction("player has no hero power".to_string()))?;
                if self.get_player(*player)?.hero_power_used {
                    return Ok(self.refuse("hero power already used this turn"));
                }
                let cost = self.entities.get(hero_power)?.data.cost;
                if !self.get_player(*player)?.can_afford(cost) {
                    return Ok(self.refuse("not enough mana"));
                }
                self.validate_card_gates(hero_power, *target)
            }
        }
    }

    /// Shared checks for playing a card from the hand
    fn validate_play(&mut self, player: PlayerId, card: EntityId, kind: CardKind) -> Result<bool> {
        let (card_player, card_zone, card_kind, cost) = {
            let e = self.entities.get(card)?;
            (e.player, e.zone, e.kind(), e.data.cost)
        };
        if card_player != Some(player) || card_zone != Zone::Hand {
            return Err(HsError::IllegalAction(format!(
                "card {card} is not in player {player}'s hand"
            )));
        }
        if card_kind != kind {
            return Err(HsError::IllegalAction(format!(
                "card {card} is a {card_kind:?}, not a {kind:?}"
            )));
        }
        if player != self.current_player {
            return Ok(self.refuse("it is not your turn"));
        }
        if !self.get_player(player)?.can_afford(cost) {
            return Ok(self.refuse("not enough mana"));
        }
        Ok(true)
    }

    /// Per-card gates: target legality and the card's own action condition
    fn validate_card_gates(&mut self, card: EntityId, target: Option<EntityId>) -> Result<bool> {
        let behavior = self.entities.get(card)?.behavior.clone();
        if !behavior.check_target(self, card, target) {
            return Ok(self.refuse("invalid target"));
        }
        if !behavior.can_do_action(self, card) {
            return Ok(self.refuse("that cannot be done right now"));
        }
        Ok(true)
    }

    fn validate_attack(&mut self, player: PlayerId, attacker: EntityId, defender: EntityId) -> Result<bool> {
        let (a_player, a_zone, a_exhausted, a_attacks, a_max_attacks, a_charge) = {
            let e = self.entities.get(attacker)?;
            (
                e.player,
                e.zone,
                e.exhausted,
                e.attacks_this_turn,
                e.max_attacks(),
                e.has_ability(Ability::Charge),
            )
        };
        let (d_player, d_zone, d_stealth, d_taunt) = {
            let e = self.entities.get(defender)?;
            (
                e.player,
                e.zone,
                e.has_ability(Ability::Stealth),
                e.has_ability(Ability::Taunt),
            )
        };

        if a_player != Some(player) || !matches!(a_zone, Zone::Play | Zone::Hero) {
            return Err(HsError::IllegalAction(format!(
                "{attacker} is not a battlefield entity of player {player}"
            )));
        }
        if d_player != Some(player.opponent()) || !matches!(d_zone, Zone::Play | Zone::Hero) {
            return Err(HsError::IllegalAction(format!(
                "{defender} is not an enemy battlefield entity"
            )));
        }

        if player != self.current_player {
            return Ok(self.refuse("it is not your turn"));
        }
        if self.effective_attack(attacker) <= 0 {
            return Ok(self.refuse("that cannot attack"));
        }
        if a_exhausted && !a_charge {
            return Ok(self.refuse("that was just summoned"));
        }
        if a_attacks >= a_max_attacks {
            return Ok(self.refuse("it has already attacked this turn"));
        }
        if d_stealth {
            return Ok(self.refuse("the target is stealthed"));
        }
        if !d_taunt && self.enemy_has_taunt(player) {
            return Ok(self.refuse("a taunt minion is in the way"));
        }
        Ok(true)
    }

    fn enemy_has_taunt(&self, player: PlayerId) -> bool {
        let opponent = player.opponent();
        let Ok(play) = self.get_zone(Zone::Play, opponent) else {
            return false;
        };
        play.entities.iter().any(|&id| {
            self.entities
                .get(id)
                .map(|e| e.alive() && e.has_ability(Ability::Taunt))
                .unwrap_or(false)
        })
    }

    fn refuse(&self, message: &str) -> bool {
        self.message_refusal(message);
        false
    }

    /// Expand a validated action into its fixed phase template
    fn build_phases(&mut self, action: &PlayerAction) -> Result<Vec<Phase>> {
        match action {
            PlayerAction::ReplaceStartCard { .. } => Ok(Vec::new()),

            PlayerAction::TurnEnd { player } => Ok(vec![
                Phase::event(Event::new(EventKind::EndOfTurn).with_player(*player)),
                Phase::CheckWin,
                Phase::event(Event::new(EventKind::BeginOfTurn)),
                Phase::CheckWin,
                Phase::event(Event::new(EventKind::DrawCard)),
                Phase::CheckWin,
            ]),

            PlayerAction::Concede { player } => {
                let hero = self.hero_of(*player)?;
                self.logger.minimal(&format!("player {player} concedes"));
                Ok(vec![
                    Phase::event(
                        Event::new(EventKind::HeroDeath)
                            .with_source(hero)
                            .with_player(*player),
                    ),
                    Phase::CheckWin,
                ])
            }

            PlayerAction::PlaySpell { player, card, target } => {
                let mut text = Event::new(EventKind::SpellText)
                    .with_source(*card)
                    .with_player(*player);
                if let Some(target) = target {
                    text = text.with_target(*target);
                }
                Ok(vec![
                    Phase::event(
                        Event::new(EventKind::OnPlaySpell)
                            .with_source(*card)
                            .with_player(*player),
                    ),
                    Phase::event(text),
                    Phase::event(
                        Event::new(EventKind::AfterSpell)
                            .with_source(*card)
                            .with_player(*player),
                    ),
                    Phase::CheckWin,
                ])
            }

            PlayerAction::PlayWeapon { player, card } => Ok(vec![
                Phase::event(
                    Event::new(EventKind::OnPlayWeapon)
                        .with_source(*card)
                        .with_player(*player),
                ),
                Phase::event(
                    Event::new(EventKind::EquipWeapon)
                        .with_source(*card)
                        .with_player(*player),
                ),
                Phase::event(
                    Event::new(EventKind::AfterPlayWeapon)
                        .with_source(*card)
                        .with_player(*player),
                ),
                Phase::CheckWin,
            ]),

            PlayerAction::PlayMinion {
                player,
                card,
                location,
                target,
            } => {
                let mut battlecry = Event::new(EventKind::Battlecry)
                    .with_source(*card)
                    .with_player(*player);
                if let Some(target) = target {
                    battlecry = battlecry.with_target(*target);
                }
                Ok(vec![
                    Phase::event(
                        Event::new(EventKind::OnPlayMinion)
                            .with_source(*card)
                            .with_player(*player)
                            .with_location(*location),
                    ),
                    Phase::event(battlecry),
                    Phase::event(
                        Event::new(EventKind::AfterPlayMinion)
                            .with_source(*card)
                            .with_player(*player),
                    ),
                    Phase::event(
                        Event::new(EventKind::AfterSummon)
                            .with_source(*card)
                            .with_player(*player),
                    ),
                    Phase::CheckWin,
                ])
            }

            PlayerAction::ToAttack {
                player,
                attacker,
                defender,
            } => {
                let oop = self.entities.get(*attacker)?.oop.unwrap_or(0);
                // One shared attack proposal: disabling it cancels both
                // combat phases at once
                let attack = Event::new(EventKind::Attack)
                    .with_source(*attacker)
                    .with_target(*defender)
                    .with_player(*player)
                    .with_oop(oop)
                    .into_ref();
                Ok(vec![
                    Phase::Event(
                        Event::new(EventKind::PrepareCombat)
                            .with_player(*player)
                            .with_oop(oop)
                            .with_pre(attack.clone())
                            .into_ref(),
                    ),
                    Phase::CheckWin,
                    Phase::Event(
                        Event::new(EventKind::Combat)
                            .with_player(*player)
                            .with_oop(oop)
                            .with_pre(attack)
                            .into_ref(),
                    ),
                    Phase::CheckWin,
                ])
            }

            PlayerAction::UseHeroPower { player, target } => {
                let hero_power = self
                    .hero_power_of(*player)
                    .ok_or_else(|| HsError::IllegalAction("player has no hero power".to_string()))?;
                let mut phase = Event::new(EventKind::HeroPowerPhase)
                    .with_source(hero_power)
                    .with_player(*player);
                if let Some(target) = target {
                    phase = phase.with_target(*target);
                }
                Ok(vec![
                    Phase::event(phase),
                    Phase::event(
                        Event::new(EventKind::AfterHeroPower)
                            .with_source(hero_power)
                            .with_player(*player),
                    ),
                    Phase::CheckWin,
                ])
            }
        }
    }
}
