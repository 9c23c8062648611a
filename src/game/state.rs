//! Main game state structure
//!
//! One `GameState` is one game instance: entities, zones, the trigger and
//! aura registries, callbacks and the engine caches all live here. Nothing
//! is process-global, so multiple games can run side by side.

use crate::core::{
    AuraId, CardBehavior, CardData, CardKind, EnchantId, Entity, EntityId, EntityStore, GameOutcome,
    GameProgress, Player, PlayerId, TriggerId,
};
use crate::core::{DetachWhen, EnchantApply, Enchantment};
use crate::game::aura::{Aura, AuraEffect, AuraKind, AuraRegistry};
use crate::game::event::{Event, EventKind, EventRef, Phase};
use crate::game::logger::GameLogger;
use crate::game::trigger::{Timing, Trigger, TriggerEffect};
use crate::zones::{EntityZone, FullZonePolicy, MoveOutcome, PlayerZones, Zone, ZoneLocator};
use crate::{HsError, Result};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Turn number after which the game is declared a draw
pub const TURN_MAX: i32 = 100;

/// A deck submitted at game start: a hero card id plus the card list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSpec {
    pub hero: u32,
    pub cards: Vec<u32>,
}

/// One entry of the death cache: an entity marked dead but not yet through
/// its Death Phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeathRecord {
    pub entity: EntityId,
    pub player: Option<PlayerId>,
    pub turn: i32,
}

/// What a resolve callback is being notified about (post-order)
pub enum ResolvedItem<'a> {
    Event(&'a Event),
    Trigger(TriggerId, &'a Event),
}

/// Presentation-layer callback channels. Return values are ignored and
/// callbacks receive shared references only - they cannot mutate the engine.
#[derive(Default)]
pub struct Callbacks {
    /// Fired just after each event's effect runs (pre-order)
    pub event: Vec<Rc<dyn Fn(&Event)>>,
    /// Fired just after each trigger's effect runs (pre-order)
    pub trigger: Vec<Rc<dyn Fn(TriggerId, &Event)>>,
    /// Fired after an event or trigger fully settles (post-order)
    pub resolve: Vec<Rc<dyn Fn(ResolvedItem<'_>)>>,
    pub game_start: Vec<Rc<dyn Fn()>>,
    pub game_end: Vec<Rc<dyn Fn(GameOutcome)>>,
    /// Rule-legal rejection messages ("not enough mana", ...)
    pub message: Vec<Rc<dyn Fn(&str)>>,
}

/// Complete game state
pub struct GameState {
    pub progress: GameProgress,

    /// Turn counter; -1 before the first Begin-of-Turn resolves
    pub n_turns: i32,

    pub game_result: Option<GameOutcome>,

    pub current_player: PlayerId,

    /// Next-player buffer. Triggers may push entries to grant extra turns;
    /// a `None` entry keeps the current player (used for the first turn).
    pub player_buffer: VecDeque<Option<PlayerId>>,

    pub players: Vec<Player>,

    pub player_zones: Vec<PlayerZones>,

    pub entities: EntityStore<Entity>,

    pub enchantments: FxHashMap<EnchantId, Enchantment>,

    /// All registered triggers
    pub triggers: FxHashMap<TriggerId, Trigger>,

    /// Subscription table: (event kind, timing) -> trigger ids, in
    /// registration order
    pub trigger_index: FxHashMap<(EventKind, Timing), Vec<TriggerId>>,

    pub auras: AuraRegistry,

    pub callbacks: Callbacks,

    /// Order-of-play well; monotonically increasing, never reused
    current_oop: u32,

    /// In-flight cancellation flag; truncates the current phase queue
    pub(crate) stop_subsequent_phases: bool,

    /// Entities marked dead but not yet through their Death Phase
    pub death_cache: Vec<DeathRecord>,

    /// Summon events awaiting the Summon Resolution Step
    pub(crate) summon_events: Vec<EventRef>,

    /// Queued instant-death events (full-zone removal, weapon replacement)
    pub(crate) instant_death_events: Vec<EventRef>,

    /// All resolved events, for diagnostics
    pub event_history: Vec<Event>,

    /// Pending mulligan submissions
    pub(crate) replaces: [Option<Vec<usize>>; 2],

    /// Deterministic RNG (start player, shuffles). RefCell so the RNG can be
    /// used while the state is otherwise borrowed immutably.
    pub rng: RefCell<ChaCha12Rng>,

    pub logger: GameLogger,

    next_trigger_id: u32,
    next_enchant_id: u32,
    next_aura_id: u32,
}

impl GameState {
    /// Create a new (not yet started) game with two players
    pub fn new_two_player(player1_name: impl Into<String>, player2_name: impl Into<String>) -> Self {
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        GameState {
            progress: GameProgress::Invalid,
            n_turns: -1,
            game_result: None,
            current_player: p0,
            player_buffer: VecDeque::new(),
            players: vec![Player::new(p0, player1_name), Player::new(p1, player2_name)],
            player_zones: vec![PlayerZones::new(p0), PlayerZones::new(p1)],
            entities: EntityStore::new(),
            enchantments: FxHashMap::default(),
            triggers: FxHashMap::default(),
            trigger_index: FxHashMap::default(),
            auras: AuraRegistry::new(),
            callbacks: Callbacks::default(),
            current_oop: 0,
            stop_subsequent_phases: false,
            death_cache: Vec::new(),
            summon_events: Vec::new(),
            instant_death_events: Vec::new(),
            event_history: Vec::new(),
            replaces: [None, None],
            rng: RefCell::new(ChaCha12Rng::seed_from_u64(0)),
            logger: GameLogger::new(),
            next_trigger_id: 0,
            next_enchant_id: 0,
            next_aura_id: 0,
        }
    }

    /// Set the RNG seed for deterministic games
    pub fn seed_rng(&mut self, seed: u64) {
        *self.rng.borrow_mut() = ChaCha12Rng::seed_from_u64(seed);
    }

    /// Next order-of-play tag. Strictly increasing across the whole game,
    /// so simultaneous-event ordering is total by construction.
    pub fn next_oop(&mut self) -> u32 {
        self.current_oop += 1;
        self.current_oop
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn get_player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .get(id.as_usize())
            .ok_or(HsError::EntityNotFound(id.as_u32()))
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .get_mut(id.as_usize())
            .ok_or(HsError::EntityNotFound(id.as_u32()))
    }

    pub fn get_zone(&self, zone: Zone, player: PlayerId) -> Result<&EntityZone> {
        self.player_zones
            .get(player.as_usize())
            .map(|z| z.zone(zone))
            .ok_or(HsError::EntityNotFound(player.as_u32()))
    }

    pub fn get_zone_mut(&mut self, zone: Zone, player: PlayerId) -> Result<&mut EntityZone> {
        self.player_zones
            .get_mut(player.as_usize())
            .map(|z| z.zone_mut(zone))
            .ok_or(HsError::EntityNotFound(player.as_u32()))
    }

    /// Shuffle a zone with the game RNG. The RNG is swapped out for the
    /// duration so the zone can be borrowed mutably at the same time.
    pub fn shuffle_zone(&mut self, zone: Zone, player: PlayerId) -> Result<()> {
        let mut rng = self.rng.borrow_mut().clone();
        self.get_zone_mut(zone, player)?.shuffle(&mut rng);
        *self.rng.borrow_mut() = rng;
        Ok(())
    }

    pub fn full(&self, zone: Zone, player: PlayerId) -> bool {
        self.get_zone(zone, player).map(|z| z.is_full()).unwrap_or(false)
    }

    /// Index of an entity within its current zone
    pub fn location_of(&self, id: EntityId) -> Option<usize> {
        let entity = self.entities.get(id).ok()?;
        let player = entity.player?;
        self.get_zone(entity.zone, player).ok()?.index_of(id)
    }

    pub fn hero_of(&self, player: PlayerId) -> Result<EntityId> {
        self.get_player(player)?
            .hero
            .ok_or_else(|| HsError::IllegalAction(format!("player {player} has no hero")))
    }

    pub fn weapon_of(&self, player: PlayerId) -> Option<EntityId> {
        self.get_zone(Zone::Weapon, player).ok()?.peek_top()
    }

    pub fn hero_power_of(&self, player: PlayerId) -> Option<EntityId> {
        self.get_zone(Zone::HeroPower, player).ok()?.peek_top()
    }

    /// Attack value used in combat: heroes add their weapon's attack
    pub fn effective_attack(&self, id: EntityId) -> i32 {
        let Ok(entity) = self.entities.get(id) else {
            return 0;
        };
        let mut attack = entity.attack;
        if entity.kind() == CardKind::Hero {
            if let Some(player) = entity.player {
                if let Some(weapon) = self.weapon_of(player) {
                    if let Ok(w) = self.entities.get(weapon) {
                        if w.alive() {
                            attack += w.attack;
                        }
                    }
                }
            }
        }
        attack
    }

    /// All entity ids relevant to aura scans, in deterministic order
    pub fn scan_entity_ids(&self) -> Vec<EntityId> {
        let mut out = Vec::new();
        for zones in &self.player_zones {
            for zone in [Zone::Hero, Zone::HeroPower, Zone::Weapon, Zone::Play, Zone::Secret, Zone::Hand] {
                out.extend(zones.zone(zone).entities.iter().copied());
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Entity creation and relocation
    // ------------------------------------------------------------------

    /// Create a new entity in its owner's set-aside zone
    pub fn create_entity(&mut self, data: CardData, behavior: Rc<dyn CardBehavior>, player: PlayerId) -> EntityId {
        let id = self.entities.next_id();
        let entity = Entity::new(id, data, behavior, player);
        self.entities.insert(id, entity);
        if let Ok(zone) = self.get_zone_mut(Zone::SetAside, player) {
            zone.push(id);
        }
        id
    }

    /// Generate a brand-new entity directly into a zone. Routed through
    /// [`GameState::move_entity`] like every other relocation.
    pub fn generate(
        &mut self,
        player: PlayerId,
        zone: Zone,
        to: ZoneLocator,
        data: CardData,
        behavior: Rc<dyn CardBehavior>,
    ) -> Result<(EntityId, MoveOutcome)> {
        let id = self.create_entity(data, behavior, player);
        let outcome = self.move_entity(
            player,
            Zone::SetAside,
            ZoneLocator::Entity(id),
            player,
            zone,
            to,
            FullZonePolicy::Destroy,
        )?;
        Ok((id, outcome))
    }

    /// Move an entity from one zone to another: the single choke point for
    /// all entity relocation.
    ///
    /// Rule Z1: a move into a full zone kills the entity instead (policy
    /// `Destroy`) or aborts with no state change (policy `Ignore`).
    /// Rule Z1b: a move into the slot the entity already occupies is exempt
    /// from the capacity check.
    #[allow(clippy::too_many_arguments)]
    pub fn move_entity(
        &mut self,
        from_player: PlayerId,
        from_zone: Zone,
        from: ZoneLocator,
        to_player: PlayerId,
        to_zone: Zone,
        to: ZoneLocator,
        on_full: FullZonePolicy,
    ) -> Result<MoveOutcome> {
        // Resolve the source slot; an entity locator that cannot be found
        // in its claimed zone is a hard failure.
        let from_idx = {
            let fz = self.get_zone(from_zone, from_player)?;
            match from {
                ZoneLocator::Index(i) => {
                    if i >= fz.len() {
                        return Err(HsError::ZoneError(format!(
                            "index {i} out of range for {from_zone:?}/{from_player}"
                        )));
                    }
                    i
                }
                ZoneLocator::Entity(id) => fz.index_of(id).ok_or_else(|| {
                    HsError::ZoneError(format!("entity {id} not in {from_zone:?}/{from_player}"))
                })?,
                ZoneLocator::Last => fz
                    .len()
                    .checked_sub(1)
                    .ok_or_else(|| HsError::ZoneError(format!("{from_zone:?}/{from_player} is empty")))?,
            }
        };
        let entity_id = self.get_zone_mut(from_zone, from_player)?.remove_at(from_idx);

        // Rule Z1b: same-slot moves skip the capacity check
        let same_slot = from_player == to_player
            && from_zone == to_zone
            && match to {
                ZoneLocator::Index(i) => i == from_idx,
                ZoneLocator::Entity(id) => id == entity_id,
                ZoneLocator::Last => from_idx == self.get_zone(to_zone, to_player)?.len(),
            };

        if !same_slot && self.full(to_zone, to_player) {
            match on_full {
                FullZonePolicy::Destroy => {
                    self.logger
                        .normal(&format!("{to_zone:?}/{to_player} full, destroying the entity"));
                    // Full-zone instant removal: only battlefield departures
                    // produce an instant-death event.
                    if from_zone == Zone::Play {
                        let (oop, behavior) = {
                            let e = self.entities.get(entity_id)?;
                            (e.oop.unwrap_or(0), e.behavior.clone())
                        };
                        let death = Event::new(EventKind::MinionDeath)
                            .with_source(entity_id)
                            .with_player(from_player)
                            .with_location(from_idx)
                            .with_oop(oop)
                            .into_ref();
                        self.instant_death_events.push(death);
                        // Deathrattles register before the graveyard move
                        behavior.on_death(self, entity_id);
                    }
                    if from_zone.is_in_play() {
                        self.leave_play_cleanup(entity_id);
                    }
                    self.get_zone_mut(Zone::Graveyard, from_player)?.push(entity_id);
                    let entity = self.entities.get_mut(entity_id)?;
                    entity.zone = Zone::Graveyard;
                    entity.player = None;
                    Ok(MoveOutcome {
                        success: false,
                        from_index: Some(from_idx),
                        to_index: None,
                    })
                }
                FullZonePolicy::Ignore => {
                    self.logger
                        .normal(&format!("{to_zone:?}/{to_player} full, ignoring the move"));
                    self.get_zone_mut(from_zone, from_player)?.insert_at(from_idx, entity_id);
                    Ok(MoveOutcome {
                        success: false,
                        from_index: Some(from_idx),
                        to_index: None,
                    })
                }
            }
        } else {
            let to_idx = {
                let tz = self.get_zone_mut(to_zone, to_player)?;
                match to {
                    ZoneLocator::Index(i) => tz.insert_at(i, entity_id),
                    ZoneLocator::Last => {
                        tz.push(entity_id);
                        tz.len() - 1
                    }
                    ZoneLocator::Entity(_) => {
                        return Err(HsError::ZoneError(
                            "entity locator is not a valid destination".to_string(),
                        ))
                    }
                }
            };

            let entering_play = to_zone.is_in_play() && !from_zone.is_in_play();
            let leaving_play = from_zone.is_in_play() && !to_zone.is_in_play();

            if leaving_play {
                self.leave_play_cleanup(entity_id);
            }
            let new_oop = if entering_play { Some(self.next_oop()) } else { None };
            {
                let entity = self.entities.get_mut(entity_id)?;
                entity.zone = to_zone;
                entity.player = Some(to_player);
                if let Some(oop) = new_oop {
                    entity.oop = Some(oop);
                }
                // Back to being a card: wounds and destroy marks reset
                if matches!(to_zone, Zone::Hand | Zone::Deck) {
                    entity.damage = 0;
                    entity.pending_destroy = false;
                }
            }

            Ok(MoveOutcome {
                success: true,
                from_index: Some(from_idx),
                to_index: Some(to_idx),
            })
        }
    }

    /// Bookkeeping when an entity stops being in play: its triggers die
    /// (deathrattles excepted), its auras are queued for detach, and the
    /// enchantments it carries come off.
    fn leave_play_cleanup(&mut self, id: EntityId) {
        self.mark_triggers_dead(id);
        self.auras.remove_owned_by(id);
        self.detach_all_enchantments(id);
        if let Ok(entity) = self.entities.get_mut(id) {
            entity.oop = None;
            entity.exhausted = false;
            entity.attacks_this_turn = 0;
        }
    }

    /// Put an entity into play on the battlefield: move, summoning
    /// sickness, standing-trigger registration and the deferred Summon
    /// event.
    pub fn enter_play(&mut self, id: EntityId, to: ZoneLocator, on_full: FullZonePolicy) -> Result<MoveOutcome> {
        let (player, from_zone) = {
            let e = self.entities.get(id)?;
            (
                e.player.ok_or(HsError::EntityNotFound(id.as_u32()))?,
                e.zone,
            )
        };
        let outcome = self.move_entity(player, from_zone, ZoneLocator::Entity(id), player, Zone::Play, to, on_full)?;
        if outcome.success {
            let (oop, behavior) = {
                let e = self.entities.get_mut(id)?;
                e.exhausted = true;
                (e.oop.unwrap_or(0), e.behavior.clone())
            };
            behavior.on_enter_play(self, id);
            let summon = Event::new(EventKind::Summon)
                .with_source(id)
                .with_player(player)
                .with_oop(oop)
                .into_ref();
            self.summon_events.push(summon);
        }
        Ok(outcome)
    }

    /// Summon a freshly created minion (token, deathrattle spawn). A full
    /// battlefield makes the summon fizzle.
    pub fn summon_minion(
        &mut self,
        player: PlayerId,
        data: CardData,
        behavior: Rc<dyn CardBehavior>,
        to: ZoneLocator,
    ) -> Result<Option<EntityId>> {
        let id = self.create_entity(data, behavior, player);
        let outcome = self.enter_play(id, to, FullZonePolicy::Ignore)?;
        Ok(if outcome.success { Some(id) } else { None })
    }

    // ------------------------------------------------------------------
    // Trigger registry
    // ------------------------------------------------------------------

    pub fn new_trigger_id(&mut self) -> TriggerId {
        let id = TriggerId::new(self.next_trigger_id);
        self.next_trigger_id += 1;
        id
    }

    pub fn register_trigger(&mut self, trigger: Trigger) -> TriggerId {
        let id = trigger.id;
        for &key in &trigger.keys {
            let entry = self.trigger_index.entry(key).or_default();
            if !entry.contains(&id) {
                entry.push(id);
            }
        }
        self.triggers.insert(id, trigger);
        id
    }

    /// Convenience: build and register in one call
    pub fn add_trigger(
        &mut self,
        owner: Option<EntityId>,
        keys: SmallVec<[(EventKind, Timing); 2]>,
        effect: Rc<dyn TriggerEffect>,
    ) -> TriggerId {
        let id = self.new_trigger_id();
        let oop = owner
            .and_then(|o| self.entities.get(o).ok().and_then(|e| e.oop))
            .unwrap_or(0);
        self.register_trigger(Trigger::new(id, owner, oop, keys, effect))
    }

    /// Mark a trigger dead; it is swept later, never removed mid-iteration
    pub fn remove_trigger(&mut self, id: TriggerId) {
        if let Some(t) = self.triggers.get_mut(&id) {
            t.alive = false;
        }
    }

    /// Kill all non-persistent triggers owned by an entity
    pub fn mark_triggers_dead(&mut self, owner: EntityId) {
        for trigger in self.triggers.values_mut() {
            if trigger.owner == Some(owner) && !trigger.persistent {
                trigger.alive = false;
            }
        }
    }

    /// Physically remove dead triggers from the registry
    pub fn sweep_dead_triggers(&mut self) {
        let dead: Vec<TriggerId> = self
            .triggers
            .values()
            .filter(|t| !t.alive)
            .map(|t| t.id)
            .collect();
        if dead.is_empty() {
            return;
        }
        for ids in self.trigger_index.values_mut() {
            ids.retain(|id| !dead.contains(id));
        }
        for id in dead {
            self.triggers.remove(&id);
        }
    }

    // ------------------------------------------------------------------
    // Aura registry
    // ------------------------------------------------------------------

    pub fn register_aura(&mut self, owner: EntityId, kind: AuraKind, effect: Box<dyn AuraEffect>) -> AuraId {
        let id = AuraId::new(self.next_aura_id);
        self.next_aura_id += 1;
        let oop = self
            .entities
            .get(owner)
            .ok()
            .and_then(|e| e.oop)
            .unwrap_or(0);
        self.auras.set_mut(kind).active.push(Aura {
            id,
            owner,
            kind,
            oop,
            effect,
            granted: Vec::new(),
        });
        id
    }

    /// Remove an aura. Its granted enchantments stay attached until the next
    /// recalculation pass of its kind detaches them, exactly once.
    pub fn remove_aura(&mut self, id: AuraId) {
        for kind in [AuraKind::AttackHealth, AuraKind::Other] {
            let set = self.auras.set_mut(kind);
            if let Some(pos) = set.active.iter().position(|a| a.id == id) {
                let aura = set.active.remove(pos);
                set.removed.push(aura);
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // Enchantments
    // ------------------------------------------------------------------

    pub fn attach_enchantment(
        &mut self,
        target: EntityId,
        source: Option<EntityId>,
        apply: EnchantApply,
        detach: DetachWhen,
        granted_by: Option<AuraId>,
    ) -> Result<EnchantId> {
        let id = EnchantId::new(self.next_enchant_id);
        self.next_enchant_id += 1;
        self.entities.get_mut(target)?.enchantments.push(id);
        self.enchantments.insert(
            id,
            Enchantment {
                id,
                target,
                source,
                apply,
                detach,
                granted_by,
            },
        );
        // Enchantments apply immediately (they may briefly apply "out of
        // order" until the next aura update reorders the list)
        self.recalc_entity(target)?;
        Ok(id)
    }

    pub fn detach_enchantment(&mut self, id: EnchantId) -> Result<()> {
        let ench = self
            .enchantments
            .remove(&id)
            .ok_or(HsError::EntityNotFound(id.as_u32()))?;
        if let Ok(entity) = self.entities.get_mut(ench.target) {
            entity.enchantments.retain(|&e| e != id);
        }
        // Scrub aura bookkeeping so a later pass doesn't detach twice
        for kind in [AuraKind::AttackHealth, AuraKind::Other] {
            let set = self.auras.set_mut(kind);
            for aura in set.active.iter_mut().chain(set.removed.iter_mut()) {
                aura.granted.retain(|&(_, e)| e != id);
            }
        }
        let _ = self.recalc_entity(ench.target);
        Ok(())
    }

    pub fn detach_all_enchantments(&mut self, target: EntityId) {
        let ids: Vec<EnchantId> = match self.entities.get(target) {
            Ok(e) => e.enchantments.clone(),
            Err(_) => return,
        };
        for id in ids {
            let _ = self.detach_enchantment(id);
        }
    }

    /// Move an aura grant to the end of its target's enchantment list
    pub(crate) fn move_enchantment_to_end(&mut self, target: EntityId, ench: EnchantId) {
        if let Ok(entity) = self.entities.get_mut(target) {
            if let Some(pos) = entity.enchantments.iter().position(|&e| e == ench) {
                let id = entity.enchantments.remove(pos);
                entity.enchantments.push(id);
            }
        }
    }

    /// Rebuild one entity's attack, max health and ability set from its card
    /// data plus its enchantment list, in list order. Damage is retained, so
    /// a max-health drop can leave the entity mortally wounded.
    pub fn recalc_entity(&mut self, id: EntityId) -> Result<()> {
        let (base_attack, base_health, base_abilities, ench_ids) = {
            let e = self.entities.get(id)?;
            (
                e.data.attack,
                e.data.health,
                e.data.abilities.clone(),
                e.enchantments.clone(),
            )
        };
        let mut attack = base_attack;
        let mut max_health = base_health;
        let mut abilities = base_abilities;
        for ench_id in ench_ids {
            let Some(ench) = self.enchantments.get(&ench_id) else {
                continue;
            };
            match ench.apply {
                EnchantApply::ModifyStats { attack: a, health: h } => {
                    attack += a;
                    max_health += h;
                }
                EnchantApply::SetStats { attack: a, health: h } => {
                    if let Some(a) = a {
                        attack = a;
                    }
                    if let Some(h) = h {
                        max_health = h;
                    }
                }
                EnchantApply::GrantAbility(ability) => {
                    if !abilities.contains(&ability) {
                        abilities.push(ability);
                    }
                }
            }
        }
        let entity = self.entities.get_mut(id)?;
        entity.attack = attack.max(0);
        entity.max_health = max_health;
        entity.abilities = abilities;
        Ok(())
    }

    pub fn recalc_all_stats(&mut self) {
        for id in self.scan_entity_ids() {
            let _ = self.recalc_entity(id);
        }
    }

    // ------------------------------------------------------------------
    // Game lifecycle
    // ------------------------------------------------------------------

    /// Start a new game: build heroes, hero powers and decks through the
    /// content provider, draw opening hands and wait for the mulligan.
    pub fn start_game(
        &mut self,
        decks: [DeckSpec; 2],
        provider: &dyn crate::core::ContentProvider,
    ) -> Result<()> {
        if self.progress != GameProgress::Invalid {
            return Err(HsError::IllegalAction("game already started".to_string()));
        }

        let start_player = PlayerId::new(self.rng.borrow_mut().gen_range(0..2u32));
        self.current_player = start_player;
        self.n_turns = -1;
        self.current_oop = 0;
        self.player_buffer = VecDeque::from([None]);
        self.logger
            .normal(&format!("starting game, player {start_player} goes first"));

        for (idx, deck) in decks.into_iter().enumerate() {
            let player = PlayerId::new(idx as u32);

            let hero_def = provider.create(deck.hero)?;
            if hero_def.data.kind != CardKind::Hero {
                return Err(HsError::InvalidDeck(format!(
                    "card {} is not a hero",
                    deck.hero
                )));
            }
            let hero_power = hero_def.data.hero_power;
            let (hero_id, _) = self.generate(
                player,
                Zone::Hero,
                ZoneLocator::Last,
                hero_def.data,
                hero_def.behavior,
            )?;
            self.get_player_mut(player)?.hero = Some(hero_id);

            if let Some(hp) = hero_power {
                let hp_def = provider.create(hp)?;
                self.generate(player, Zone::HeroPower, ZoneLocator::Last, hp_def.data, hp_def.behavior)?;
            }

            for card_id in &deck.cards {
                let def = provider.create(*card_id)?;
                self.generate(player, Zone::Deck, ZoneLocator::Last, def.data, def.behavior)?;
            }
            self.shuffle_zone(Zone::Deck, player)?;

            let opening = if player == start_player { 3 } else { 4 };
            for _ in 0..opening {
                self.move_entity(
                    player,
                    Zone::Deck,
                    ZoneLocator::Last,
                    player,
                    Zone::Hand,
                    ZoneLocator::Last,
                    FullZonePolicy::Destroy,
                )?;
            }
        }

        self.replaces = [None, None];
        self.progress = GameProgress::WaitReplace;
        Ok(())
    }

    /// Both players have submitted their mulligan: swap the chosen cards
    /// back, start the game proper and resolve the game-begin events.
    pub(crate) fn on_replace_done(&mut self) -> Result<()> {
        let submissions = std::mem::take(&mut self.replaces);
        for (idx, replace) in submissions.into_iter().enumerate() {
            let player = PlayerId::new(idx as u32);
            let mut indices = replace.unwrap_or_default();
            indices.sort_unstable_by(|a, b| b.cmp(a));
            let count = indices.len();
            for i in indices {
                self.move_entity(
                    player,
                    Zone::Hand,
                    ZoneLocator::Index(i),
                    player,
                    Zone::Deck,
                    ZoneLocator::Last,
                    FullZonePolicy::Destroy,
                )?;
            }
            self.shuffle_zone(Zone::Deck, player)?;
            for _ in 0..count {
                self.move_entity(
                    player,
                    Zone::Deck,
                    ZoneLocator::Last,
                    player,
                    Zone::Hand,
                    ZoneLocator::Last,
                    FullZonePolicy::Destroy,
                )?;
            }
        }

        self.progress = GameProgress::Main;
        for cb in &self.callbacks.game_start {
            cb();
        }

        let mut phases = vec![
            Phase::event(Event::new(EventKind::GameBegin)),
            Phase::CheckWin,
            Phase::event(Event::new(EventKind::BeginOfTurn)),
            Phase::CheckWin,
            Phase::event(Event::new(EventKind::DrawCard)),
            Phase::CheckWin,
        ];
        self.resolve_events(&mut phases, 0)?;
        if self.game_result.is_some() {
            self.end_game();
        }
        Ok(())
    }

    /// Do the real work of changing the current player
    pub(crate) fn advance_turn(&mut self) -> Result<()> {
        self.n_turns += 1;
        self.current_player = self.next_player();
        let player = self.current_player;
        self.get_player_mut(player)?.start_turn();
        // Summoning sickness and attack counters reset for the new player
        let mut ids: Vec<EntityId> = self.get_zone(Zone::Play, player)?.entities.clone();
        ids.extend(self.get_zone(Zone::Hero, player)?.entities.iter().copied());
        for id in ids {
            if let Ok(entity) = self.entities.get_mut(id) {
                entity.exhausted = false;
                entity.attacks_this_turn = 0;
            }
        }
        self.logger
            .normal(&format!("turn {} begins for player {player}", self.n_turns));
        Ok(())
    }

    fn next_player(&mut self) -> PlayerId {
        match self.player_buffer.pop_front() {
            // `None` entry: first turn of the game, keep the current player
            Some(None) => self.current_player,
            // Buffered entry: extra turn or similar
            Some(Some(p)) => p,
            // Normal alternation
            None => self.current_player.opponent(),
        }
    }

    /// Request cancellation of the remaining phases of the current queue
    pub fn stop_subsequent_phases(&mut self) {
        self.stop_subsequent_phases = true;
    }

    /// Check for win/lose/draw and record the result
    pub fn check_win(&mut self) {
        if self.n_turns > TURN_MAX {
            self.game_result = Some(GameOutcome::Draw);
            return;
        }
        let state_of = |game: &GameState, idx: u32| -> bool {
            game.players
                .get(idx as usize)
                .and_then(|p| p.hero)
                .and_then(|h| game.entities.get(h).ok())
                .map(|h| h.play_state)
                .unwrap_or(true)
        };
        let p0 = state_of(self, 0);
        let p1 = state_of(self, 1);
        self.game_result = match (p0, p1) {
            (true, true) => None,
            (true, false) => Some(GameOutcome::Win(PlayerId::new(0))),
            (false, true) => Some(GameOutcome::Win(PlayerId::new(1))),
            (false, false) => Some(GameOutcome::Draw),
        };
    }

    pub fn end_game(&mut self) {
        if self.progress == GameProgress::Finished {
            return;
        }
        self.progress = GameProgress::Finished;
        if let Some(result) = self.game_result {
            self.logger.minimal(&format!("game over: {result:?}"));
            for cb in &self.callbacks.game_end {
                cb(result);
            }
        }
    }

    /// Send a rule-legal rejection message to the presentation layer
    pub fn message_refusal(&self, message: &str) {
        self.logger.normal(message);
        for cb in &self.callbacks.message {
            cb(message);
        }
    }

    // ------------------------------------------------------------------
    // Callback registration
    // ------------------------------------------------------------------

    pub fn on_event(&mut self, cb: impl Fn(&Event) + 'static) {
        self.callbacks.event.push(Rc::new(cb));
    }

    pub fn on_trigger(&mut self, cb: impl Fn(TriggerId, &Event) + 'static) {
        self.callbacks.trigger.push(Rc::new(cb));
    }

    pub fn on_resolve(&mut self, cb: impl Fn(ResolvedItem<'_>) + 'static) {
        self.callbacks.resolve.push(Rc::new(cb));
    }

    pub fn on_game_start(&mut self, cb: impl Fn() + 'static) {
        self.callbacks.game_start.push(Rc::new(cb));
    }

    pub fn on_game_end(&mut self, cb: impl Fn(GameOutcome) + 'static) {
        self.callbacks.game_end.push(Rc::new(cb));
    }

    pub fn on_message(&mut self, cb: impl Fn(&str) + 'static) {
        self.callbacks.message.push(Rc::new(cb));
    }
}
