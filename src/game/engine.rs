//! The event resolution engine
//!
//! Everything that happens in a game is an event. Player actions expand into
//! fixed phase queues; resolving a phase fires its before-triggers, runs its
//! effect, resolves its consequence events depth-first, fires its
//! after-triggers, and (for outermost phases only) runs the post-phase
//! cleanup sequence: attack/health aura update, summon resolution, another
//! attack/health update, death creation, other-aura update, and injection of
//! a Death Phase for whatever died.

use crate::core::{CardKind, DetachWhen, EnchantId, EntityId, PlayerId, TriggerId};
use crate::game::aura::AuraKind;
use crate::game::event::{Event, EventKind, EventRef, Phase};
use crate::game::state::{DeathRecord, GameState, ResolvedItem};
use crate::game::trigger::Timing;
use crate::zones::{FullZonePolicy, Zone, ZoneLocator};
use crate::{HsError, Result};

impl GameState {
    /// Resolve a queue of phases. `depth` 0 means outermost: only there does
    /// the post-phase cleanup sequence run and the terminal win check get
    /// appended.
    ///
    /// The queue is traversed by index because triggers may truncate it
    /// (cancellation) and the cleanup sequence may insert a Death Phase
    /// right after the current position.
    pub fn resolve_events(&mut self, events: &mut Vec<Phase>, depth: u32) -> Result<()> {
        if self.progress != crate::core::GameProgress::Main || self.game_result.is_some() {
            return Ok(());
        }
        let mut i = 0;
        while i < events.len() {
            let phase = events[i].clone();
            match &phase {
                Phase::CheckWin => {
                    self.check_win();
                    if self.game_result.is_some() {
                        return Ok(());
                    }
                }
                Phase::Event(ev) => {
                    // Before-triggers resolve against each declared pre-event
                    // (the event itself when none are declared)
                    let pres: Vec<EventRef> = {
                        let borrowed = ev.borrow();
                        if borrowed.pre.is_empty() {
                            vec![ev.clone()]
                        } else {
                            borrowed.pre.iter().cloned().collect()
                        }
                    };
                    for pre in &pres {
                        self.collect_resolve_triggers(pre, Timing::Before, depth)?;
                    }

                    let mut consequences = Vec::new();
                    if ev.borrow().enabled {
                        consequences = self.do_event(ev)?;
                        let snapshot = ev.borrow().clone();
                        self.logger.verbose(&format!("resolved {snapshot:?}"));
                        self.event_history.push(snapshot);
                        let borrowed = ev.borrow();
                        for cb in &self.callbacks.event {
                            cb(&borrowed);
                        }
                    }
                    if !consequences.is_empty() {
                        self.resolve_events(&mut consequences, depth + 1)?;
                        if self.game_result.is_some() {
                            return Ok(());
                        }
                    }
                    if ev.borrow().enabled {
                        self.collect_resolve_triggers(ev, Timing::After, depth)?;
                    }
                    if self.game_result.is_some() {
                        return Ok(());
                    }

                    // Cancellation truncates the rest of this queue only
                    if self.stop_subsequent_phases {
                        self.stop_subsequent_phases = false;
                        events.truncate(i + 1);
                    }

                    if depth == 0 && !ev.borrow().skip_cleanup {
                        self.aura_update_attack_health();
                        let mut summons = self.summon_resolution();
                        if !summons.is_empty() {
                            self.resolve_events(&mut summons, depth + 1)?;
                            if self.game_result.is_some() {
                                return Ok(());
                            }
                        }
                        self.aura_update_attack_health();
                        let deaths = self.death_creation_step()?;
                        self.aura_update_other();
                        if !deaths.is_empty() {
                            let mut death_phase = Event::new(EventKind::DeathPhase);
                            death_phase.deaths = deaths;
                            events.insert(i + 1, Phase::Event(death_phase.into_ref()));
                        }
                    }

                    let borrowed = ev.borrow();
                    for cb in &self.callbacks.resolve {
                        cb(ResolvedItem::Event(&borrowed));
                    }
                }
            }

            // The outermost queue always ends on a win check
            if depth == 0 && i + 1 == events.len() && !matches!(events[i], Phase::CheckWin) {
                events.push(Phase::CheckWin);
            }
            i += 1;
        }
        Ok(())
    }

    /// Gather the triggers subscribed to this event (through its kind's
    /// ancestor chain), order them by order-of-play, and resolve them.
    fn collect_resolve_triggers(&mut self, current: &EventRef, timing: Timing, depth: u32) -> Result<()> {
        let snapshot = current.borrow().clone();
        let mut related: Vec<TriggerId> = Vec::new();
        for kind in snapshot.kind.ancestors() {
            if let Some(ids) = self.trigger_index.get(&(kind, timing)) {
                for &id in ids {
                    if !related.contains(&id) {
                        related.push(id);
                    }
                }
            }
        }
        if related.is_empty() {
            return Ok(());
        }
        let mut queue: Vec<(u32, TriggerId)> = Vec::new();
        for id in related {
            let (alive, oop, effect) = match self.triggers.get(&id) {
                Some(t) => (t.alive, t.oop, t.effect.clone()),
                None => continue,
            };
            if !alive {
                continue;
            }
            if effect.queue_condition(self, &snapshot) {
                queue.push((oop, id));
            }
        }
        // Order-of-play, id as the registration-order tie-break
        queue.sort_by_key(|&(oop, id)| (oop, id));
        let queue: Vec<TriggerId> = queue.into_iter().map(|(_, id)| id).collect();
        if !queue.is_empty() {
            self.resolve_triggers(queue, current, depth)?;
        }
        Ok(())
    }

    /// Resolve an ordered trigger queue against a shared event. An earlier
    /// trigger disabling the event, or a failed trigger condition, stops the
    /// whole queue; a trigger that merely died since queueing is skipped.
    fn resolve_triggers(&mut self, queue: Vec<TriggerId>, current: &EventRef, depth: u32) -> Result<()> {
        for id in queue {
            if self.game_result.is_some() {
                return Ok(());
            }
            if !current.borrow().enabled {
                return Ok(());
            }
            let (alive, one_shot, effect) = match self.triggers.get(&id) {
                Some(t) => (t.alive, t.one_shot, t.effect.clone()),
                None => continue,
            };
            if !alive {
                continue;
            }
            let snapshot = current.borrow().clone();
            if !effect.trigger_condition(self, &snapshot) {
                return Ok(());
            }

            let mut new_phases = effect.process(self, current)?;
            if one_shot {
                self.remove_trigger(id);
            }
            {
                let borrowed = current.borrow();
                for cb in &self.callbacks.trigger {
                    cb(id, &borrowed);
                }
            }
            if !new_phases.is_empty() {
                self.resolve_events(&mut new_phases, depth + 1)?;
            }
            let borrowed = current.borrow();
            for cb in &self.callbacks.resolve {
                cb(ResolvedItem::Trigger(id, &borrowed));
            }
        }
        Ok(())
    }

    /// Run one event's own effect; returns its consequence phases
    fn do_event(&mut self, ev: &EventRef) -> Result<Vec<Phase>> {
        let snap = ev.borrow().clone();
        match snap.kind {
            EventKind::GameBegin => {
                self.logger.normal("the game begins");
                Ok(Vec::new())
            }
            EventKind::BeginOfTurn => {
                self.advance_turn()?;
                Ok(Vec::new())
            }
            EventKind::EndOfTurn => {
                self.expire_end_of_turn_enchantments();
                Ok(Vec::new())
            }
            EventKind::DrawCard => {
                let player = snap.player.unwrap_or(self.current_player);
                self.perform_draw(player)
            }
            EventKind::Damage => {
                self.perform_damage(&snap)?;
                Ok(Vec::new())
            }

            EventKind::OnPlaySpell => {
                let (source, player) = event_source_player(&snap)?;
                self.pay_cost(player, source)?;
                self.move_entity(
                    player,
                    Zone::Hand,
                    ZoneLocator::Entity(source),
                    player,
                    Zone::SetAside,
                    ZoneLocator::Last,
                    FullZonePolicy::Destroy,
                )?;
                Ok(Vec::new())
            }
            EventKind::SpellText => {
                let source = snap.source.ok_or_else(|| missing_field("SpellText", "source"))?;
                let behavior = self.entities.get(source)?.behavior.clone();
                behavior.run(self, &snap)
            }
            EventKind::AfterSpell => {
                let (source, player) = event_source_player(&snap)?;
                self.move_entity(
                    player,
                    Zone::SetAside,
                    ZoneLocator::Entity(source),
                    player,
                    Zone::Graveyard,
                    ZoneLocator::Last,
                    FullZonePolicy::Destroy,
                )?;
                Ok(Vec::new())
            }

            EventKind::OnPlayMinion => {
                let (source, player) = event_source_player(&snap)?;
                self.pay_cost(player, source)?;
                let to = snap.location.map(ZoneLocator::Index).unwrap_or(ZoneLocator::Last);
                self.enter_play(source, to, FullZonePolicy::Destroy)?;
                Ok(Vec::new())
            }
            EventKind::Battlecry => {
                let source = snap.source.ok_or_else(|| missing_field("Battlecry", "source"))?;
                let behavior = self.entities.get(source)?.behavior.clone();
                behavior.run_battlecry(self, &snap)
            }

            EventKind::OnPlayWeapon => {
                let (source, player) = event_source_player(&snap)?;
                self.pay_cost(player, source)?;
                Ok(Vec::new())
            }
            EventKind::EquipWeapon => {
                let (source, player) = event_source_player(&snap)?;
                self.perform_equip(player, source)?;
                Ok(Vec::new())
            }

            EventKind::PrepareCombat => self.perform_prepare_combat(ev),
            EventKind::Combat => self.perform_combat(ev),

            EventKind::HeroPowerPhase => {
                let (source, player) = event_source_player(&snap)?;
                self.pay_cost(player, source)?;
                self.get_player_mut(player)?.hero_power_used = true;
                let behavior = self.entities.get(source)?.behavior.clone();
                behavior.run(self, &snap)
            }

            EventKind::HeroDeath => {
                let source = snap.source.ok_or_else(|| missing_field("HeroDeath", "source"))?;
                self.entities.get_mut(source)?.play_state = false;
                self.logger.minimal(&format!("hero {source} has fallen"));
                Ok(Vec::new())
            }
            EventKind::MinionDeath | EventKind::WeaponDeath => {
                self.logger.verbose(&format!("{:?} of {:?}", snap.kind, snap.source));
                Ok(Vec::new())
            }

            EventKind::DeathPhase => {
                let deaths: Vec<EventRef> = ev.borrow_mut().deaths.drain(..).collect();
                self.death_cache.clear();
                Ok(deaths.into_iter().map(Phase::Event).collect())
            }

            // Markers: exist only so triggers can subscribe to them
            EventKind::Summon
            | EventKind::AfterSummon
            | EventKind::AfterPlayMinion
            | EventKind::AfterPlayWeapon
            | EventKind::AfterHeroPower
            | EventKind::Attack
            | EventKind::Death => Ok(Vec::new()),
        }
    }

    fn pay_cost(&mut self, player: PlayerId, entity: EntityId) -> Result<()> {
        let cost = self.entities.get(entity)?.data.cost;
        self.get_player_mut(player)?.spend_mana(cost);
        Ok(())
    }

    fn perform_draw(&mut self, player: PlayerId) -> Result<Vec<Phase>> {
        if self.get_zone(Zone::Deck, player)?.is_empty() {
            let fatigue = self.get_player_mut(player)?.next_fatigue();
            let hero = self.hero_of(player)?;
            let oop = self.entities.get(hero)?.oop.unwrap_or(0);
            self.logger
                .normal(&format!("player {player} is out of cards, fatigue hits for {fatigue}"));
            return Ok(vec![Phase::event(
                Event::new(EventKind::Damage)
                    .with_source(hero)
                    .with_target(hero)
                    .with_player(player)
                    .with_amount(fatigue)
                    .with_oop(oop),
            )]);
        }

        let card = self.get_zone(Zone::Deck, player)?.peek_top();
        let outcome = self.move_entity(
            player,
            Zone::Deck,
            ZoneLocator::Last,
            player,
            Zone::Hand,
            ZoneLocator::Last,
            FullZonePolicy::Destroy,
        )?;
        if let Some(card) = card {
            let name = self.entities.get(card)?.name().to_string();
            if outcome.success {
                self.logger.normal(&format!("player {player} draws {name}"));
            } else {
                self.logger.normal(&format!("hand full, {name} is burned"));
            }
        }
        Ok(Vec::new())
    }

    fn perform_damage(&mut self, event: &Event) -> Result<()> {
        let Some(target) = event.target else {
            return Ok(());
        };
        if event.amount <= 0 || !self.entities.contains(target) {
            return Ok(());
        }
        let entity = self.entities.get_mut(target)?;
        entity.damage += event.amount;
        let name = entity.name().to_string();
        let health = entity.health();
        self.logger
            .normal(&format!("{name} takes {} damage ({health} left)", event.amount));
        Ok(())
    }

    /// Equip a weapon from the hand. An existing weapon is destroyed on the
    /// spot: its death event joins the instant-death queue and resolves with
    /// the next Death Phase.
    fn perform_equip(&mut self, player: PlayerId, weapon: EntityId) -> Result<()> {
        if let Some(old) = self.weapon_of(player) {
            let (oop, behavior) = {
                let e = self.entities.get(old)?;
                (e.oop.unwrap_or(0), e.behavior.clone())
            };
            let death = Event::new(EventKind::WeaponDeath)
                .with_source(old)
                .with_player(player)
                .with_oop(oop)
                .into_ref();
            self.instant_death_events.push(death);
            behavior.on_death(self, old);
            self.move_entity(
                player,
                Zone::Weapon,
                ZoneLocator::Entity(old),
                player,
                Zone::Graveyard,
                ZoneLocator::Last,
                FullZonePolicy::Destroy,
            )?;
        }
        let outcome = self.move_entity(
            player,
            Zone::Hand,
            ZoneLocator::Entity(weapon),
            player,
            Zone::Weapon,
            ZoneLocator::Last,
            FullZonePolicy::Destroy,
        )?;
        if outcome.success {
            let behavior = self.entities.get(weapon)?.behavior.clone();
            behavior.on_enter_play(self, weapon);
        }
        Ok(())
    }

    /// Re-validate the attack just before combat; before-triggers may have
    /// removed or killed either side. An illegal attack disables the shared
    /// attack pre-event and cancels the rest of the combat queue.
    fn perform_prepare_combat(&mut self, ev: &EventRef) -> Result<Vec<Phase>> {
        let attack = combat_attack_event(ev)?;
        let (attacker, defender) = attack_pair(&attack)?;
        if !self.combat_still_legal(attacker, defender) {
            attack.borrow_mut().disable();
            self.stop_subsequent_phases();
            self.message_refusal("the attack is no longer legal");
        }
        Ok(Vec::new())
    }

    fn perform_combat(&mut self, ev: &EventRef) -> Result<Vec<Phase>> {
        let attack = combat_attack_event(ev)?;
        if !attack.borrow().enabled {
            return Ok(Vec::new());
        }
        let (attacker, defender) = attack_pair(&attack)?;
        if !self.combat_still_legal(attacker, defender) {
            return Ok(Vec::new());
        }

        let attacker_damage = self.effective_attack(attacker);
        let defender_damage = self.effective_attack(defender);
        let (attacker_kind, attacker_player, attacker_oop) = {
            let e = self.entities.get(attacker)?;
            (e.kind(), e.player, e.oop.unwrap_or(0))
        };
        let defender_oop = self.entities.get(defender)?.oop.unwrap_or(0);

        self.entities.get_mut(attacker)?.attacks_this_turn += 1;
        if attacker_kind == CardKind::Hero {
            if let Some(weapon) = attacker_player.and_then(|p| self.weapon_of(p)) {
                self.entities.get_mut(weapon)?.damage += 1;
                self.logger.verbose("weapon loses 1 durability");
            }
        }

        self.logger.normal(&format!(
            "{} attacks {}",
            self.entities.get(attacker)?.name(),
            self.entities.get(defender)?.name()
        ));

        let mut consequences = vec![Phase::event(
            Event::new(EventKind::Damage)
                .with_source(attacker)
                .with_target(defender)
                .with_amount(attacker_damage)
                .with_oop(attacker_oop),
        )];
        if defender_damage > 0 {
            consequences.push(Phase::event(
                Event::new(EventKind::Damage)
                    .with_source(defender)
                    .with_target(attacker)
                    .with_amount(defender_damage)
                    .with_oop(defender_oop),
            ));
        }
        Ok(consequences)
    }

    fn combat_still_legal(&self, attacker: EntityId, defender: EntityId) -> bool {
        let (Ok(a), Ok(d)) = (self.entities.get(attacker), self.entities.get(defender)) else {
            return false;
        };
        a.alive()
            && d.alive()
            && a.zone.is_in_play()
            && d.zone.is_in_play()
            && self.effective_attack(attacker) > 0
    }

    fn expire_end_of_turn_enchantments(&mut self) {
        let expiring: Vec<EnchantId> = self
            .enchantments
            .values()
            .filter(|e| e.detach == DetachWhen::EndOfTurn)
            .map(|e| e.id)
            .collect();
        for id in expiring {
            let _ = self.detach_enchantment(id);
        }
    }

    // ------------------------------------------------------------------
    // Post-phase cleanup steps
    // ------------------------------------------------------------------

    /// Flush the deferred Summon events, ordered by order-of-play
    fn summon_resolution(&mut self) -> Vec<Phase> {
        if self.summon_events.is_empty() {
            return Vec::new();
        }
        let mut events = std::mem::take(&mut self.summon_events);
        events.sort_by_key(event_order_key);
        events.into_iter().map(Phase::Event).collect()
    }

    /// Scan every mortally-wounded or pending-destroy entity in play and
    /// create its death event. Deathrattles are registered before any
    /// physical move, recorded minion locations are corrected for
    /// same-batch lower-order removals, and queued instant deaths are
    /// merged in. The result is one order-of-play-sorted death batch.
    pub fn death_creation_step(&mut self) -> Result<Vec<EventRef>> {
        let mut deaths: Vec<EventRef> = Vec::new();
        for idx in 0..self.players.len() {
            let player = PlayerId::new(idx as u32);

            for id in self.get_zone(Zone::Weapon, player)?.entities.clone() {
                let e = self.entities.get(id)?;
                if !e.alive() {
                    deaths.push(
                        Event::new(EventKind::WeaponDeath)
                            .with_source(id)
                            .with_player(player)
                            .with_oop(e.oop.unwrap_or(0))
                            .into_ref(),
                    );
                }
            }
            // Heroes whose death already resolved are not collected again
            for id in self.get_zone(Zone::Hero, player)?.entities.clone() {
                let e = self.entities.get(id)?;
                if e.play_state && !e.alive() {
                    deaths.push(
                        Event::new(EventKind::HeroDeath)
                            .with_source(id)
                            .with_player(player)
                            .with_oop(e.oop.unwrap_or(0))
                            .into_ref(),
                    );
                }
            }

            let mut batch: Vec<(EntityId, u32, usize)> = Vec::new();
            let play: Vec<EntityId> = self.get_zone(Zone::Play, player)?.entities.clone();
            for (location, id) in play.into_iter().enumerate() {
                let e = self.entities.get(id)?;
                if !e.alive() {
                    batch.push((id, e.oop.unwrap_or(0), location));
                }
            }
            // Each recorded location drops by the number of same-batch
            // deaths to its left that resolve earlier (lower order-of-play)
            for i in 0..batch.len() {
                let earlier = batch[..i].iter().filter(|d| d.1 < batch[i].1).count();
                batch[i].2 -= earlier;
            }
            for (id, oop, location) in batch {
                deaths.push(
                    Event::new(EventKind::MinionDeath)
                        .with_source(id)
                        .with_player(player)
                        .with_location(location)
                        .with_oop(oop)
                        .into_ref(),
                );
            }
        }

        if deaths.is_empty() && self.instant_death_events.is_empty() {
            return Ok(deaths);
        }

        // Deathrattles register while the dying entity is still in place
        for ev in &deaths {
            let source = ev.borrow().source;
            if let Some(id) = source {
                let behavior = self.entities.get(id)?.behavior.clone();
                behavior.on_death(self, id);
            }
        }

        // Physical moves; heroes stay on the battlefield
        for ev in &deaths {
            let (source, player) = {
                let b = ev.borrow();
                (b.source, b.player)
            };
            let (Some(id), Some(player)) = (source, player) else {
                continue;
            };
            self.death_cache.push(DeathRecord {
                entity: id,
                player: Some(player),
                turn: self.n_turns,
            });
            let (kind, zone) = {
                let e = self.entities.get(id)?;
                (e.kind(), e.zone)
            };
            if kind == CardKind::Hero {
                continue;
            }
            self.move_entity(
                player,
                zone,
                ZoneLocator::Entity(id),
                player,
                Zone::Graveyard,
                ZoneLocator::Last,
                FullZonePolicy::Destroy,
            )?;
        }

        for ev in self.instant_death_events.drain(..) {
            {
                let b = ev.borrow();
                if let Some(id) = b.source {
                    self.death_cache.push(DeathRecord {
                        entity: id,
                        player: b.player,
                        turn: self.n_turns,
                    });
                }
            }
            deaths.push(ev);
        }
        deaths.sort_by_key(event_order_key);
        Ok(deaths)
    }

    /// Attack/health aura pass plus full stat recalculation
    pub fn aura_update_attack_health(&mut self) {
        self.aura_update_shared(AuraKind::AttackHealth);
        self.recalc_all_stats();
    }

    /// Other-aura pass (abilities and the like)
    pub fn aura_update_other(&mut self) {
        self.aura_update_shared(AuraKind::Other);
        self.recalc_all_stats();
    }

    /// One aura recalculation pass. Removed auras detach their grants
    /// exactly once; active auras re-evaluate their predicate against every
    /// scannable entity, granting or detaching as needed. Attack/health
    /// grants that persist are moved to the end of the enchantment list so
    /// repeated passes converge on a stable order.
    fn aura_update_shared(&mut self, kind: AuraKind) {
        let mut set = std::mem::take(self.auras.set_mut(kind));

        for mut aura in set.removed.drain(..) {
            for (_, ench) in std::mem::take(&mut aura.granted) {
                let _ = self.detach_enchantment(ench);
            }
        }

        for aura in set.active.iter_mut() {
            let owner = aura.owner;
            aura.effect.prepare_update(self, owner);
        }

        let scan = self.scan_entity_ids();
        for aura in set.active.iter_mut() {
            for &entity in &scan {
                let applies =
                    self.entities.contains(entity) && aura.effect.applies_to(self, aura.owner, entity);
                match (applies, aura.granted_to(entity)) {
                    (true, None) => {
                        let (apply, detach) = aura.effect.grant();
                        if let Ok(ench) =
                            self.attach_enchantment(entity, Some(aura.owner), apply, detach, Some(aura.id))
                        {
                            aura.granted.push((entity, ench));
                        }
                    }
                    (true, Some(ench)) => {
                        if kind == AuraKind::AttackHealth {
                            self.move_enchantment_to_end(entity, ench);
                        }
                    }
                    (false, Some(ench)) => {
                        aura.granted.retain(|&(target, _)| target != entity);
                        let _ = self.detach_enchantment(ench);
                    }
                    (false, None) => {}
                }
            }
        }

        // Auras registered while this pass ran (e.g. by a summoned minion)
        let added = std::mem::take(self.auras.set_mut(kind));
        set.active.extend(added.active);
        set.removed.extend(added.removed);
        *self.auras.set_mut(kind) = set;
    }
}

fn event_source_player(event: &Event) -> Result<(EntityId, PlayerId)> {
    match (event.source, event.player) {
        (Some(source), Some(player)) => Ok((source, player)),
        _ => Err(HsError::IllegalAction(format!(
            "{:?} event missing source or player",
            event.kind
        ))),
    }
}

fn event_order_key(ev: &EventRef) -> (u32, u32) {
    let b = ev.borrow();
    (b.oop, b.source.map(|s| s.as_u32()).unwrap_or(0))
}

fn combat_attack_event(ev: &EventRef) -> Result<EventRef> {
    ev.borrow()
        .pre
        .first()
        .cloned()
        .ok_or_else(|| HsError::IllegalAction("combat phase without an attack pre-event".to_string()))
}

fn attack_pair(attack: &EventRef) -> Result<(EntityId, EntityId)> {
    let b = attack.borrow();
    match (b.source, b.target) {
        (Some(attacker), Some(defender)) => Ok((attacker, defender)),
        _ => Err(HsError::IllegalAction(
            "attack event missing attacker or defender".to_string(),
        )),
    }
}

fn missing_field(kind: &str, field: &str) -> HsError {
    HsError::IllegalAction(format!("{kind} event missing {field}"))
}
