//! Battle Simulation
//!
//! A deterministic, fixed-step simulation of a two-player lane battle.
//! `BattleState` owns an ECS `World` holding every entity and match
//! resource, and a single-threaded `Schedule` that advances it one tick per
//! run. Everything between ticks (deployments, ability activations, scripted
//! damage) goes through the methods here.
//!
//! ## Usage
//! ```ignore
//! let mut battle = create_match(42)?;
//! battle.set_elixir(Player::One, 10.0);
//! battle.deploy(Player::One, "Knight", Vec2::new(9.0, 10.0))?;
//! battle.advance(5.0);
//! println!("{:?}", battle.snapshot());
//! ```

use std::sync::Arc;

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use serde::Serialize;

use crate::combat::events::{BattleEvent, BattleEvents};
use crate::combat::log::{CombatLog, CombatLogEventType};

pub mod arena;
pub mod area;
pub mod combat;
pub mod components;
pub mod constants;
pub mod death;
pub mod effects;
pub mod error;
pub mod match_flow;
pub mod mechanics;
pub mod movement;
pub mod player;
pub mod projectiles;
pub mod rules;
pub mod spawn;
pub mod status;
pub mod systems;
pub mod targeting;
pub mod unit_config;

use arena::{can_deploy, clamp_to_arena, in_bounds, mirror_for, tower_sites};
use components::*;
use constants::{KING_TOWER_ARCHETYPE, KING_TOWER_SITE, PRINCESS_TOWER_ARCHETYPE};
use effects::{ring_offsets, BattleAccess, DamageRequest, EffectRequest};
use error::{AbilityError, ConfigurationError, DeploymentError};
use match_flow::{ElixirPhase, MatchOutcome, MatchStatus};
use mechanics::{AbilityActivation, Mechanics};
use player::{Deck, PlayerState, Players};
use spawn::{spawn_archetype, spawn_tower, SpawnPlacement};
use status::{StatusEffect, StatusEffects, StatusKind};
use systems::{build_schedule, PendingInputs};
use unit_config::{UnitCatalog, UnitDefinition};

// ============================================================================
// Snapshots
// ============================================================================

/// Read-only view of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub owner: Player,
    pub kind: EntityKind,
    /// None for attack projectiles
    pub archetype: Option<String>,
    pub x: f32,
    pub y: f32,
    pub hitpoints: Option<f32>,
    pub max_hitpoints: Option<f32>,
    pub alive: bool,
    pub deployed: bool,
    pub target: Option<EntityId>,
    pub statuses: Vec<StatusKind>,
    pub shield: Option<f32>,
    /// Souls held by a soul collector
    pub souls: Option<u32>,
    pub tower: Option<TowerRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub elixir: f32,
    pub crowns: u32,
    pub hand: Vec<String>,
}

/// Everything observable about a match at a tick boundary. Two matches with
/// the same seed and inputs produce equal snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleSnapshot {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub players: [PlayerSnapshot; 2],
    /// Sorted by id
    pub entities: Vec<EntitySnapshot>,
    pub elixir_phase: ElixirPhase,
    pub sudden_death: bool,
    pub outcome: Option<MatchOutcome>,
}

// ============================================================================
// Battle state
// ============================================================================

/// Build a full match from the built-in catalog and default rules.
pub fn create_match(seed: u64) -> Result<BattleState, ConfigurationError> {
    BattleState::new(seed, UnitCatalog::builtin()?, rules::MatchRules::default())
}

/// One match: the world, its tick schedule and the fixed-step accumulator.
pub struct BattleState {
    world: World,
    schedule: Schedule,
    accumulator_ms: f32,
}

impl BattleState {
    /// A match with both players' crown towers in place.
    pub fn new(
        seed: u64,
        catalog: UnitCatalog,
        rules: rules::MatchRules,
    ) -> Result<Self, ConfigurationError> {
        catalog.require_towers()?;
        let mut battle = Self::sandbox(seed, catalog, rules)?;

        for player in Player::BOTH {
            for (role, position) in tower_sites(player) {
                let archetype = match role {
                    TowerRole::King => KING_TOWER_ARCHETYPE,
                    _ => PRINCESS_TOWER_ARCHETYPE,
                };
                let definition = battle
                    .catalog()
                    .get(archetype)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::MissingArchetype(archetype.to_string()))?;
                let id = battle.world.resource_mut::<IdAllocator>().allocate();
                spawn_tower(&mut battle.world, &definition, id, player, role, position);
                battle.stage_spawn(id, player, &definition, position);
            }
        }
        info!("Match created with seed {}", seed);
        Ok(battle)
    }

    /// An empty arena without towers, for scenarios and tests. The match
    /// only ends on the clock.
    pub fn sandbox(
        seed: u64,
        catalog: UnitCatalog,
        rules: rules::MatchRules,
    ) -> Result<Self, ConfigurationError> {
        rules.validate()?;

        let mut world = World::new();
        let mut combat_log = CombatLog::default();
        combat_log.log(
            CombatLogEventType::MatchEvent,
            format!("Match started (seed {})", seed),
        );

        world.insert_resource(SimClock::new(rules.tick_ms));
        world.insert_resource(Players::new(rules.starting_elixir));
        world.insert_resource(GameRng::from_seed(seed));
        world.insert_resource(IdAllocator::default());
        world.insert_resource(LiveSet::default());
        world.insert_resource(BattleEvents::default());
        world.insert_resource(MatchStatus::default());
        world.insert_resource(PendingInputs::default());
        world.insert_resource(combat_log);
        world.insert_resource(rules);
        world.insert_resource(catalog);

        Ok(Self {
            world,
            schedule: build_schedule(),
            accumulator_ms: 0.0,
        })
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Run one tick. Does nothing once the match is decided.
    pub fn step(&mut self) {
        if self.is_over() {
            return;
        }
        self.schedule.run(&mut self.world);
    }

    /// Advance by `seconds` of simulated time in whole ticks, carrying the
    /// remainder. Returns the number of ticks run.
    pub fn advance(&mut self, seconds: f32) -> u32 {
        let tick_ms = self.rules().tick_ms as f32;
        self.accumulator_ms += seconds.max(0.0) * 1000.0;
        let mut ticks = 0;
        while self.accumulator_ms >= tick_ms && !self.is_over() {
            self.accumulator_ms -= tick_ms;
            self.step();
            ticks += 1;
        }
        ticks
    }

    /// Step until the match is decided or `max_ticks` ran.
    pub fn run_until_over(&mut self, max_ticks: u64) -> Option<MatchOutcome> {
        for _ in 0..max_ticks {
            if self.is_over() {
                break;
            }
            self.step();
        }
        self.outcome()
    }

    // ========================================================================
    // Player actions
    // ========================================================================

    /// Play a card. Troops and buildings appear after their deploy delay,
    /// projectile spells launch from the player's king tower.
    pub fn deploy(
        &mut self,
        player: Player,
        archetype: &str,
        position: Vec2,
    ) -> Result<EntityId, DeploymentError> {
        if self.is_over() {
            return Err(DeploymentError::MatchOver);
        }
        let definition = self
            .catalog()
            .get(archetype)
            .cloned()
            .ok_or_else(|| DeploymentError::UnknownArchetype(archetype.to_string()))?;

        let players = self.world.resource::<Players>();
        let state = players.get(player);
        if state.deck.as_ref().is_some_and(|deck| !deck.in_hand(archetype)) {
            return Err(DeploymentError::NotInHand(archetype.to_string()));
        }
        let fallen = players.get(player.opponent()).fallen_princesses;
        let placeable = if definition.is_spell() || definition.deploy_anywhere {
            in_bounds(position)
        } else {
            can_deploy(player, position, fallen)
        };
        if !placeable {
            return Err(DeploymentError::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }
        if !definition.is_spell() && self.building_at(position) {
            return Err(DeploymentError::Occupied {
                x: position.x,
                y: position.y,
            });
        }
        if !state.can_afford(definition.elixir_cost) {
            return Err(DeploymentError::InsufficientElixir {
                available: state.elixir,
                cost: definition.elixir_cost,
            });
        }

        {
            let mut players = self.world.resource_mut::<Players>();
            let state = players.get_mut(player);
            state.spend(definition.elixir_cost);
            if let Some(deck) = state.deck.as_mut() {
                deck.play(archetype);
            }
        }

        let placements: Vec<SpawnPlacement> = if definition.is_spell() {
            let from = mirror_for(player, KING_TOWER_SITE);
            vec![SpawnPlacement::launched(from, position)]
        } else {
            ring_offsets(definition.summon_count, definition.summon_radius)
                .into_iter()
                .map(|offset| {
                    SpawnPlacement::deployed(
                        clamp_to_arena(position + offset),
                        definition.deploy_time_ms,
                    )
                })
                .collect()
        };
        let ids: Vec<EntityId> = placements
            .into_iter()
            .map(|placement| self.spawn_placed(&definition, player, placement))
            .collect();

        info!(
            "{} deployed {} at ({:.1}, {:.1})",
            player, archetype, position.x, position.y
        );
        ids.first()
            .copied()
            .ok_or_else(|| DeploymentError::UnknownArchetype(archetype.to_string()))
    }

    /// Place one instance directly: no cost, no zone check, no deploy delay.
    pub fn spawn_unit(
        &mut self,
        player: Player,
        archetype: &str,
        position: Vec2,
    ) -> Result<EntityId, DeploymentError> {
        let definition = self
            .catalog()
            .get(archetype)
            .cloned()
            .ok_or_else(|| DeploymentError::UnknownArchetype(archetype.to_string()))?;
        if !in_bounds(position) {
            return Err(DeploymentError::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }
        let placement = if definition.is_spell() {
            SpawnPlacement::launched(mirror_for(player, KING_TOWER_SITE), position)
        } else {
            SpawnPlacement::at(position)
        };
        Ok(self.spawn_placed(&definition, player, placement))
    }

    /// Manually activate an entity's ability. The owner pays the elixir cost
    /// now; the ability's effects resolve at the start of the next tick.
    pub fn activate_ability(&mut self, id: EntityId) -> Result<AbilityActivation, AbilityError> {
        if self.is_over() {
            return Err(AbilityError::MatchOver);
        }
        let entity = self.find_live(id).ok_or(AbilityError::UnknownEntity(id.0))?;
        let owner = self
            .world
            .get::<Owner>(entity)
            .map(|o| o.0)
            .ok_or(AbilityError::UnknownEntity(id.0))?;
        let available = self.world.resource::<Players>().get(owner).elixir;

        let mut state: SystemState<BattleAccess<'static, 'static>> = SystemState::new(&mut self.world);
        let dispatched = {
            let mut access = state.get_mut(&mut self.world);
            access.dispatch(entity, |mechanics, ctx| mechanics.activate(ctx, available))
        };
        state.apply(&mut self.world);

        let (result, requests) = dispatched.ok_or(AbilityError::NoAbility)?;
        let activation = result?;

        self.world
            .resource_mut::<Players>()
            .get_mut(owner)
            .spend(activation.elixir_cost);
        self.world.resource_mut::<PendingInputs>().0.extend(requests);
        self.world
            .resource_mut::<BattleEvents>()
            .stage(BattleEvent::AbilityActivated {
                id,
                owner,
                ability: activation.name.clone(),
                elixir_cost: activation.elixir_cost,
            });
        info!("{} activated {} on {}", owner, activation.name, id);
        Ok(activation)
    }

    /// Queue scripted damage against a live entity. Returns false if no
    /// such entity is alive.
    pub fn inflict_damage(&mut self, id: EntityId, amount: f32) -> bool {
        let Some(target) = self.find_live(id) else {
            return false;
        };
        self.world
            .resource_mut::<PendingInputs>()
            .0
            .push(EffectRequest::Damage(DamageRequest {
                source: None,
                target,
                amount: amount.max(0.0),
                crown_tower_multiplier: 1.0,
            }));
        true
    }

    /// Queue a status effect on a live entity.
    pub fn apply_status(&mut self, id: EntityId, effect: StatusEffect) -> bool {
        let Some(target) = self.find_live(id) else {
            return false;
        };
        self.world
            .resource_mut::<PendingInputs>()
            .0
            .push(EffectRequest::ApplyStatus { target, effect });
        true
    }

    /// Give a player an eight-card deck. Deployments are then limited to
    /// the current hand.
    pub fn set_deck(&mut self, player: Player, cards: Vec<String>) -> Result<(), ConfigurationError> {
        if let Some(unknown) = cards.iter().find(|card| !self.catalog().contains(card)) {
            return Err(ConfigurationError::UnknownReference {
                unit: format!("{} deck", player),
                reference: unknown.clone(),
            });
        }
        let deck = Deck::new(cards)?;
        self.world.resource_mut::<Players>().get_mut(player).deck = Some(deck);
        Ok(())
    }

    pub fn set_elixir(&mut self, player: Player, elixir: f32) {
        let cap = self.rules().elixir_cap;
        self.world.resource_mut::<Players>().get_mut(player).elixir = elixir.clamp(0.0, cap);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.world
            .iter_entities()
            .find(|entity| entity.get::<EntityId>() == Some(&id))
            .and_then(|entity| self.describe(entity))
    }

    /// All entities, sorted by id.
    pub fn entities(&self) -> Vec<EntitySnapshot> {
        let mut entities: Vec<EntitySnapshot> = self
            .world
            .iter_entities()
            .filter_map(|entity| self.describe(entity))
            .collect();
        entities.sort_by_key(|e| e.id);
        entities
    }

    /// Live entities of one archetype owned by `player`.
    pub fn count_alive(&self, player: Player, archetype: &str) -> usize {
        self.entities()
            .iter()
            .filter(|e| e.alive && e.owner == player && e.archetype.as_deref() == Some(archetype))
            .count()
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        let clock = self.world.resource::<SimClock>();
        let status = self.world.resource::<MatchStatus>();
        let players = self.world.resource::<Players>();
        let describe_player = |player| {
            let state = players.get(player);
            PlayerSnapshot {
                elixir: state.elixir,
                crowns: state.crowns,
                hand: state
                    .deck
                    .as_ref()
                    .map(|d| d.hand().to_vec())
                    .unwrap_or_default(),
            }
        };
        BattleSnapshot {
            tick: clock.tick,
            elapsed_ms: clock.elapsed_ms,
            players: Player::BOTH.map(describe_player),
            entities: self.entities(),
            elixir_phase: status.elixir_phase,
            sudden_death: status.sudden_death,
            outcome: status.outcome,
        }
    }

    /// Events of the last tick, in emission order.
    pub fn events(&self) -> &[BattleEvent] {
        self.world.resource::<BattleEvents>().current()
    }

    pub fn combat_log(&self) -> &CombatLog {
        self.world.resource::<CombatLog>()
    }

    pub fn player(&self, player: Player) -> &PlayerState {
        self.world.resource::<Players>().get(player)
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.world.resource::<MatchStatus>().outcome
    }

    pub fn status(&self) -> &MatchStatus {
        self.world.resource::<MatchStatus>()
    }

    pub fn is_over(&self) -> bool {
        self.world.resource::<MatchStatus>().is_over()
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.world.resource::<SimClock>().elapsed_secs()
    }

    pub fn seed(&self) -> u64 {
        self.world.resource::<GameRng>().seed
    }

    pub fn rules(&self) -> &rules::MatchRules {
        self.world.resource::<rules::MatchRules>()
    }

    pub fn catalog(&self) -> &UnitCatalog {
        self.world.resource::<UnitCatalog>()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn spawn_placed(
        &mut self,
        definition: &Arc<UnitDefinition>,
        owner: Player,
        placement: SpawnPlacement,
    ) -> EntityId {
        let id = self.world.resource_mut::<IdAllocator>().allocate();
        spawn_archetype(&mut self.world, definition, id, owner, placement);
        self.stage_spawn(id, owner, definition, placement.position);
        id
    }

    fn stage_spawn(&mut self, id: EntityId, owner: Player, definition: &UnitDefinition, position: Vec2) {
        self.world.resource_mut::<BattleEvents>().stage(BattleEvent::Spawn {
            id,
            owner,
            archetype: definition.name.clone(),
            x: position.x,
            y: position.y,
        });
    }

    fn find_live(&self, id: EntityId) -> Option<Entity> {
        self.world
            .iter_entities()
            .find(|entity| {
                entity.get::<EntityId>() == Some(&id)
                    && entity.get::<Health>().is_some_and(|h| h.is_alive())
            })
            .map(|entity| entity.id())
    }

    /// Whether a live building's footprint covers `position`.
    fn building_at(&self, position: Vec2) -> bool {
        self.world.iter_entities().any(|entity| {
            entity.get::<EntityKind>() == Some(&EntityKind::Building)
                && entity.get::<Health>().is_some_and(|h| h.is_alive())
                && match (entity.get::<Position>(), entity.get::<Body>()) {
                    (Some(p), Some(body)) => p.0.distance(position) < body.collision_radius,
                    _ => false,
                }
        })
    }

    fn describe(&self, entity: EntityRef) -> Option<EntitySnapshot> {
        let id = *entity.get::<EntityId>()?;
        let owner = entity.get::<Owner>()?.0;
        let kind = *entity.get::<EntityKind>()?;
        let position = entity.get::<Position>()?.0;
        let health = entity.get::<Health>();
        Some(EntitySnapshot {
            id,
            owner,
            kind,
            archetype: entity.get::<Archetype>().map(|a| a.name().to_string()),
            x: position.x,
            y: position.y,
            hitpoints: health.map(|h| h.current),
            max_hitpoints: health.map(|h| h.max),
            alive: health.map_or(true, |h| h.is_alive()),
            deployed: entity.get::<DeployTimer>().map_or(true, |d| d.is_deployed()),
            target: entity
                .get::<Targeting>()
                .and_then(|t| t.target)
                .and_then(|t| self.world.get::<EntityId>(t).copied()),
            statuses: entity
                .get::<StatusEffects>()
                .map(|s| s.table.kinds())
                .unwrap_or_default(),
            shield: entity.get::<Mechanics>().and_then(|m| m.shield_remaining()),
            souls: entity.get::<Mechanics>().and_then(|m| m.souls()),
            tower: entity.get::<CrownTower>().map(|t| t.role),
        })
    }
}
