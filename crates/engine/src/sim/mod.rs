//! Tick orchestration: the avatar, every live pursuer and every echo advance
//! exactly once per tick, in that order. Combat, death bookkeeping and echo
//! conversion all happen here, on the tick thread.

mod avatar;
mod combat;
mod events;
mod history;
mod input;
mod pursuer;
#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::collision::{Aabb, StaticGeometry};
use crate::config::{ConfigError, SimConfig};
use crate::map::{plan_spawns, Board, CellCoord, GridGraph, SpawnPlan};
use crate::nav::Pathfinder;
use crate::scheduler::DecisionCadence;

pub use avatar::Avatar;
pub use combat::{
    bearing, distance, heading_vector, in_attack_sector, normalize_degrees,
    ATTACK_HALF_ARC_DEGREES,
};
pub use events::{
    PresentationSink, SessionSignals, SimEvent, SimEventCounts, SimEventKind, TickReport,
};
pub use history::{EchoId, EchoKind, History, HistoryEntry, Pose, ReplayActor, ReplayStep};
pub use input::{AvatarAction, AvatarInput};
pub use pursuer::{Pursuer, PursuerId, PursuerMode, WalkStyle};

use events::SimEventBus;
use pursuer::{DecisionEffect, PursuerContext};

pub struct World {
    config: SimConfig,
    board: Board,
    geometry: StaticGeometry,
    pathfinder: Pathfinder,
    rng: SmallRng,
    turn_counter: u64,
    avatar: Avatar,
    input: AvatarInput,
    pursuers: Vec<Pursuer>,
    echoes: Vec<ReplayActor>,
    pending_echoes: Vec<ReplayActor>,
    interacting: BTreeSet<PursuerId>,
    occupancy: Vec<bool>,
    elite_cell: Option<CellCoord>,
    alerted: bool,
    lives: u32,
    next_pursuer_id: u64,
    next_echo_id: u64,
    events: SimEventBus,
    signals: SessionSignals,
}

impl World {
    /// Validates `config`, plans the pursuer population from its seed and
    /// spawns the first life.
    pub fn new(config: SimConfig, board: Board) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let plan = plan_spawns(&board, &config.population, &mut rng);
        Ok(Self::assemble(config, board, plan, rng))
    }

    /// Like [`World::new`] but with a fixed population instead of a planned one.
    pub fn with_spawn_plan(
        config: SimConfig,
        board: Board,
        plan: SpawnPlan,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = SmallRng::seed_from_u64(config.seed);
        Ok(Self::assemble(config, board, plan, rng))
    }

    fn assemble(config: SimConfig, board: Board, plan: SpawnPlan, rng: SmallRng) -> Self {
        let graph = Arc::new(GridGraph::from_board(&board));
        let geometry = StaticGeometry::from_board(&board);
        let avatar = spawn_avatar(&board, &config);
        let lives = config.lives;

        let mut world = Self {
            config,
            geometry,
            pathfinder: Pathfinder::new(graph),
            rng,
            turn_counter: 0,
            avatar,
            input: AvatarInput::default(),
            pursuers: Vec::new(),
            echoes: Vec::new(),
            pending_echoes: Vec::new(),
            interacting: BTreeSet::new(),
            occupancy: vec![false; board.len()],
            elite_cell: None,
            alerted: false,
            lives,
            next_pursuer_id: 1,
            next_echo_id: 1,
            events: SimEventBus::default(),
            signals: SessionSignals::default(),
            board,
        };
        world.apply_plan(plan);
        world.populate_from_occupancy();
        info!(
            width = world.board.width(),
            height = world.board.height(),
            pursuers = world.pursuers.len(),
            elite = ?world.elite_cell,
            lives = world.lives,
            "world_ready"
        );
        world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn graph(&self) -> &Arc<GridGraph> {
        self.pathfinder.graph()
    }

    pub fn turn_counter(&self) -> u64 {
        self.turn_counter
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn input(&self) -> &AvatarInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut AvatarInput {
        &mut self.input
    }

    pub fn set_input(&mut self, input: AvatarInput) {
        self.input = input;
    }

    pub fn pursuers(&self) -> &[Pursuer] {
        &self.pursuers
    }

    pub fn pursuer(&self, id: PursuerId) -> Option<&Pursuer> {
        self.pursuers.iter().find(|pursuer| pursuer.id() == id)
    }

    pub fn echoes(&self) -> &[ReplayActor] {
        &self.echoes
    }

    /// Echoes of pursuers killed this life; they start replaying after the
    /// avatar's next death.
    pub fn pending_echoes(&self) -> &[ReplayActor] {
        &self.pending_echoes
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted
    }

    pub fn elite_cell(&self) -> Option<CellCoord> {
        self.elite_cell
    }

    pub fn has_pursuer(&self, cell: CellCoord) -> bool {
        self.board
            .index_of(cell)
            .and_then(|index| self.occupancy.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn interacting(&self) -> impl Iterator<Item = PursuerId> + '_ {
        self.interacting.iter().copied()
    }

    pub fn signals(&self) -> SessionSignals {
        self.signals
    }

    /// Advances the simulation by one tick. Does nothing while the avatar is
    /// dead; the session layer decides whether to reset.
    pub fn tick(&mut self) -> TickReport {
        let tick = self.turn_counter;
        if self.avatar.is_dead() {
            return self.finish_report(tick);
        }

        self.run_avatar_phase(tick);
        self.run_pursuer_phase();
        self.run_replay_phase(tick);
        if self.avatar.is_dead() {
            self.handle_avatar_death(tick);
        }

        self.turn_counter = self.turn_counter.saturating_add(1);
        self.finish_report(tick)
    }

    /// Applies one decision cycle. Ordinary cycles reach every non-elite
    /// pursuer, elite cycles only the elite. Returns how many changed.
    pub fn apply_decision(&mut self, cadence: DecisionCadence) -> usize {
        let mut changed = 0usize;
        for pursuer in &mut self.pursuers {
            let selected = match cadence {
                DecisionCadence::Ordinary => !pursuer.is_elite(),
                DecisionCadence::Elite => pursuer.is_elite(),
            };
            if !selected {
                continue;
            }
            if pursuer.apply_decision(&mut self.rng) != DecisionEffect::Unchanged {
                changed = changed.saturating_add(1);
            }
        }
        changed
    }

    /// Starts the next life on the same map: live pursuers and the tick
    /// counter are cleared, echoes persist, and pursuers respawn on every
    /// cell still flagged as occupied.
    pub fn reset_for_new_life(&mut self) {
        self.pursuers.clear();
        self.interacting.clear();
        self.turn_counter = 0;
        self.alerted = false;
        self.signals = SessionSignals::default();
        self.input.release_all();
        self.avatar = spawn_avatar(&self.board, &self.config);
        for echo in &mut self.echoes {
            echo.rewind();
        }
        self.populate_from_occupancy();
        info!(
            pursuers = self.pursuers.len(),
            echoes = self.echoes.len(),
            lives = self.lives,
            "life_reset"
        );
    }

    /// Tears the session down: echoes and lives reset and the population is
    /// planned again.
    pub fn new_session(&mut self) {
        self.echoes.clear();
        self.pending_echoes.clear();
        self.lives = self.config.lives;
        let plan = plan_spawns(&self.board, &self.config.population, &mut self.rng);
        self.occupancy.fill(false);
        self.apply_plan(plan);
        self.reset_for_new_life();
        info!(pursuers = self.pursuers.len(), "session_started");
    }

    fn apply_plan(&mut self, plan: SpawnPlan) {
        for cell in &plan.cells {
            if !self.board.is_walkable(*cell) {
                continue;
            }
            if let Some(index) = self.board.index_of(*cell) {
                self.occupancy[index] = true;
            }
        }
        self.elite_cell = plan.elite.filter(|cell| self.has_pursuer(*cell));
    }

    fn populate_from_occupancy(&mut self) {
        let cells: Vec<CellCoord> = self
            .occupancy
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .filter_map(|(index, _)| self.board.coord_of(index))
            .collect();
        for cell in cells {
            let (x, z) = cell.center();
            let elite = self.elite_cell == Some(cell);
            self.spawn_pursuer(x, z, None, elite, Some(cell), History::new());
        }
    }

    fn spawn_pursuer(
        &mut self,
        x: f32,
        z: f32,
        heading: Option<f32>,
        elite: bool,
        home_cell: Option<CellCoord>,
        history: History,
    ) -> PursuerId {
        let id = PursuerId(self.next_pursuer_id);
        self.next_pursuer_id = self.next_pursuer_id.saturating_add(1);
        let walk_style = if elite || self.rng.random_bool(self.config.pursuer.random_walk_chance) {
            WalkStyle::Random
        } else {
            WalkStyle::Line
        };
        let heading = heading.unwrap_or_else(|| self.rng.random_range(0..360u32) as f32);
        let pursuer = Pursuer::new(
            id,
            x,
            z,
            heading,
            elite,
            walk_style,
            home_cell,
            history,
            &self.config.pursuer,
        );
        self.events.emit(SimEvent::PursuerSpawned {
            id,
            pose: pursuer.pose(),
            elite,
        });
        self.pursuers.push(pursuer);
        id
    }

    fn next_echo_id(&mut self) -> EchoId {
        let id = EchoId(self.next_echo_id);
        self.next_echo_id = self.next_echo_id.saturating_add(1);
        id
    }

    fn run_avatar_phase(&mut self, tick: u64) {
        let pursuer_volumes: Vec<Aabb> = self
            .pursuers
            .iter()
            .map(|pursuer| pursuer.volume(&self.config.pursuer))
            .collect();
        let outcome = self.avatar.tick(
            &mut self.input,
            &self.config.avatar,
            &self.geometry,
            &pursuer_volumes,
        );
        self.events.emit(SimEvent::AvatarMoved {
            pose: self.avatar.pose(),
        });

        if outcome.exit_found {
            self.signals.exit_found = true;
            self.events.emit(SimEvent::ExitFound);
            info!(tick, "exit_found");
        }
        if outcome.attack_started {
            self.resolve_avatar_attack(tick);
        }
        if outcome.push_started {
            self.resolve_avatar_push();
        }
    }

    fn resolve_avatar_attack(&mut self, tick: u64) {
        let origin = self.avatar.pose();
        let range = self.config.avatar.attack_range;
        let damage = self.config.avatar.damage;

        let mut killed = Vec::new();
        for pursuer in &mut self.pursuers {
            if !in_melee_reach(origin, pursuer.x(), pursuer.z(), range) {
                continue;
            }
            let died = pursuer.take_damage(damage);
            self.interacting.insert(pursuer.id());
            self.events.emit(SimEvent::PursuerDamaged {
                id: pursuer.id(),
                amount: damage,
                remaining: pursuer.hit_points(),
            });
            if died {
                killed.push(pursuer.id());
            }
        }
        for id in killed {
            self.kill_pursuer(id, tick);
        }

        let struck: Vec<(EchoId, Pose)> = self
            .echoes
            .iter()
            .filter(|echo| echo.is_pursuer() && echo.is_visible())
            .filter(|echo| in_melee_reach(origin, echo.pose().x, echo.pose().z, range))
            .map(|echo| (echo.id(), echo.pose()))
            .collect();
        for (echo_id, pose) in struck {
            let id = self.spawn_pursuer(
                pose.x,
                pose.z,
                Some(pose.facing),
                false,
                None,
                History::backfilled(tick),
            );
            self.interacting.insert(id);
            self.events.emit(SimEvent::EchoBifurcated {
                echo: echo_id,
                pursuer: id,
            });
            info!(tick, echo = echo_id.0, pursuer = id.0, "echo_bifurcated");
        }
    }

    fn resolve_avatar_push(&mut self) {
        let origin = self.avatar.pose();
        let range = self.config.avatar.push_range;
        let ticks = self.config.pursuer.push_ticks;
        for pursuer in &mut self.pursuers {
            if distance(origin.x, origin.z, pursuer.x(), pursuer.z()) >= range {
                continue;
            }
            let heading = bearing(origin.x, origin.z, pursuer.x(), pursuer.z());
            pursuer.start_push(heading, ticks);
            self.events.emit(SimEvent::PursuerPushed {
                id: pursuer.id(),
                heading,
            });
            debug!(pursuer = pursuer.id().0, heading, "pursuer_pushed");
        }
    }

    fn kill_pursuer(&mut self, id: PursuerId, tick: u64) {
        let Some(index) = self.pursuers.iter().position(|pursuer| pursuer.id() == id) else {
            return;
        };
        let mut pursuer = self.pursuers.remove(index);
        pursuer.history_mut().mark_death(tick);
        self.release_cell(&pursuer);
        self.interacting.remove(&id);

        let echo_id = self.next_echo_id();
        self.pending_echoes.push(ReplayActor::new(
            echo_id,
            EchoKind::Pursuer,
            pursuer.history(),
            tick,
        ));
        self.events.emit(SimEvent::PursuerDied { id });
        self.events.emit(SimEvent::EchoCreated {
            id: echo_id,
            kind: EchoKind::Pursuer,
        });
        info!(tick, pursuer = id.0, elite = pursuer.is_elite(), "pursuer_killed");
    }

    fn release_cell(&mut self, pursuer: &Pursuer) {
        if let Some(index) = pursuer
            .home_cell()
            .and_then(|cell| self.board.index_of(cell))
        {
            self.occupancy[index] = false;
        }
        if pursuer.is_elite() {
            self.elite_cell = None;
        }
    }

    fn run_pursuer_phase(&mut self) {
        let avatar_cell = self.board.cell_at_world(self.avatar.x(), self.avatar.z());
        let damage = self.config.pursuer.damage;
        let elite_alive = self.pursuers.iter().any(Pursuer::is_elite);

        for index in 0..self.pursuers.len() {
            let avatar_volume =
                (!self.avatar.is_dead()).then(|| self.avatar.volume(&self.config.avatar));
            let ctx = PursuerContext {
                board: &self.board,
                geometry: &self.geometry,
                config: &self.config.pursuer,
                avatar_x: self.avatar.x(),
                avatar_z: self.avatar.z(),
                avatar_cell: avatar_cell.filter(|_| avatar_volume.is_some()),
                avatar_volume,
                alerted: self.alerted,
            };
            let pursuer = &mut self.pursuers[index];
            let outcome = pursuer.tick(&ctx, &mut self.pathfinder);
            let id = pursuer.id();
            let elite = pursuer.is_elite();
            let pursuing = pursuer.is_pursuing();
            self.events.emit(SimEvent::PursuerMoved {
                id,
                pose: pursuer.pose(),
            });

            if outcome.entered_pursuit {
                self.events.emit(SimEvent::PursuerAlerted { id });
                debug!(pursuer = id.0, elite, "pursuer_alerted");
            }
            if outcome.left_pursuit {
                debug!(pursuer = id.0, elite, "pursuer_lost_scent");
            }
            if outcome.entered_recovery {
                debug!(pursuer = id.0, heading = pursuer.heading(), "pursuer_recovering");
            }
            if outcome.push_ended {
                debug!(pursuer = id.0, "pursuer_push_ended");
            }
            if outcome.attacked && !self.avatar.is_dead() {
                let killed = self.avatar.take_damage(damage);
                self.interacting.insert(id);
                self.events.emit(SimEvent::AvatarDamaged {
                    by: id,
                    amount: damage,
                    remaining: self.avatar.hit_points(),
                });
                if killed {
                    info!(pursuer = id.0, "avatar_killed");
                }
            }
            if pursuing && !elite && !self.alerted {
                self.alerted = true;
                if elite_alive {
                    self.events.emit(SimEvent::EliteAlerted);
                    info!(by = id.0, "elite_alerted");
                }
            }
        }
    }

    fn run_replay_phase(&mut self, tick: u64) {
        let mut index = 0;
        while index < self.echoes.len() {
            let echo = &mut self.echoes[index];
            let echo_id = echo.id();
            match echo.replay(tick) {
                ReplayStep::Moved(pose) => self.events.emit(SimEvent::EchoMoved { id: echo_id, pose }),
                ReplayStep::Hidden => self.events.emit(SimEvent::EchoHidden { id: echo_id }),
                ReplayStep::NoData => {}
            }

            if !echo.should_reincarnate(tick) {
                index += 1;
                continue;
            }
            let echo = self.echoes.remove(index);
            let pose = echo.pose();
            let mut history = History::backfilled(tick);
            history.record(pose);
            let id = self.spawn_pursuer(pose.x, pose.z, Some(pose.facing), false, None, history);
            self.events.emit(SimEvent::EchoReincarnated {
                echo: echo_id,
                pursuer: id,
            });
            info!(tick, echo = echo_id.0, pursuer = id.0, "echo_reincarnated");
        }
    }

    fn handle_avatar_death(&mut self, tick: u64) {
        self.lives = self.lives.saturating_sub(1);
        self.avatar.history_mut().mark_death(tick);
        let avatar_echo = self.next_echo_id();
        self.echoes.push(ReplayActor::new(
            avatar_echo,
            EchoKind::Avatar,
            self.avatar.history(),
            tick,
        ));
        self.events.emit(SimEvent::EchoCreated {
            id: avatar_echo,
            kind: EchoKind::Avatar,
        });

        let attackers: Vec<PursuerId> = self.interacting.iter().copied().collect();
        for id in attackers {
            let Some(index) = self.pursuers.iter().position(|pursuer| pursuer.id() == id) else {
                continue;
            };
            let pursuer = self.pursuers.remove(index);
            self.release_cell(&pursuer);
            let echo_id = self.next_echo_id();
            self.echoes.push(ReplayActor::new(
                echo_id,
                EchoKind::Pursuer,
                pursuer.history(),
                tick,
            ));
            self.events.emit(SimEvent::EchoCreated {
                id: echo_id,
                kind: EchoKind::Pursuer,
            });
        }
        self.interacting.clear();
        self.echoes.append(&mut self.pending_echoes);

        self.signals.avatar_dead = true;
        self.signals.game_over = self.lives == 0;
        self.events.emit(SimEvent::AvatarDied {
            tick,
            lives_left: self.lives,
        });
        info!(
            tick,
            lives_left = self.lives,
            echoes = self.echoes.len(),
            game_over = self.signals.game_over,
            "avatar_died"
        );
    }

    fn finish_report(&mut self, tick: u64) -> TickReport {
        let events = self.events.finish_tick_rollover();
        TickReport {
            tick,
            avatar_hit_points: self.avatar.hit_points(),
            signals: self.signals,
            events,
            counts: self.events.last_tick_counts(),
        }
    }
}

fn spawn_avatar(board: &Board, config: &SimConfig) -> Avatar {
    let (x, z) = board.avatar_spawn().center();
    Avatar::spawn(x, z, &config.avatar)
}

fn in_melee_reach(origin: Pose, x: f32, z: f32, range: f32) -> bool {
    distance(origin.x, origin.z, x, z) < range
        && in_attack_sector(origin.facing, bearing(origin.x, origin.z, x, z))
}
