use rand::Rng;

use crate::collision::{move_per_axis, Aabb, StaticGeometry};
use crate::config::PursuerConfig;
use crate::map::{Board, CellCoord};
use crate::nav::{nav_cell, within_scent, Pathfinder, OUT_OF_RANGE_DISTANCE};

use super::combat::{distance, heading_vector, normalize_degrees};
use super::history::{History, Pose};

const MAX_RECOVERY_STEPS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PursuerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PursuerMode {
    RandomWalk,
    Pursuing,
    CollisionRecovery,
    Pushed,
    Dead,
}

/// How an ordinary pursuer wanders while it has no scent of the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStyle {
    /// Picks a new heading every decision cycle.
    Random,
    /// Keeps its heading until a collision forces a new one.
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PushState {
    heading: f32,
    ticks_remaining: u32,
}

/// Effect of one decision cycle on a pursuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecisionEffect {
    Replan,
    Rerolled,
    Recovered,
    Unchanged,
}

/// Read-only view of the world a pursuer needs for its update.
pub(crate) struct PursuerContext<'a> {
    pub board: &'a Board,
    pub geometry: &'a StaticGeometry,
    pub config: &'a PursuerConfig,
    pub avatar_x: f32,
    pub avatar_z: f32,
    pub avatar_cell: Option<CellCoord>,
    pub avatar_volume: Option<Aabb>,
    pub alerted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PursuerTickOutcome {
    pub attacked: bool,
    pub entered_pursuit: bool,
    pub left_pursuit: bool,
    pub entered_recovery: bool,
    pub push_ended: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pursuer {
    id: PursuerId,
    elite: bool,
    home_cell: Option<CellCoord>,
    x: f32,
    z: f32,
    heading: f32,
    prev_heading: f32,
    hit_points: i32,
    max_hit_points: i32,
    speed: f32,
    walk_style: WalkStyle,
    pursuing: bool,
    recovering: bool,
    push: Option<PushState>,
    dead: bool,
    replan_requested: bool,
    path_heading: Option<f32>,
    distance_to_avatar: u32,
    attack_cooldown: u32,
    history: History,
}

impl Pursuer {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: PursuerId,
        x: f32,
        z: f32,
        heading: f32,
        elite: bool,
        walk_style: WalkStyle,
        home_cell: Option<CellCoord>,
        history: History,
        config: &PursuerConfig,
    ) -> Self {
        let (speed, hit_points) = if elite {
            (config.elite_speed, config.elite_hit_points)
        } else {
            (config.speed, config.hit_points)
        };
        let heading = normalize_degrees(heading);
        Self {
            id,
            elite,
            home_cell,
            x,
            z,
            heading,
            prev_heading: heading,
            hit_points,
            max_hit_points: hit_points,
            speed,
            walk_style,
            pursuing: false,
            recovering: false,
            push: None,
            dead: false,
            replan_requested: false,
            path_heading: None,
            distance_to_avatar: OUT_OF_RANGE_DISTANCE,
            attack_cooldown: 0,
            history,
        }
    }

    pub fn id(&self) -> PursuerId {
        self.id
    }

    pub fn is_elite(&self) -> bool {
        self.elite
    }

    /// Spawn cell whose occupancy flag this pursuer holds, if any.
    pub fn home_cell(&self) -> Option<CellCoord> {
        self.home_cell
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            z: self.z,
            facing: self.heading,
        }
    }

    pub fn hit_points(&self) -> i32 {
        self.hit_points
    }

    pub fn max_hit_points(&self) -> i32 {
        self.max_hit_points
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn walk_style(&self) -> WalkStyle {
        self.walk_style
    }

    pub fn is_pursuing(&self) -> bool {
        self.pursuing
    }

    pub fn distance_to_avatar(&self) -> u32 {
        self.distance_to_avatar
    }

    pub fn path_heading(&self) -> Option<f32> {
        self.path_heading
    }

    pub fn replan_requested(&self) -> bool {
        self.replan_requested
    }

    pub fn attack_cooldown(&self) -> u32 {
        self.attack_cooldown
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn mode(&self) -> PursuerMode {
        if self.dead {
            PursuerMode::Dead
        } else if self.push.is_some() {
            PursuerMode::Pushed
        } else if self.recovering {
            PursuerMode::CollisionRecovery
        } else if self.pursuing {
            PursuerMode::Pursuing
        } else {
            PursuerMode::RandomWalk
        }
    }

    pub fn volume(&self, config: &PursuerConfig) -> Aabb {
        Aabb::centered(self.x, self.z, config.radius)
    }

    /// Applies damage and returns true when this hit killed the pursuer.
    pub(crate) fn take_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.hit_points = self.hit_points.saturating_sub(amount);
        if self.hit_points <= 0 {
            self.dead = true;
        }
        self.dead
    }

    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub(crate) fn start_push(&mut self, heading: f32, ticks: u32) {
        if ticks == 0 {
            return;
        }
        self.push = Some(PushState {
            heading: normalize_degrees(heading),
            ticks_remaining: ticks,
        });
    }

    /// One tick: attack check, gated movement, history append, then a fresh
    /// scent check and search from the resulting position.
    pub(crate) fn tick(
        &mut self,
        ctx: &PursuerContext<'_>,
        pathfinder: &mut Pathfinder,
    ) -> PursuerTickOutcome {
        let mut outcome = PursuerTickOutcome::default();

        if self.attack_cooldown > 0 {
            self.attack_cooldown -= 1;
        } else if ctx.avatar_volume.is_some()
            && distance(self.x, self.z, ctx.avatar_x, ctx.avatar_z) < ctx.config.attack_range
        {
            outcome.attacked = true;
            self.attack_cooldown = ctx.config.attack_cooldown_ticks;
        }

        let others: Vec<Aabb> = ctx.avatar_volume.into_iter().collect();
        if let Some(mut push) = self.push {
            let speed = self.speed + ctx.config.push_speed_bonus;
            let (ux, uz) = heading_vector(push.heading);
            let step = move_per_axis(
                self.x,
                self.z,
                ux * speed,
                uz * speed,
                ctx.config.radius,
                ctx.geometry,
                &others,
            );
            self.x = step.x;
            self.z = step.z;
            push.ticks_remaining = push.ticks_remaining.saturating_sub(1);
            if step.static_hit.is_some() || push.ticks_remaining == 0 {
                self.push = None;
                outcome.push_ended = true;
            } else {
                self.push = Some(push);
            }
        } else if !self.recovering {
            let (ux, uz) = heading_vector(self.heading);
            let (dx, dz) = (ux * self.speed, uz * self.speed);
            let step = move_per_axis(
                self.x,
                self.z,
                dx,
                dz,
                ctx.config.radius,
                ctx.geometry,
                &others,
            );
            self.x = step.x;
            self.z = step.z;
            if step.static_hit.is_some() && step.fully_blocked(dx, dz) {
                self.enter_recovery(ctx);
                outcome.entered_recovery = true;
            }
        }

        self.history.record(self.pose());
        self.update_navigation(ctx, pathfinder, &mut outcome);
        outcome
    }

    fn enter_recovery(&mut self, ctx: &PursuerContext<'_>) {
        self.prev_heading = self.heading;
        self.heading = normalize_degrees(self.heading - 180.0);
        self.recovering = true;

        let (ux, uz) = heading_vector(self.heading);
        for _ in 0..MAX_RECOVERY_STEPS {
            let volume = Aabb::centered(self.x, self.z, ctx.config.radius);
            if ctx.geometry.first_static_hit(&volume).is_none() {
                break;
            }
            self.x += ux * self.speed;
            self.z += uz * self.speed;
        }

        if self.pursuing {
            if let Some(cell) = ctx.board.cell_at_world(self.x, self.z) {
                let on_corner = ctx
                    .board
                    .cell(cell)
                    .is_some_and(|cell| cell.corners.any());
                if on_corner {
                    (self.x, self.z) = cell.center();
                }
            }
        }
    }

    fn update_navigation(
        &mut self,
        ctx: &PursuerContext<'_>,
        pathfinder: &mut Pathfinder,
        outcome: &mut PursuerTickOutcome,
    ) {
        let was_pursuing = self.pursuing;
        let forced = self.elite && ctx.alerted;
        let from = nav_cell(ctx.board, self.x, self.z, self.heading);

        let in_range = ctx
            .avatar_cell
            .filter(|target| within_scent(from, *target, ctx.config.scent_radius, forced));
        let Some(target) = in_range else {
            self.pursuing = false;
            self.distance_to_avatar = OUT_OF_RANGE_DISTANCE;
            self.path_heading = None;
            outcome.left_pursuit = was_pursuing;
            return;
        };

        let Some(path) = pathfinder.search(from, target) else {
            return;
        };
        self.distance_to_avatar = path.distance;
        self.pursuing = forced || (path.found() && path.distance <= ctx.config.scent_radius);

        if self.pursuing && !was_pursuing {
            outcome.entered_pursuit = true;
            self.replan_requested = true;
        } else if !self.pursuing && was_pursuing {
            outcome.left_pursuit = true;
        }

        if path.heading != self.path_heading {
            self.path_heading = path.heading;
            if self.pursuing {
                self.replan_requested = true;
            }
        }

        if self.pursuing && self.replan_requested && !self.recovering && self.push.is_none() {
            if let Some(heading) = self.path_heading {
                self.prev_heading = self.heading;
                self.heading = heading;
            }
            self.replan_requested = false;
        }
    }

    /// Decision-cycle update. Only flags and the heading change here.
    pub(crate) fn apply_decision<R: Rng + ?Sized>(&mut self, rng: &mut R) -> DecisionEffect {
        if self.dead {
            return DecisionEffect::Unchanged;
        }
        if self.recovering {
            if self.pursuing {
                if let Some(heading) = self.path_heading {
                    self.heading = heading;
                }
            } else {
                self.heading = random_heading_except(rng, self.prev_heading);
            }
            self.recovering = false;
            return DecisionEffect::Recovered;
        }
        if self.pursuing {
            self.replan_requested = true;
            return DecisionEffect::Replan;
        }
        if self.walk_style == WalkStyle::Random {
            self.prev_heading = self.heading;
            self.heading = random_heading_except(rng, self.prev_heading);
            return DecisionEffect::Rerolled;
        }
        DecisionEffect::Unchanged
    }
}

/// Whole-degree heading that differs from `previous`.
pub(crate) fn random_heading_except<R: Rng + ?Sized>(rng: &mut R, previous: f32) -> f32 {
    let previous = normalize_degrees(previous.round()) as u32;
    loop {
        let candidate = rng.random_range(0..360u32);
        if candidate != previous {
            return candidate as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::map::{CellKind, GridGraph};

    struct Fixture {
        board: Board,
        geometry: StaticGeometry,
        pathfinder: Pathfinder,
        config: PursuerConfig,
    }

    impl Fixture {
        fn new(board: Board) -> Self {
            let graph = Arc::new(GridGraph::from_board(&board));
            Self {
                geometry: StaticGeometry::from_board(&board),
                pathfinder: Pathfinder::new(graph),
                board,
                config: PursuerConfig::default(),
            }
        }

        fn open(width: u32, height: u32) -> Self {
            Self::new(
                Board::new(width, height, vec![CellKind::Open; (width * height) as usize])
                    .expect("board"),
            )
        }

        fn tick(&mut self, pursuer: &mut Pursuer, avatar: Option<(f32, f32)>) -> PursuerTickOutcome {
            self.tick_alerted(pursuer, avatar, false)
        }

        fn tick_alerted(
            &mut self,
            pursuer: &mut Pursuer,
            avatar: Option<(f32, f32)>,
            alerted: bool,
        ) -> PursuerTickOutcome {
            let (avatar_x, avatar_z) = avatar.unwrap_or((-100.0, -100.0));
            let ctx = PursuerContext {
                board: &self.board,
                geometry: &self.geometry,
                config: &self.config,
                avatar_x,
                avatar_z,
                avatar_cell: avatar.and_then(|(x, z)| self.board.cell_at_world(x, z)),
                avatar_volume: avatar.map(|(x, z)| Aabb::centered(x, z, 0.25)),
                alerted,
            };
            pursuer.tick(&ctx, &mut self.pathfinder)
        }
    }

    fn pursuer_at(cell: CellCoord, heading: f32, config: &PursuerConfig) -> Pursuer {
        let (x, z) = cell.center();
        Pursuer::new(
            PursuerId(1),
            x,
            z,
            heading,
            false,
            WalkStyle::Line,
            Some(cell),
            History::new(),
            config,
        )
    }

    #[test]
    fn scent_boundary_is_inclusive() {
        let mut fixture = Fixture::open(30, 1);
        fixture.config.scent_radius = 15;
        let mut at_radius = pursuer_at(CellCoord::new(0, 15), 270.0, &fixture.config);
        let mut beyond = pursuer_at(CellCoord::new(0, 16), 270.0, &fixture.config);

        fixture.tick(&mut at_radius, Some((0.5, 0.5)));
        fixture.tick(&mut beyond, Some((0.5, 0.5)));

        assert!(at_radius.is_pursuing());
        assert_eq!(at_radius.distance_to_avatar(), 15);
        assert!(!beyond.is_pursuing());
        assert_eq!(beyond.distance_to_avatar(), OUT_OF_RANGE_DISTANCE);
    }

    #[test]
    fn entering_pursuit_turns_toward_first_step() {
        let mut fixture = Fixture::open(10, 10);
        let mut pursuer = pursuer_at(CellCoord::new(5, 1), 90.0, &fixture.config);
        pursuer.x = 1.5;
        pursuer.z = 5.5;

        let outcome = fixture.tick(&mut pursuer, Some((1.5, 1.5)));
        assert!(outcome.entered_pursuit);
        assert_eq!(pursuer.mode(), PursuerMode::Pursuing);
        assert_eq!(pursuer.path_heading(), Some(180.0));
        assert_eq!(pursuer.heading(), 180.0);
        assert!(!pursuer.replan_requested());
    }

    #[test]
    fn elite_pursues_from_anywhere_once_alerted() {
        let mut fixture = Fixture::open(40, 1);
        let (x, z) = CellCoord::new(0, 39).center();
        let mut elite = Pursuer::new(
            PursuerId(9),
            x,
            z,
            270.0,
            true,
            WalkStyle::Random,
            None,
            History::new(),
            &fixture.config,
        );
        assert_eq!(elite.speed(), fixture.config.elite_speed);
        assert_eq!(elite.hit_points(), fixture.config.elite_hit_points);

        fixture.tick_alerted(&mut elite, Some((0.5, 0.5)), false);
        assert!(!elite.is_pursuing());
        fixture.tick_alerted(&mut elite, Some((0.5, 0.5)), true);
        assert!(elite.is_pursuing());
    }

    #[test]
    fn attack_respects_cooldown_window() {
        let mut fixture = Fixture::open(4, 4);
        fixture.config.attack_cooldown_ticks = 3;
        let mut pursuer = pursuer_at(CellCoord::new(1, 1), 0.0, &fixture.config);
        pursuer.speed = 0.0001;
        let avatar = Some((1.5, 2.0));

        let attacks: Vec<bool> = (0..9)
            .map(|_| fixture.tick(&mut pursuer, avatar).attacked)
            .collect();
        assert_eq!(
            attacks,
            vec![true, false, false, false, true, false, false, false, true]
        );
    }

    #[test]
    fn attack_stays_ready_while_avatar_out_of_range() {
        let mut fixture = Fixture::open(8, 8);
        let mut pursuer = pursuer_at(CellCoord::new(1, 1), 0.0, &fixture.config);
        fixture.tick(&mut pursuer, Some((6.5, 6.5)));
        assert_eq!(pursuer.attack_cooldown(), 0);
        fixture.tick(&mut pursuer, None);
        assert_eq!(pursuer.attack_cooldown(), 0);
    }

    #[test]
    fn blocked_walk_enters_recovery_with_reversed_heading() {
        let mut fixture = Fixture::new(
            Board::from_ascii(
                "...\n\
                 ...\n\
                 ###\n",
            )
            .expect("board"),
        );
        let mut pursuer = pursuer_at(CellCoord::new(1, 1), 0.0, &fixture.config);
        pursuer.z = 1.79;

        let outcome = fixture.tick(&mut pursuer, None);
        assert!(outcome.entered_recovery);
        assert_eq!(pursuer.mode(), PursuerMode::CollisionRecovery);
        assert_eq!(pursuer.heading(), 180.0);

        let z = pursuer.z();
        fixture.tick(&mut pursuer, None);
        assert_eq!(pursuer.z(), z, "recovering pursuer stands still");

        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(pursuer.apply_decision(&mut rng), DecisionEffect::Recovered);
        assert_eq!(pursuer.mode(), PursuerMode::RandomWalk);
        assert_ne!(pursuer.heading(), 0.0);
    }

    #[test]
    fn pursuing_recovery_recentres_on_corner_flagged_cell() {
        let fixture = Fixture::new(
            Board::from_ascii(
                "...\n\
                 ...\n\
                 ..#\n",
            )
            .expect("board"),
        );
        let ctx = PursuerContext {
            board: &fixture.board,
            geometry: &fixture.geometry,
            config: &fixture.config,
            avatar_x: 0.5,
            avatar_z: 0.5,
            avatar_cell: Some(CellCoord::new(0, 0)),
            avatar_volume: None,
            alerted: false,
        };

        let mut hunter = pursuer_at(CellCoord::new(1, 1), 0.0, &fixture.config);
        hunter.z = 1.79;
        hunter.pursuing = true;
        hunter.enter_recovery(&ctx);
        assert_eq!((hunter.x(), hunter.z()), (1.5, 1.5));
        assert_eq!(hunter.heading(), 180.0);
        assert_eq!(hunter.mode(), PursuerMode::CollisionRecovery);

        let mut wanderer = pursuer_at(CellCoord::new(1, 1), 0.0, &fixture.config);
        wanderer.z = 1.79;
        wanderer.enter_recovery(&ctx);
        assert_eq!((wanderer.x(), wanderer.z()), (1.5, 1.79));
        assert_eq!(wanderer.heading(), 180.0);
    }

    #[test]
    fn losing_scent_drops_back_to_random_walk() {
        let mut fixture = Fixture::open(30, 1);
        fixture.config.scent_radius = 5;
        let mut pursuer = pursuer_at(CellCoord::new(0, 4), 270.0, &fixture.config);

        let outcome = fixture.tick(&mut pursuer, Some((0.5, 0.5)));
        assert!(outcome.entered_pursuit);
        assert_eq!(pursuer.mode(), PursuerMode::Pursuing);

        // A non-elite ignores the alert flag once the avatar is out of range.
        let outcome = fixture.tick_alerted(&mut pursuer, Some((29.5, 0.5)), true);
        assert!(outcome.left_pursuit);
        assert_eq!(pursuer.mode(), PursuerMode::RandomWalk);
        assert_eq!(pursuer.distance_to_avatar(), OUT_OF_RANGE_DISTANCE);
        assert_eq!(pursuer.path_heading(), None);

        let outcome = fixture.tick(&mut pursuer, Some((29.5, 0.5)));
        assert!(!outcome.left_pursuit);
    }

    #[test]
    fn push_moves_away_then_expires() {
        let mut fixture = Fixture::open(12, 3);
        let mut pursuer = pursuer_at(CellCoord::new(1, 3), 0.0, &fixture.config);
        pursuer.start_push(90.0, fixture.config.push_ticks);
        assert_eq!(pursuer.mode(), PursuerMode::Pushed);

        let start_x = pursuer.x();
        let ended: Vec<bool> = (0..fixture.config.push_ticks)
            .map(|_| fixture.tick(&mut pursuer, None).push_ended)
            .collect();
        assert_eq!(ended.iter().filter(|ended| **ended).count(), 1);
        assert_eq!(ended.last(), Some(&true));
        let expected = start_x
            + (fixture.config.speed + fixture.config.push_speed_bonus)
                * fixture.config.push_ticks as f32;
        assert!((pursuer.x() - expected).abs() < 1e-3);
        assert_ne!(pursuer.mode(), PursuerMode::Pushed);
    }

    #[test]
    fn push_ends_early_against_wall() {
        let mut fixture = Fixture::new(Board::from_ascii("...#\n").expect("board"));
        let mut pursuer = pursuer_at(CellCoord::new(0, 2), 0.0, &fixture.config);
        pursuer.start_push(90.0, 7);

        let mut ticks = 0;
        while pursuer.mode() == PursuerMode::Pushed && ticks < 7 {
            fixture.tick(&mut pursuer, None);
            ticks += 1;
        }
        assert!(ticks < 7);
        assert!(pursuer.x() + fixture.config.radius <= 3.0);
    }

    #[test]
    fn history_grows_by_one_entry_per_tick() {
        let mut fixture = Fixture::open(6, 6);
        let mut pursuer = pursuer_at(CellCoord::new(2, 2), 45.0, &fixture.config);
        for tick in 0..5usize {
            fixture.tick(&mut pursuer, Some((0.5, 0.5)));
            assert_eq!(pursuer.history().len(), tick + 1);
        }
    }

    #[test]
    fn decision_rerolls_random_walkers_and_replans_pursuers() {
        let config = PursuerConfig::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut walker = Pursuer::new(
            PursuerId(2),
            1.5,
            1.5,
            0.0,
            false,
            WalkStyle::Random,
            None,
            History::new(),
            &config,
        );
        assert_eq!(walker.apply_decision(&mut rng), DecisionEffect::Rerolled);
        assert_ne!(walker.heading(), 0.0);

        let mut liner = pursuer_at(CellCoord::new(1, 1), 90.0, &config);
        assert_eq!(liner.apply_decision(&mut rng), DecisionEffect::Unchanged);
        assert_eq!(liner.heading(), 90.0);

        liner.pursuing = true;
        assert_eq!(liner.apply_decision(&mut rng), DecisionEffect::Replan);
        assert!(liner.replan_requested());
    }

    #[test]
    fn damage_marks_dead_at_zero() {
        let config = PursuerConfig::default();
        let mut pursuer = pursuer_at(CellCoord::new(0, 0), 0.0, &config);
        assert!(!pursuer.take_damage(20));
        assert!(pursuer.take_damage(10));
        assert_eq!(pursuer.mode(), PursuerMode::Dead);
    }
}
