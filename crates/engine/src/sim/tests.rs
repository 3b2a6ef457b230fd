use super::*;
use crate::map::Board;

fn open_board(size: usize, spawn: (usize, usize)) -> Board {
    let mut text = String::new();
    for row in 0..size {
        for col in 0..size {
            text.push(if (row, col) == spawn { '@' } else { '.' });
        }
        text.push('\n');
    }
    Board::from_ascii(&text).expect("board")
}

fn world_with(
    config: SimConfig,
    board: Board,
    cells: &[(u32, u32)],
    elite: Option<(u32, u32)>,
) -> World {
    let plan = SpawnPlan {
        cells: cells
            .iter()
            .map(|(row, col)| CellCoord::new(*row, *col))
            .collect(),
        elite: elite.map(|(row, col)| CellCoord::new(row, col)),
    };
    World::with_spawn_plan(config, board, plan).expect("world")
}

fn run_until(
    world: &mut World,
    limit: u64,
    mut done: impl FnMut(&World, &TickReport) -> bool,
) -> Vec<TickReport> {
    let mut reports = Vec::new();
    for _ in 0..limit {
        let report = world.tick();
        let finished = done(world, &report);
        reports.push(report);
        if finished {
            break;
        }
    }
    reports
}

fn gap_to_first_pursuer(world: &World) -> f32 {
    let avatar = world.avatar();
    world
        .pursuers()
        .first()
        .map(|pursuer| distance(avatar.x(), avatar.z(), pursuer.x(), pursuer.z()))
        .unwrap_or(f32::MAX)
}

#[test]
fn nearby_pursuer_starts_pursuit_toward_avatar() {
    let mut world = world_with(SimConfig::default(), open_board(10, (1, 1)), &[(5, 1)], None);

    world.tick();

    let pursuer = &world.pursuers()[0];
    assert!(pursuer.is_pursuing());
    assert_eq!(pursuer.mode(), PursuerMode::Pursuing);
    assert_eq!(pursuer.distance_to_avatar(), 4);
    assert_eq!(pursuer.heading(), 180.0);
    assert!(world.is_alerted());
}

#[test]
fn every_actor_records_one_history_entry_per_tick() {
    let mut world = world_with(
        SimConfig::default(),
        open_board(10, (1, 1)),
        &[(7, 7), (8, 2)],
        None,
    );

    for _ in 0..25 {
        world.tick();
    }

    assert_eq!(world.turn_counter(), 25);
    assert_eq!(world.avatar().history().len(), 25);
    for pursuer in world.pursuers() {
        assert_eq!(pursuer.history().len(), 25);
    }
}

#[test]
fn adjacent_pursuer_lands_three_hits_one_cooldown_apart() {
    let mut world = world_with(SimConfig::default(), open_board(10, (1, 1)), &[(2, 1)], None);

    let mut hits = Vec::new();
    run_until(&mut world, 400, |_, report| {
        if report.count_of(SimEventKind::AvatarDamaged) > 0 {
            hits.push(report.tick);
        }
        hits.len() == 3
    });

    assert_eq!(hits.len(), 3);
    assert_eq!(world.avatar().hit_points(), 70);
    assert_eq!(hits[1] - hits[0], 41);
    assert_eq!(hits[2] - hits[1], 41);
    assert_eq!(world.interacting().count(), 1);
}

#[test]
fn killed_pursuer_leaves_a_pending_echo_and_frees_its_cell() {
    let mut config = SimConfig::default();
    config.pursuer.hit_points = 10;
    let mut world = world_with(config, open_board(10, (1, 1)), &[(2, 1)], None);

    run_until(&mut world, 60, |world, _| gap_to_first_pursuer(world) < 0.6);
    assert!(gap_to_first_pursuer(&world) < 0.6);

    world.input_mut().request_attack();
    let report = world.tick();

    assert_eq!(report.count_of(SimEventKind::PursuerDied), 1);
    assert!(world.pursuers().is_empty());
    assert!(world.echoes().is_empty());
    assert_eq!(world.pending_echoes().len(), 1);
    assert!(!world.has_pursuer(CellCoord::new(2, 1)));

    let echo = &world.pending_echoes()[0];
    assert_eq!(echo.turn_world_ends(), report.tick);
    assert_eq!(echo.history().len() as u64, report.tick + 1);
    assert!(echo.history()[report.tick as usize].is_absent());
}

#[test]
fn avatar_death_turns_attackers_into_echoes_that_reincarnate_once() {
    let mut config = SimConfig::default();
    config.avatar.hit_points = 10;
    let mut world = world_with(config, open_board(10, (1, 1)), &[(2, 1)], None);

    let reports = run_until(&mut world, 200, |_, report| report.signals.avatar_dead);
    let death = reports.last().expect("ticked").clone();
    assert!(death.signals.avatar_dead);
    assert!(!death.signals.game_over);
    assert_eq!(death.count_of(SimEventKind::AvatarDied), 1);

    let death_tick = death.tick;
    assert_eq!(world.lives(), 2);
    assert!(world.pursuers().is_empty());
    assert_eq!(world.echoes().len(), 2);
    assert!(!world.has_pursuer(CellCoord::new(2, 1)));

    let stalled = world.tick();
    assert!(stalled.events.is_empty());
    assert_eq!(world.turn_counter(), death_tick + 1);

    world.reset_for_new_life();
    assert_eq!(world.turn_counter(), 0);
    assert!(world.pursuers().is_empty());
    assert_eq!(world.echoes().len(), 2);

    let mut reincarnations = 0;
    for _ in 0..=death_tick {
        let report = world.tick();
        reincarnations += report.count_of(SimEventKind::EchoReincarnated);
    }

    assert_eq!(reincarnations, 1);
    assert_eq!(world.pursuers().len(), 1);
    assert_eq!(world.echoes().len(), 1);
    assert_eq!(world.echoes()[0].kind(), EchoKind::Avatar);

    let reborn = &world.pursuers()[0];
    assert_eq!(reborn.history().len() as u64, world.turn_counter());
    assert!(reborn.history().entries()[..death_tick as usize]
        .iter()
        .all(|entry| entry.is_absent()));
    assert!(!reborn.history().entries()[death_tick as usize].is_absent());
}

#[test]
fn striking_a_visible_echo_splits_off_a_live_pursuer() {
    let mut world = world_with(SimConfig::default(), open_board(10, (1, 1)), &[], None);
    let mut recorded = History::new();
    for _ in 0..10 {
        recorded.record(Pose {
            x: 1.5,
            z: 1.9,
            facing: 180.0,
        });
    }
    world
        .echoes
        .push(ReplayActor::new(EchoId(99), EchoKind::Pursuer, &recorded, 50));

    world.tick();
    assert!(world.echoes()[0].is_visible());

    world.input_mut().request_attack();
    let report = world.tick();

    assert_eq!(report.count_of(SimEventKind::EchoBifurcated), 1);
    assert_eq!(world.echoes().len(), 1);
    assert_eq!(world.pursuers().len(), 1);
    let split = &world.pursuers()[0];
    assert_eq!(split.history().len(), 2);
    assert!(split.history().entries()[0].is_absent());
    assert_eq!(world.interacting().collect::<Vec<_>>(), vec![split.id()]);
}

#[test]
fn push_sends_nearby_pursuer_away_from_avatar() {
    let mut world = world_with(SimConfig::default(), open_board(10, (1, 1)), &[(2, 1)], None);
    run_until(&mut world, 60, |world, _| gap_to_first_pursuer(world) < 0.55);
    let before = gap_to_first_pursuer(&world);

    world.input_mut().request_push();
    let report = world.tick();
    assert_eq!(report.count_of(SimEventKind::PursuerPushed), 1);
    assert_eq!(world.pursuers()[0].mode(), PursuerMode::Pushed);

    world.tick();
    assert!(gap_to_first_pursuer(&world) > before);
}

#[test]
fn alert_from_any_pursuer_sends_the_elite_after_the_avatar() {
    let mut config = SimConfig::default();
    config.pursuer.scent_radius = 2;
    let mut world = world_with(
        config,
        open_board(12, (1, 1)),
        &[(3, 1), (10, 10)],
        Some((10, 10)),
    );

    let report = world.tick();

    assert!(world.is_alerted());
    assert_eq!(report.count_of(SimEventKind::EliteAlerted), 1);
    let elite = world
        .pursuers()
        .iter()
        .find(|pursuer| pursuer.is_elite())
        .expect("elite");
    assert!(elite.is_pursuing());
    assert_eq!(elite.max_hit_points(), 50);
}

#[test]
fn decision_cycles_reach_only_their_cadence() {
    let mut config = SimConfig::default();
    config.pursuer.random_walk_chance = 1.0;
    let mut world = world_with(
        config,
        open_board(10, (1, 1)),
        &[(5, 5), (8, 8)],
        Some((8, 8)),
    );

    assert_eq!(world.apply_decision(DecisionCadence::Elite), 1);
    assert_eq!(world.apply_decision(DecisionCadence::Ordinary), 1);
}

#[test]
fn walking_onto_the_exit_raises_the_signal() {
    let board = Board::from_ascii(
        "\
#####
#.@.#
#.E.#
#####",
    )
    .expect("board");
    let mut world = world_with(SimConfig::default(), board, &[], None);
    world.input_mut().set(AvatarAction::Forward, true);

    let reports = run_until(&mut world, 30, |_, report| report.signals.exit_found);

    assert!(world.signals().exit_found);
    let found: usize = reports
        .iter()
        .map(|report| report.count_of(SimEventKind::ExitFound))
        .sum();
    assert_eq!(found, 1);
}

#[test]
fn losing_the_last_life_ends_the_game() {
    let mut config = SimConfig::default();
    config.lives = 1;
    config.avatar.hit_points = 10;
    let mut world = world_with(config, open_board(10, (1, 1)), &[(2, 1)], None);

    run_until(&mut world, 200, |_, report| report.signals.avatar_dead);

    assert_eq!(world.lives(), 0);
    assert!(world.signals().game_over);
}

#[test]
fn new_session_forgets_echoes_and_restores_lives() {
    let mut config = SimConfig::default();
    config.avatar.hit_points = 10;
    config.population.min_pursuers = 2;
    config.population.max_pursuers = 4;
    config.population.spawn_chance = 0.5;
    let mut world = world_with(config, open_board(10, (1, 1)), &[(2, 1)], None);
    run_until(&mut world, 200, |_, report| report.signals.avatar_dead);
    assert!(!world.echoes().is_empty());

    world.new_session();

    assert!(world.echoes().is_empty());
    assert!(world.pending_echoes().is_empty());
    assert_eq!(world.lives(), 3);
    assert_eq!(world.turn_counter(), 0);
    assert!(world.pursuers().len() >= 2);
    assert!(world.pursuers().len() <= 4);
    assert!(!world.avatar().is_dead());
}
