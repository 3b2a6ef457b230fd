use std::env;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::scheduler::{
    DecisionCadence, DecisionIntervals, DecisionScheduler, DecisionSource, SchedulerError,
    TickCadence,
};
use crate::sim::{AvatarInput, PresentationSink, SimEventKind, TickReport, World};

use super::metrics::MetricsAccumulator;
use super::MetricsHandle;

pub const SLOW_TICK_ENV_VAR: &str = "ECHO_SLOW_TICK_MS";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_tick_ms: u64,
    /// Stop after this many ticks across all lives.
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock. When off, every loop pass counts
    /// as exactly one fixed step and decision cycles come from the tick
    /// counter.
    pub realtime: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_tick_ms: 0,
            max_ticks: None,
            realtime: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Host-side stand-in for the input collaborator. Called on the tick
/// thread before every tick.
pub trait Pilot {
    fn steer(&mut self, world: &World, input: &mut AvatarInput);

    fn life_started(&mut self, _world: &World) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    ExitFound,
    GameOver,
    TickLimit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub deaths: u32,
    pub pursuers_killed: u32,
    pub reincarnations: u32,
    pub bifurcations: u32,
    pub decisions_applied: u64,
}

impl SessionSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks = self.ticks.saturating_add(1);
        let count = |kind| report.count_of(kind) as u32;
        self.deaths = self.deaths.saturating_add(count(SimEventKind::AvatarDied));
        self.pursuers_killed = self
            .pursuers_killed
            .saturating_add(count(SimEventKind::PursuerDied));
        self.reincarnations = self
            .reincarnations
            .saturating_add(count(SimEventKind::EchoReincarnated));
        self.bifurcations = self
            .bifurcations
            .saturating_add(count(SimEventKind::EchoBifurcated));
    }
}

pub fn run_session(
    config: SessionConfig,
    world: &mut World,
    pilot: &mut dyn Pilot,
    sink: &mut dyn PresentationSink,
) -> Result<(SessionOutcome, SessionSummary), SessionError> {
    run_session_with_metrics(config, world, pilot, sink, MetricsHandle::default())
}

/// Fixed-step driver: decision cycles are drained and applied, the world
/// ticks, and its events are mirrored into `sink`. A death with lives left
/// starts the next life in place.
pub fn run_session_with_metrics(
    config: SessionConfig,
    world: &mut World,
    pilot: &mut dyn Pilot,
    sink: &mut dyn PresentationSink,
    metrics_handle: MetricsHandle,
) -> Result<(SessionOutcome, SessionSummary), SessionError> {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let slow_tick_delay = resolve_slow_tick_delay(config.simulated_slow_tick_ms);

    let intervals = DecisionIntervals::from_config(&world.config().decisions);
    let wall_clock_decisions = config.realtime && !world.config().decisions.deterministic;
    let mut decisions: Box<dyn DecisionSource> = if wall_clock_decisions {
        let scheduler =
            DecisionScheduler::spawn(intervals, world.config().decisions.channel_capacity)?;
        Box::new(scheduler)
    } else {
        Box::new(TickCadence::new(intervals, target_tps))
    };

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_tick_delay_ms = slow_tick_delay.as_millis() as u64,
        realtime = config.realtime,
        wall_clock_decisions,
        max_ticks = ?config.max_ticks,
        "loop_config"
    );

    let mut driver = TickDriver {
        world,
        pilot,
        sink,
        decisions: decisions.as_mut(),
        due: Vec::new(),
        summary: SessionSummary::default(),
        max_ticks: config.max_ticks,
    };
    pilot_life_started(&mut driver);

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);

    let outcome = loop {
        if slow_tick_delay > Duration::ZERO {
            thread::sleep(slow_tick_delay);
        }

        let now = Instant::now();
        let raw_frame_dt = if config.realtime {
            now.saturating_duration_since(last_frame_instant)
        } else {
            fixed_dt
        };
        last_frame_instant = now;
        accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        let mut finished = None;
        for _ in 0..step_plan.ticks_to_run {
            let (event_count, done) = driver.step();
            metrics_accumulator.record_tick(event_count);
            if done.is_some() {
                finished = done;
                break;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        metrics_accumulator.record_frame(raw_frame_dt);
        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(
            now,
            driver.world.pursuers().len(),
            driver.world.echoes().len(),
        ) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                events_per_tick = snapshot.events_per_tick,
                live_pursuers = snapshot.live_pursuers,
                echoes = snapshot.echoes,
                lives = driver.world.lives(),
                "loop_metrics"
            );
        }

        if let Some(outcome) = finished {
            break outcome;
        }

        if config.realtime {
            let elapsed = Instant::now().saturating_duration_since(now);
            let pace_sleep = compute_pace_sleep(elapsed, fixed_dt.saturating_sub(accumulator));
            if pace_sleep > Duration::ZERO {
                thread::sleep(pace_sleep);
            }
        }
    };

    let summary = driver.summary;
    info!(
        outcome = ?outcome,
        ticks = summary.ticks,
        deaths = summary.deaths,
        pursuers_killed = summary.pursuers_killed,
        reincarnations = summary.reincarnations,
        bifurcations = summary.bifurcations,
        "session_finished"
    );
    Ok((outcome, summary))
}

struct TickDriver<'a> {
    world: &'a mut World,
    pilot: &'a mut dyn Pilot,
    sink: &'a mut dyn PresentationSink,
    decisions: &'a mut dyn DecisionSource,
    due: Vec<DecisionCadence>,
    summary: SessionSummary,
    max_ticks: Option<u64>,
}

impl TickDriver<'_> {
    /// Runs one tick and reports how many events it produced and whether
    /// the session ended.
    fn step(&mut self) -> (usize, Option<SessionOutcome>) {
        let mut input = *self.world.input();
        self.pilot.steer(self.world, &mut input);
        self.world.set_input(input);

        self.due.clear();
        self.decisions.poll(self.world.turn_counter(), &mut self.due);
        for cadence in self.due.drain(..) {
            self.world.apply_decision(cadence);
            self.summary.decisions_applied = self.summary.decisions_applied.saturating_add(1);
        }

        let report = self.world.tick();
        report.sync_to(self.sink);
        self.summary.record(&report);
        let event_count = report.events.len();

        let outcome = if report.signals.exit_found {
            Some(SessionOutcome::ExitFound)
        } else if report.signals.game_over {
            Some(SessionOutcome::GameOver)
        } else {
            if report.signals.avatar_dead {
                self.world.reset_for_new_life();
                pilot_life_started(self);
            }
            self.max_ticks
                .filter(|limit| self.summary.ticks >= *limit)
                .map(|_| SessionOutcome::TickLimit)
        };
        (event_count, outcome)
    }
}

fn pilot_life_started(driver: &mut TickDriver<'_>) {
    driver.pilot.life_started(driver.world);
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pace_sleep(elapsed: Duration, until_next_tick: Duration) -> Duration {
    until_next_tick.saturating_sub(elapsed)
}

fn resolve_slow_tick_delay(config_slow_tick_ms: u64) -> Duration {
    match env::var(SLOW_TICK_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_TICK_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-tick env var value; falling back to config"
                );
                Duration::from_millis(config_slow_tick_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_tick_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_TICK_ENV_VAR,
                error = %err,
                "unable to read slow-tick env var; falling back to config"
            );
            Duration::from_millis(config_slow_tick_ms)
        }
    }
}
