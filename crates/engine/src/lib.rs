//! Simulation core for a grid-world pursuit game with temporal echoes:
//! every actor's per-tick pose is recorded, and after the avatar dies the
//! recordings replay alongside the next life.

pub mod app;
pub mod collision;
pub mod config;
pub mod map;
pub mod nav;
pub mod scheduler;
pub mod sim;

pub use app::{
    run_session, run_session_with_metrics, LoopMetricsSnapshot, MetricsHandle, Pilot,
    SessionConfig, SessionError, SessionOutcome, SessionSummary, SLOW_TICK_ENV_VAR,
};
pub use config::{
    AvatarConfig, ConfigError, DecisionConfig, PopulationConfig, PursuerConfig, SimConfig,
};
pub use map::{Board, BoardError, CellCoord, CellKind, GridGraph, SpawnPlan};
pub use nav::{PathOutcome, Pathfinder, OUT_OF_RANGE_DISTANCE};
pub use scheduler::{
    DecisionCadence, DecisionIntervals, DecisionScheduler, DecisionSource, SchedulerError,
    TickCadence,
};
pub use sim::{
    AvatarAction, AvatarInput, EchoId, EchoKind, PresentationSink, PursuerId, PursuerMode,
    SessionSignals, SimEvent, SimEventKind, TickReport, World,
};
