mod loop_runner;
mod metrics;

pub use loop_runner::{
    run_session, run_session_with_metrics, Pilot, SessionConfig, SessionError, SessionOutcome,
    SessionSummary, SLOW_TICK_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
