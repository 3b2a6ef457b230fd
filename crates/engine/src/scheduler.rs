//! Decision cadence for pursuers. Decisions run slower than the tick loop;
//! the scheduler only announces that a cycle is due and the tick thread
//! applies its effects, so no simulation state is shared across threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DecisionConfig;

const SLEEP_SLICE: Duration = Duration::from_millis(5);
const THREAD_NAME: &str = "decision-scheduler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionCadence {
    /// Every non-elite pursuer.
    Ordinary,
    /// The elite pursuer only.
    Elite,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn decision scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Source of decision cycles polled once per tick.
pub trait DecisionSource {
    fn poll(&mut self, tick: u64, due: &mut Vec<DecisionCadence>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionIntervals {
    pub ordinary: Duration,
    pub elite: Duration,
}

impl DecisionIntervals {
    pub fn from_config(config: &DecisionConfig) -> Self {
        Self {
            ordinary: config.ordinary_interval(),
            elite: config.elite_interval(),
        }
    }
}

/// One background thread firing both cadences into a bounded channel.
/// Cleared `running` flag ends the loop at its next iteration.
#[derive(Debug)]
pub struct DecisionScheduler {
    running: Arc<AtomicBool>,
    receiver: Receiver<DecisionCadence>,
    handle: Option<JoinHandle<()>>,
}

impl DecisionScheduler {
    pub fn spawn(intervals: DecisionIntervals, capacity: usize) -> Result<Self, SchedulerError> {
        let running = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = bounded(capacity.max(1));
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_scheduler(intervals, thread_running, sender))
            .map_err(SchedulerError::Spawn)?;

        info!(
            ordinary_ms = intervals.ordinary.as_millis() as u64,
            elite_ms = intervals.elite.as_millis() as u64,
            capacity,
            "decision_scheduler_started"
        );
        Ok(Self {
            running,
            receiver,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Everything fired since the last drain, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = DecisionCadence> + '_ {
        self.receiver.try_iter()
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("decision scheduler thread panicked");
            }
            info!("decision_scheduler_stopped");
        }
    }
}

impl DecisionSource for DecisionScheduler {
    fn poll(&mut self, _tick: u64, due: &mut Vec<DecisionCadence>) {
        due.extend(self.drain());
    }
}

impl Drop for DecisionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_scheduler(
    intervals: DecisionIntervals,
    running: Arc<AtomicBool>,
    sender: Sender<DecisionCadence>,
) {
    let ordinary = normalize_interval(intervals.ordinary);
    let elite = normalize_interval(intervals.elite);
    let start = Instant::now();
    let mut next_ordinary = start + ordinary;
    let mut next_elite = start + elite;

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= next_ordinary {
            next_ordinary += ordinary;
            if !send(&sender, DecisionCadence::Ordinary) {
                break;
            }
        }
        if now >= next_elite {
            next_elite += elite;
            if !send(&sender, DecisionCadence::Elite) {
                break;
            }
        }
        let until_next = next_ordinary.min(next_elite).saturating_duration_since(now);
        thread::sleep(until_next.min(SLEEP_SLICE));
    }
}

/// Returns false once the receiving side is gone.
fn send(sender: &Sender<DecisionCadence>, cadence: DecisionCadence) -> bool {
    match sender.try_send(cadence) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(cadence = ?cadence, "decision channel full; dropping cycle");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

fn normalize_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        SLEEP_SLICE
    } else {
        interval
    }
}

/// Deterministic cadence derived from the tick counter, for replays and
/// tests that must not depend on wall-clock timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickCadence {
    ordinary_every: u64,
    elite_every: u64,
}

impl TickCadence {
    pub fn new(intervals: DecisionIntervals, ticks_per_second: u32) -> Self {
        let to_ticks = |interval: Duration| {
            ((interval.as_secs_f64() * f64::from(ticks_per_second.max(1))).round() as u64).max(1)
        };
        Self {
            ordinary_every: to_ticks(intervals.ordinary),
            elite_every: to_ticks(intervals.elite),
        }
    }

    pub fn ordinary_every(&self) -> u64 {
        self.ordinary_every
    }

    pub fn elite_every(&self) -> u64 {
        self.elite_every
    }

    pub fn due_at(&self, tick: u64) -> impl Iterator<Item = DecisionCadence> {
        let schedule = [
            (DecisionCadence::Ordinary, self.ordinary_every),
            (DecisionCadence::Elite, self.elite_every),
        ];
        schedule
            .into_iter()
            .filter(move |(_, every)| tick > 0 && tick % every == 0)
            .map(|(cadence, _)| cadence)
    }
}

impl DecisionSource for TickCadence {
    fn poll(&mut self, tick: u64, due: &mut Vec<DecisionCadence>) {
        due.extend(self.due_at(tick));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_cadence_converts_intervals_to_ticks() {
        let cadence = TickCadence::new(
            DecisionIntervals {
                ordinary: Duration::from_secs(2),
                elite: Duration::from_millis(500),
            },
            60,
        );
        assert_eq!(cadence.ordinary_every(), 120);
        assert_eq!(cadence.elite_every(), 30);
        assert_eq!(cadence.due_at(0).count(), 0);
        assert_eq!(
            cadence.due_at(30).collect::<Vec<_>>(),
            vec![DecisionCadence::Elite]
        );
        assert_eq!(
            cadence.due_at(120).collect::<Vec<_>>(),
            vec![DecisionCadence::Ordinary, DecisionCadence::Elite]
        );
    }

    #[test]
    fn scheduler_fires_both_cadences_and_stops_on_shutdown() {
        let mut scheduler = DecisionScheduler::spawn(
            DecisionIntervals {
                ordinary: Duration::from_millis(40),
                elite: Duration::from_millis(10),
            },
            64,
        )
        .expect("spawn scheduler");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while Instant::now() < deadline
            && !(seen.contains(&DecisionCadence::Ordinary) && seen.contains(&DecisionCadence::Elite))
        {
            seen.extend(scheduler.drain());
            thread::sleep(Duration::from_millis(5));
        }
        assert!(seen.contains(&DecisionCadence::Ordinary));
        assert!(seen.contains(&DecisionCadence::Elite));

        scheduler.shutdown();
        assert!(!scheduler.is_running());
        let _ = scheduler.drain().count();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(scheduler.drain().count(), 0);
    }
}
