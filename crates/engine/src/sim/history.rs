//! Per-tick pose log for every actor and the replay actors ("echoes")
//! frozen from it.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub z: f32,
    pub facing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryEntry {
    Active(Pose),
    Absent,
}

impl HistoryEntry {
    pub fn pose(self) -> Option<Pose> {
        match self {
            HistoryEntry::Active(pose) => Some(pose),
            HistoryEntry::Absent => None,
        }
    }

    pub fn is_absent(self) -> bool {
        matches!(self, HistoryEntry::Absent)
    }
}

/// Append-only log where index `t` holds the pose at tick `t`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// History for an actor that joins at tick `ticks`: every earlier tick
    /// is recorded as absent.
    pub fn backfilled(ticks: u64) -> Self {
        Self {
            entries: vec![HistoryEntry::Absent; ticks as usize],
        }
    }

    pub fn record(&mut self, pose: Pose) {
        self.entries.push(HistoryEntry::Active(pose));
    }

    /// Marks the actor as dead at `tick`, replacing that tick's entry if it
    /// was already recorded.
    pub fn mark_death(&mut self, tick: u64) {
        let tick = tick as usize;
        match self.entries.get_mut(tick) {
            Some(entry) => *entry = HistoryEntry::Absent,
            None => {
                while self.entries.len() < tick {
                    self.entries.push(HistoryEntry::Absent);
                }
                self.entries.push(HistoryEntry::Absent);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tick: u64) -> Option<HistoryEntry> {
        self.entries.get(tick as usize).copied()
    }

    pub fn last(&self) -> Option<HistoryEntry> {
        self.entries.last().copied()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn freeze(&self) -> Arc<[HistoryEntry]> {
        Arc::from(self.entries.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EchoId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoKind {
    Avatar,
    Pursuer,
}

/// What a replay step did at a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayStep {
    Moved(Pose),
    Hidden,
    /// Tick is past the end of the recording; state is left unchanged.
    NoData,
}

/// Deterministic playback of a dead actor's recorded life.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayActor {
    id: EchoId,
    kind: EchoKind,
    history: Arc<[HistoryEntry]>,
    turn_world_ends: u64,
    pose: Pose,
    visible: bool,
}

impl ReplayActor {
    pub fn new(id: EchoId, kind: EchoKind, history: &History, turn_world_ends: u64) -> Self {
        Self {
            id,
            kind,
            history: history.freeze(),
            turn_world_ends,
            pose: Pose {
                x: 0.0,
                z: 0.0,
                facing: 0.0,
            },
            visible: false,
        }
    }

    pub fn id(&self) -> EchoId {
        self.id
    }

    pub fn kind(&self) -> EchoKind {
        self.kind
    }

    pub fn is_pursuer(&self) -> bool {
        self.kind == EchoKind::Pursuer
    }

    pub fn turn_world_ends(&self) -> u64 {
        self.turn_world_ends
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn replay(&mut self, tick: u64) -> ReplayStep {
        match self.history.get(tick as usize).copied() {
            Some(HistoryEntry::Active(pose)) => {
                self.pose = pose;
                self.visible = true;
                ReplayStep::Moved(pose)
            }
            Some(HistoryEntry::Absent) => {
                self.pose = Pose {
                    x: 0.0,
                    z: 0.0,
                    facing: 0.0,
                };
                self.visible = false;
                ReplayStep::Hidden
            }
            None => ReplayStep::NoData,
        }
    }

    /// A pursuer echo whose recording reaches its end tick still alive was
    /// cut short by the avatar's death rather than killed, so it rejoins the
    /// world as a live pursuer at that tick.
    pub fn should_reincarnate(&self, tick: u64) -> bool {
        tick == self.turn_world_ends
            && self.is_pursuer()
            && self
                .history
                .last()
                .is_some_and(|entry| !entry.is_absent())
    }

    /// Resets playback state for a new life.
    pub fn rewind(&mut self) {
        self.visible = false;
        self.pose = Pose {
            x: 0.0,
            z: 0.0,
            facing: 0.0,
        };
    }
}
