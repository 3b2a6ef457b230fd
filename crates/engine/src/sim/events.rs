use super::history::{EchoId, EchoKind, Pose};
use super::pursuer::PursuerId;

/// Everything presentation needs to mirror one tick of simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    AvatarMoved {
        pose: Pose,
    },
    AvatarDamaged {
        by: PursuerId,
        amount: i32,
        remaining: i32,
    },
    AvatarDied {
        tick: u64,
        lives_left: u32,
    },
    ExitFound,
    PursuerSpawned {
        id: PursuerId,
        pose: Pose,
        elite: bool,
    },
    PursuerMoved {
        id: PursuerId,
        pose: Pose,
    },
    PursuerDamaged {
        id: PursuerId,
        amount: i32,
        remaining: i32,
    },
    PursuerDied {
        id: PursuerId,
    },
    PursuerPushed {
        id: PursuerId,
        heading: f32,
    },
    PursuerAlerted {
        id: PursuerId,
    },
    EliteAlerted,
    EchoCreated {
        id: EchoId,
        kind: EchoKind,
    },
    EchoMoved {
        id: EchoId,
        pose: Pose,
    },
    EchoHidden {
        id: EchoId,
    },
    EchoReincarnated {
        echo: EchoId,
        pursuer: PursuerId,
    },
    EchoBifurcated {
        echo: EchoId,
        pursuer: PursuerId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEventKind {
    AvatarMoved,
    AvatarDamaged,
    AvatarDied,
    ExitFound,
    PursuerSpawned,
    PursuerMoved,
    PursuerDamaged,
    PursuerDied,
    PursuerPushed,
    PursuerAlerted,
    EliteAlerted,
    EchoCreated,
    EchoMoved,
    EchoHidden,
    EchoReincarnated,
    EchoBifurcated,
}

impl SimEvent {
    pub fn kind(&self) -> SimEventKind {
        match self {
            Self::AvatarMoved { .. } => SimEventKind::AvatarMoved,
            Self::AvatarDamaged { .. } => SimEventKind::AvatarDamaged,
            Self::AvatarDied { .. } => SimEventKind::AvatarDied,
            Self::ExitFound => SimEventKind::ExitFound,
            Self::PursuerSpawned { .. } => SimEventKind::PursuerSpawned,
            Self::PursuerMoved { .. } => SimEventKind::PursuerMoved,
            Self::PursuerDamaged { .. } => SimEventKind::PursuerDamaged,
            Self::PursuerDied { .. } => SimEventKind::PursuerDied,
            Self::PursuerPushed { .. } => SimEventKind::PursuerPushed,
            Self::PursuerAlerted { .. } => SimEventKind::PursuerAlerted,
            Self::EliteAlerted => SimEventKind::EliteAlerted,
            Self::EchoCreated { .. } => SimEventKind::EchoCreated,
            Self::EchoMoved { .. } => SimEventKind::EchoMoved,
            Self::EchoHidden { .. } => SimEventKind::EchoHidden,
            Self::EchoReincarnated { .. } => SimEventKind::EchoReincarnated,
            Self::EchoBifurcated { .. } => SimEventKind::EchoBifurcated,
        }
    }
}

/// Per-tick tallies, grouped the way presentation and logging care about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimEventCounts {
    pub total: u32,
    pub transforms: u32,
    pub damage: u32,
    pub deaths: u32,
    pub spawns: u32,
    pub echoes: u32,
}

impl SimEventCounts {
    fn record(&mut self, kind: SimEventKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            SimEventKind::AvatarMoved
            | SimEventKind::PursuerMoved
            | SimEventKind::EchoMoved
            | SimEventKind::EchoHidden => self.transforms = self.transforms.saturating_add(1),
            SimEventKind::AvatarDamaged | SimEventKind::PursuerDamaged => {
                self.damage = self.damage.saturating_add(1)
            }
            SimEventKind::AvatarDied | SimEventKind::PursuerDied => {
                self.deaths = self.deaths.saturating_add(1)
            }
            SimEventKind::PursuerSpawned => self.spawns = self.spawns.saturating_add(1),
            SimEventKind::EchoCreated
            | SimEventKind::EchoReincarnated
            | SimEventKind::EchoBifurcated => self.echoes = self.echoes.saturating_add(1),
            SimEventKind::ExitFound
            | SimEventKind::PursuerPushed
            | SimEventKind::PursuerAlerted
            | SimEventKind::EliteAlerted => {}
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SimEventBus {
    current_tick_events: Vec<SimEvent>,
    last_tick_counts: SimEventCounts,
}

impl SimEventBus {
    pub(crate) fn emit(&mut self, event: SimEvent) {
        self.current_tick_events.push(event);
    }

    /// Closes the tick: tallies and hands back everything emitted since the
    /// previous rollover.
    pub(crate) fn finish_tick_rollover(&mut self) -> Vec<SimEvent> {
        let mut counts = SimEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        std::mem::take(&mut self.current_tick_events)
    }

    pub(crate) fn last_tick_counts(&self) -> SimEventCounts {
        self.last_tick_counts
    }
}

/// Level-transition signals for the session/UI layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSignals {
    pub avatar_dead: bool,
    pub exit_found: bool,
    pub game_over: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub avatar_hit_points: i32,
    pub signals: SessionSignals,
    pub events: Vec<SimEvent>,
    pub counts: SimEventCounts,
}

impl TickReport {
    /// Replays this tick's events, in emission order, into a sink.
    pub fn sync_to(&self, sink: &mut dyn PresentationSink) {
        for event in &self.events {
            sink.apply(event);
        }
    }

    pub fn count_of(&self, kind: SimEventKind) -> usize {
        self.events.iter().filter(|event| event.kind() == kind).count()
    }
}

/// Consumer of simulation events (renderer, audio, UI). The simulation never
/// reads anything back from it.
pub trait PresentationSink {
    fn apply(&mut self, event: &SimEvent);
}
