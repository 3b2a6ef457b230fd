use std::collections::BTreeMap;

use echo_engine::sim::Pose;
use echo_engine::{EchoId, EchoKind, PresentationSink, PursuerId, SimEvent};
use tracing::{debug, info};

/// Headless stand-in for the renderer: keeps the last known transform and
/// visibility of every actor, exactly as a scene graph would after syncing.
#[derive(Debug, Default)]
pub(crate) struct PresentationMirror {
    avatar: Option<Pose>,
    pursuers: BTreeMap<PursuerId, Pose>,
    echoes: BTreeMap<EchoId, MirroredEcho>,
    applied: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MirroredEcho {
    pub(crate) kind: EchoKind,
    pub(crate) pose: Option<Pose>,
}

impl PresentationMirror {
    pub(crate) fn avatar(&self) -> Option<Pose> {
        self.avatar
    }

    #[cfg(test)]
    pub(crate) fn pursuer(&self, id: PursuerId) -> Option<Pose> {
        self.pursuers.get(&id).copied()
    }

    pub(crate) fn pursuer_count(&self) -> usize {
        self.pursuers.len()
    }

    #[cfg(test)]
    pub(crate) fn echo(&self, id: EchoId) -> Option<MirroredEcho> {
        self.echoes.get(&id).copied()
    }

    pub(crate) fn visible_echoes(&self) -> usize {
        self.echoes.values().filter(|echo| echo.pose.is_some()).count()
    }

    pub(crate) fn applied(&self) -> u64 {
        self.applied
    }
}

impl PresentationSink for PresentationMirror {
    fn apply(&mut self, event: &SimEvent) {
        self.applied = self.applied.saturating_add(1);
        match *event {
            SimEvent::AvatarMoved { pose } => self.avatar = Some(pose),
            SimEvent::AvatarDamaged {
                by,
                amount,
                remaining,
            } => debug!(by = by.0, amount, remaining, "avatar_hit"),
            SimEvent::AvatarDied { tick, lives_left } => {
                // Live pursuers do not survive into the next life.
                self.pursuers.clear();
                for echo in self.echoes.values_mut() {
                    echo.pose = None;
                }
                info!(tick, lives_left, "presentation_life_ended");
            }
            SimEvent::ExitFound => info!("presentation_exit_reached"),
            SimEvent::PursuerSpawned { id, pose, elite } => {
                self.pursuers.insert(id, pose);
                debug!(pursuer = id.0, elite, "pursuer_shown");
            }
            SimEvent::PursuerMoved { id, pose } => {
                self.pursuers.insert(id, pose);
            }
            SimEvent::PursuerDamaged {
                id,
                amount,
                remaining,
            } => debug!(pursuer = id.0, amount, remaining, "pursuer_hit"),
            SimEvent::PursuerDied { id } => {
                self.pursuers.remove(&id);
            }
            SimEvent::PursuerPushed { id, heading } => {
                debug!(pursuer = id.0, heading, "pursuer_shoved")
            }
            SimEvent::PursuerAlerted { id } => debug!(pursuer = id.0, "pursuer_hunting"),
            SimEvent::EliteAlerted => info!("elite_hunting"),
            SimEvent::EchoCreated { id, kind } => {
                self.echoes.insert(id, MirroredEcho { kind, pose: None });
            }
            SimEvent::EchoMoved { id, pose } => {
                if let Some(echo) = self.echoes.get_mut(&id) {
                    echo.pose = Some(pose);
                }
            }
            SimEvent::EchoHidden { id } => {
                if let Some(echo) = self.echoes.get_mut(&id) {
                    echo.pose = None;
                }
            }
            SimEvent::EchoReincarnated { echo, pursuer } => {
                self.echoes.remove(&echo);
                debug!(echo = echo.0, pursuer = pursuer.0, "echo_reborn");
            }
            SimEvent::EchoBifurcated { echo, pursuer } => {
                debug!(echo = echo.0, pursuer = pursuer.0, "echo_split");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(x: f32, z: f32) -> Pose {
        Pose { x, z, facing: 0.0 }
    }

    #[test]
    fn transforms_track_the_latest_pose() {
        let mut mirror = PresentationMirror::default();
        let id = PursuerId(1);

        mirror.apply(&SimEvent::PursuerSpawned {
            id,
            pose: pose(1.5, 1.5),
            elite: false,
        });
        mirror.apply(&SimEvent::PursuerMoved {
            id,
            pose: pose(1.6, 1.5),
        });
        mirror.apply(&SimEvent::AvatarMoved {
            pose: pose(4.5, 4.5),
        });

        assert_eq!(mirror.pursuer(id), Some(pose(1.6, 1.5)));
        assert_eq!(mirror.avatar(), Some(pose(4.5, 4.5)));
        assert_eq!(mirror.applied(), 3);
    }

    #[test]
    fn echoes_hide_and_show_with_replay() {
        let mut mirror = PresentationMirror::default();
        let id = EchoId(3);

        mirror.apply(&SimEvent::EchoCreated {
            id,
            kind: EchoKind::Pursuer,
        });
        assert_eq!(mirror.visible_echoes(), 0);

        mirror.apply(&SimEvent::EchoMoved {
            id,
            pose: pose(2.0, 2.0),
        });
        assert_eq!(mirror.visible_echoes(), 1);

        mirror.apply(&SimEvent::EchoHidden { id });
        assert_eq!(
            mirror.echo(id),
            Some(MirroredEcho {
                kind: EchoKind::Pursuer,
                pose: None
            })
        );
    }

    #[test]
    fn death_clears_live_pursuers_and_reincarnation_drops_the_echo() {
        let mut mirror = PresentationMirror::default();
        mirror.apply(&SimEvent::PursuerSpawned {
            id: PursuerId(1),
            pose: pose(1.0, 1.0),
            elite: true,
        });
        mirror.apply(&SimEvent::EchoCreated {
            id: EchoId(1),
            kind: EchoKind::Pursuer,
        });
        mirror.apply(&SimEvent::AvatarDied {
            tick: 10,
            lives_left: 2,
        });
        assert_eq!(mirror.pursuer_count(), 0);

        mirror.apply(&SimEvent::EchoReincarnated {
            echo: EchoId(1),
            pursuer: PursuerId(2),
        });
        assert_eq!(mirror.echo(EchoId(1)), None);
    }
}
