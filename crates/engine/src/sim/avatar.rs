use tracing::debug;

use crate::collision::{move_per_axis, Aabb, StaticGeometry};
use crate::config::AvatarConfig;

use super::combat::{heading_vector, normalize_degrees};
use super::history::{History, Pose};
use super::input::{AvatarAction, AvatarInput};

#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    x: f32,
    z: f32,
    facing: f32,
    hit_points: i32,
    max_hit_points: i32,
    dead: bool,
    found_exit: bool,
    stamina: f32,
    exhausted: bool,
    stamina_ticks: u32,
    idle_intervals: u32,
    attack_window: u32,
    push_window: u32,
    history: History,
}

/// What the avatar did during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct AvatarTickOutcome {
    pub attack_started: bool,
    pub push_started: bool,
    pub exit_found: bool,
}

impl Avatar {
    pub fn spawn(x: f32, z: f32, config: &AvatarConfig) -> Self {
        Self {
            x,
            z,
            facing: 0.0,
            hit_points: config.hit_points,
            max_hit_points: config.hit_points,
            dead: false,
            found_exit: false,
            stamina: config.stamina_max,
            exhausted: false,
            stamina_ticks: 0,
            idle_intervals: 0,
            attack_window: 0,
            push_window: 0,
            history: History::new(),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn set_facing(&mut self, facing: f32) {
        self.facing = normalize_degrees(facing);
    }

    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            z: self.z,
            facing: self.facing,
        }
    }

    pub fn hit_points(&self) -> i32 {
        self.hit_points
    }

    pub fn max_hit_points(&self) -> i32 {
        self.max_hit_points
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn found_exit(&self) -> bool {
        self.found_exit
    }

    pub fn stamina(&self) -> f32 {
        self.stamina
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_attacking(&self) -> bool {
        self.attack_window > 0
    }

    pub fn is_pushing(&self) -> bool {
        self.push_window > 0
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn volume(&self, config: &AvatarConfig) -> Aabb {
        Aabb::centered(self.x, self.z, config.radius)
    }

    /// Applies damage and returns true when this hit killed the avatar.
    pub(crate) fn take_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.hit_points = self.hit_points.saturating_sub(amount);
        if self.hit_points <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    pub(crate) fn tick(
        &mut self,
        input: &mut AvatarInput,
        config: &AvatarConfig,
        geometry: &StaticGeometry,
        pursuer_volumes: &[Aabb],
    ) -> AvatarTickOutcome {
        let mut outcome = AvatarTickOutcome::default();
        self.attack_window = self.attack_window.saturating_sub(1);
        self.push_window = self.push_window.saturating_sub(1);

        let turn = input.turn_axis();
        if turn != 0.0 {
            self.facing = normalize_degrees(self.facing + turn * config.turn_degrees_per_tick);
        }

        let (forward, strafe) = input.movement_axes();
        let wants_sprint = input.is_down(AvatarAction::Sprint);
        let moving = forward != 0.0 || strafe != 0.0;
        let sprinting = moving && wants_sprint && !self.exhausted;
        if moving {
            let speed = if sprinting {
                config.sprint_speed
            } else {
                config.walk_speed
            };
            let (fx, fz) = heading_vector(self.facing);
            let (rx, rz) = heading_vector(self.facing + 90.0);
            let mut dx = fx * forward + rx * strafe;
            let mut dz = fz * forward + rz * strafe;
            let length = (dx * dx + dz * dz).sqrt();
            if length > f32::EPSILON {
                dx = dx / length * speed;
                dz = dz / length * speed;
                let step = move_per_axis(
                    self.x,
                    self.z,
                    dx,
                    dz,
                    config.radius,
                    geometry,
                    pursuer_volumes,
                );
                self.x = step.x;
                self.z = step.z;
            }
        }

        if !self.found_exit && geometry.touches_exit(&self.volume(config)) {
            self.found_exit = true;
            outcome.exit_found = true;
        }

        self.update_stamina(sprinting, config);

        let (attack, push) = input.take_requests();
        if attack && self.attack_window == 0 && self.push_window == 0 {
            self.attack_window = config.attack_window_ticks;
            outcome.attack_started = true;
        }
        if push && self.push_window == 0 {
            self.push_window = config.push_window_ticks;
            outcome.push_started = true;
        }

        self.history.record(self.pose());
        outcome
    }

    fn update_stamina(&mut self, sprinting: bool, config: &AvatarConfig) {
        self.stamina_ticks = self.stamina_ticks.saturating_add(1);
        if self.stamina_ticks < config.stamina_interval_ticks {
            return;
        }
        self.stamina_ticks = 0;

        if sprinting {
            self.idle_intervals = 0;
            self.stamina = (self.stamina - 1.0).max(0.0);
            if self.stamina <= 0.0 {
                self.exhausted = true;
                debug!("avatar_exhausted");
            }
            return;
        }

        self.idle_intervals = self.idle_intervals.saturating_add(1);
        let regen = config.stamina_regen * self.idle_intervals as f32;
        self.stamina = (self.stamina + regen).min(config.stamina_max);
        if self.exhausted && self.stamina >= config.stamina_max {
            self.exhausted = false;
            debug!("avatar_recovered");
        }
    }
}
