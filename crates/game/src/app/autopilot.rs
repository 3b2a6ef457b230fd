use echo_engine::sim::{bearing, distance, in_attack_sector};
use echo_engine::{AvatarAction, AvatarInput, Pilot, World};
use tracing::debug;

const PROGRESS_EPSILON: f32 = 0.005;
const STALL_TICKS: u32 = 10;
/// Quarter turn at the default turn rate.
const TURN_TICKS: u32 = 30;

/// Scripted avatar: walks forward, turns away from whatever stops it,
/// swings at pursuers in front and shoves the ones too close to swing at.
#[derive(Debug, Default)]
pub(crate) struct Autopilot {
    last_position: Option<(f32, f32)>,
    stalled_ticks: u32,
    turning_ticks: u32,
    turn_left: bool,
}

impl Pilot for Autopilot {
    fn steer(&mut self, world: &World, input: &mut AvatarInput) {
        input.release_all();
        let avatar = world.avatar();
        if avatar.is_dead() {
            return;
        }
        let config = &world.config().avatar;

        if let Some((gap, in_front)) = nearest_pursuer(world) {
            if in_front && gap < config.attack_range && !avatar.is_attacking() {
                input.request_attack();
            } else if gap < config.push_range && !avatar.is_pushing() {
                input.request_push();
            }
        }

        let position = (avatar.x(), avatar.z());
        let progressed = self
            .last_position
            .map(|(x, z)| distance(x, z, position.0, position.1) > PROGRESS_EPSILON)
            .unwrap_or(true);
        self.last_position = Some(position);

        if self.turning_ticks > 0 {
            self.turning_ticks -= 1;
            let turn = if self.turn_left {
                AvatarAction::TurnLeft
            } else {
                AvatarAction::TurnRight
            };
            input.set(turn, true);
            input.set(AvatarAction::Forward, true);
            return;
        }

        if progressed {
            self.stalled_ticks = 0;
        } else {
            self.stalled_ticks = self.stalled_ticks.saturating_add(1);
        }
        if self.stalled_ticks >= STALL_TICKS {
            self.stalled_ticks = 0;
            self.turning_ticks = TURN_TICKS;
            self.turn_left = !self.turn_left;
            debug!(facing = avatar.facing(), turn_left = self.turn_left, "autopilot_turning");
        }

        input.set(AvatarAction::Forward, true);
        let hunted = world.pursuers().iter().any(|pursuer| pursuer.is_pursuing());
        if hunted && !avatar.is_exhausted() {
            input.set(AvatarAction::Sprint, true);
        }
    }

    fn life_started(&mut self, _world: &World) {
        *self = Self {
            turn_left: self.turn_left,
            ..Self::default()
        };
    }
}

/// Distance to the closest live pursuer and whether it sits in the
/// avatar's attack sector.
fn nearest_pursuer(world: &World) -> Option<(f32, bool)> {
    let avatar = world.avatar();
    world
        .pursuers()
        .iter()
        .map(|pursuer| {
            let gap = distance(avatar.x(), avatar.z(), pursuer.x(), pursuer.z());
            let angle = bearing(avatar.x(), avatar.z(), pursuer.x(), pursuer.z());
            (gap, in_attack_sector(avatar.facing(), angle))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use echo_engine::{Board, CellCoord, SimConfig, SpawnPlan};

    use super::*;

    fn world(text: &str, cells: &[(u32, u32)]) -> World {
        let board = Board::from_ascii(text).expect("board");
        let plan = SpawnPlan {
            cells: cells
                .iter()
                .map(|(row, col)| CellCoord::new(*row, *col))
                .collect(),
            elite: None,
        };
        World::with_spawn_plan(SimConfig::default(), board, plan).expect("world")
    }

    fn drive(world: &mut World, pilot: &mut Autopilot, ticks: u32) {
        for _ in 0..ticks {
            let mut input = *world.input();
            pilot.steer(world, &mut input);
            world.set_input(input);
            world.tick();
        }
    }

    #[test]
    fn walks_forward_in_open_space() {
        let mut world = world("#######\n#..@..#\n#.....#\n#.....#\n#.....#\n#######", &[]);
        let mut pilot = Autopilot::default();
        let start_z = world.avatar().z();

        drive(&mut world, &mut pilot, 8);

        assert!(world.avatar().z() > start_z + 0.4);
        assert_eq!(world.avatar().facing(), 0.0);
    }

    #[test]
    fn turns_after_stalling_against_a_wall() {
        let mut world = world("#####\n#.@.#\n#####", &[]);
        let mut pilot = Autopilot::default();

        drive(&mut world, &mut pilot, 40);

        assert_ne!(world.avatar().facing(), 0.0);
    }

    #[test]
    fn swings_at_a_pursuer_in_front() {
        let mut world = world("######\n#.@..#\n#....#\n#....#\n######", &[(2, 2)]);
        for _ in 0..60 {
            let avatar = world.avatar();
            let pursuer = &world.pursuers()[0];
            if distance(avatar.x(), avatar.z(), pursuer.x(), pursuer.z()) < 0.6 {
                break;
            }
            world.tick();
        }

        let mut pilot = Autopilot::default();
        let mut input = AvatarInput::default();
        pilot.steer(&world, &mut input);

        assert!(input.attack_requested());
        assert!(input.is_down(AvatarAction::Forward));
    }

    #[test]
    fn new_life_clears_stall_tracking() {
        let world = world("#####\n#.@.#\n#####", &[]);
        let mut pilot = Autopilot {
            last_position: Some((0.0, 0.0)),
            stalled_ticks: 4,
            turning_ticks: 7,
            turn_left: true,
        };

        pilot.life_started(&world);

        assert_eq!(pilot.last_position, None);
        assert_eq!(pilot.stalled_ticks, 0);
        assert_eq!(pilot.turning_ticks, 0);
        assert!(pilot.turn_left);
    }
}
