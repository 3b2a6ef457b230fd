/// Held movement controls for the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvatarAction {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
    Sprint,
}

const ACTION_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: AvatarAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: AvatarAction) -> bool {
        self.down[action.index()]
    }
}

impl AvatarAction {
    const fn index(self) -> usize {
        match self {
            AvatarAction::Forward => 0,
            AvatarAction::Back => 1,
            AvatarAction::StrafeLeft => 2,
            AvatarAction::StrafeRight => 3,
            AvatarAction::TurnLeft => 4,
            AvatarAction::TurnRight => 5,
            AvatarAction::Sprint => 6,
        }
    }
}

/// Input delivered between ticks: held controls plus one-shot attack and
/// push requests consumed by the next avatar update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvatarInput {
    states: ActionStates,
    attack_requested: bool,
    push_requested: bool,
}

impl AvatarInput {
    pub fn set(&mut self, action: AvatarAction, is_down: bool) {
        self.states.set(action, is_down);
    }

    pub fn is_down(&self, action: AvatarAction) -> bool {
        self.states.is_down(action)
    }

    pub fn request_attack(&mut self) {
        self.attack_requested = true;
    }

    pub fn request_push(&mut self) {
        self.push_requested = true;
    }

    pub fn attack_requested(&self) -> bool {
        self.attack_requested
    }

    pub fn push_requested(&self) -> bool {
        self.push_requested
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    /// Returns and clears the pending `(attack, push)` requests.
    pub(crate) fn take_requests(&mut self) -> (bool, bool) {
        let requests = (self.attack_requested, self.push_requested);
        self.attack_requested = false;
        self.push_requested = false;
        requests
    }

    /// Forward and strafe axes in `[-1, 1]`.
    pub(crate) fn movement_axes(&self) -> (f32, f32) {
        let axis = |positive: AvatarAction, negative: AvatarAction| {
            let mut value = 0.0;
            if self.is_down(positive) {
                value += 1.0;
            }
            if self.is_down(negative) {
                value -= 1.0;
            }
            value
        };
        (
            axis(AvatarAction::Forward, AvatarAction::Back),
            axis(AvatarAction::StrafeRight, AvatarAction::StrafeLeft),
        )
    }

    pub(crate) fn turn_axis(&self) -> f32 {
        let mut value = 0.0;
        if self.is_down(AvatarAction::TurnRight) {
            value += 1.0;
        }
        if self.is_down(AvatarAction::TurnLeft) {
            value -= 1.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_controls_cancel() {
        let mut input = AvatarInput::default();
        input.set(AvatarAction::Forward, true);
        input.set(AvatarAction::Back, true);
        input.set(AvatarAction::StrafeLeft, true);
        assert_eq!(input.movement_axes(), (0.0, -1.0));
    }

    #[test]
    fn requests_are_consumed_once() {
        let mut input = AvatarInput::default();
        input.request_attack();
        assert_eq!(input.take_requests(), (true, false));
        assert_eq!(input.take_requests(), (false, false));
    }
}
