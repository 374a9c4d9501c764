use serde::{Deserialize, Serialize};

use crate::ecs::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Sprint,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Sprint => 4,
        }
    }
}

/// Latest abstract player command, already mapped from devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    actions: ActionStates,
}

impl PlayerInput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: &[InputAction]) -> Self {
        let mut input = Self::default();
        for &action in actions {
            input.actions.set(action, true);
        }
        input
    }

    pub fn actions(&self) -> ActionStates {
        self.actions
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// Opposing keys cancel out on their axis.
    pub fn direction(&self) -> Direction {
        let axis = |negative, positive| {
            i8::from(self.is_down(positive)) - i8::from(self.is_down(negative))
        };
        Direction::from_signs(
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveUp, InputAction::MoveDown),
        )
    }

    pub fn sprinting(&self) -> bool {
        self.is_down(InputAction::Sprint)
    }
}
