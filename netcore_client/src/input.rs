//! Input handling.
//!
//! The engine samples keyboard and mouse; this module only turns one sample
//! into the `PLAYER_MOVEMENT` message for a tick.

use netcore_shared::{math::Quat, message::PlayerMovement};

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputState {
    pub forward: f32,
    pub right: f32,
    pub facing: Quat,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            forward: 0.0,
            right: 0.0,
            facing: Quat::IDENTITY,
        }
    }
}

impl InputState {
    pub fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.right == 0.0
    }
}

/// Turns sampled input into a movement message, or `None` when standing still.
pub fn build_movement(player_id: i64, input: InputState) -> Option<PlayerMovement> {
    if input.is_idle() {
        return None;
    }
    Some(PlayerMovement {
        player_id,
        dx: input.right,
        dy: input.forward,
        rotation: input.facing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_input_sends_nothing() {
        assert_eq!(build_movement(1, InputState::default()), None);

        let msg = build_movement(
            1,
            InputState {
                forward: 1.0,
                right: -0.5,
                ..InputState::default()
            },
        )
        .unwrap();
        assert_eq!((msg.dx, msg.dy), (-0.5, 1.0));
    }
}
