//! Scripted stand-in for keyboard input.

use shared::{Vec3, STATE_SYNC_INTERVAL};

/// Walks the local cube in a circle on the XY plane, one step per
/// local-state push.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    /// Units per second.
    speed: f32,
    /// Radians per second.
    turn_rate: f32,
    heading: f32,
}

impl ScriptedInput {
    pub fn new(speed: f32, turn_rate: f32) -> Self {
        Self {
            speed,
            turn_rate,
            heading: 0.0,
        }
    }

    pub fn next_delta(&mut self) -> Vec3 {
        let dt = STATE_SYNC_INTERVAL.as_secs_f32();
        let delta = Vec3::new(self.heading.cos(), self.heading.sin(), 0.0) * (self.speed * dt);
        self.heading = (self.heading + self.turn_rate * dt) % std::f32::consts::TAU;
        delta
    }
}

impl Default for ScriptedInput {
    fn default() -> Self {
        Self::new(5.0, 1.0)
    }
}
