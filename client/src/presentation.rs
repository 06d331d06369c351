//! Boundary between the replication core and whatever draws the cubes.
//!
//! The core only ever calls the three `on_entity_*` hooks; it never reports
//! errors to the presentation layer. Local input is sampled once per
//! local-state push.

use crate::input::ScriptedInput;
use log::{debug, info};
use shared::{Rgb, Vec3};

pub trait Presentation {
    fn on_entity_create(&mut self, id: &str, position: Vec3, color: Rgb, is_local: bool);

    fn on_entity_update_position(&mut self, id: &str, position: Vec3);

    fn on_entity_destroy(&mut self, id: &str);

    /// Movement since the previous call.
    fn read_local_input_delta(&mut self) -> Vec3;

    fn read_local_color(&mut self) -> Rgb;
}

/// Presentation without a window: logs entity changes and drives the local
/// cube with [`ScriptedInput`].
pub struct HeadlessPresenter {
    input: ScriptedInput,
    local_color: Rgb,
    entity_count: usize,
}

impl HeadlessPresenter {
    pub fn new(input: ScriptedInput) -> Self {
        Self {
            input,
            local_color: Rgb::new(1.0, 1.0, 1.0),
            entity_count: 0,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }
}

impl Presentation for HeadlessPresenter {
    fn on_entity_create(&mut self, id: &str, position: Vec3, color: Rgb, is_local: bool) {
        self.entity_count += 1;
        if is_local {
            self.local_color = color;
        }
        info!(
            "Spawned cube {}{} at ({:.1}, {:.1}, {:.1}), {} on screen",
            id,
            if is_local { " (you)" } else { "" },
            position.x,
            position.y,
            position.z,
            self.entity_count
        );
    }

    fn on_entity_update_position(&mut self, id: &str, position: Vec3) {
        debug!(
            "Cube {} -> ({:.2}, {:.2}, {:.2})",
            id, position.x, position.y, position.z
        );
    }

    fn on_entity_destroy(&mut self, id: &str) {
        self.entity_count = self.entity_count.saturating_sub(1);
        info!("Removed cube {}, {} on screen", id, self.entity_count);
    }

    fn read_local_input_delta(&mut self) -> Vec3 {
        self.input.next_delta()
    }

    fn read_local_color(&mut self) -> Rgb {
        self.local_color
    }
}
