use rand::Rng;
use shared::{PlayerState, Rgb, Vec3};

/// Creates the initial state for a newly connected player.
///
/// Position is integer-valued: x and y in `-10..10`, z in `0..10`. The colour
/// is fully saturated with a random hue and a value of at least 0.5, so no
/// cube spawns near-black.
pub fn spawn_player<R: Rng>(id: &str, rng: &mut R) -> PlayerState {
    let position = Vec3::new(
        rng.gen_range(-10i32..10) as f32,
        rng.gen_range(-10i32..10) as f32,
        rng.gen_range(0i32..10) as f32,
    );
    let color = Rgb::from_hsv(rng.gen_range(0.0..=1.0), 1.0, rng.gen_range(0.5..=1.0));

    PlayerState::new(id, position, color)
}
