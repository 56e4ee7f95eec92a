//! Planar movement and proximity helpers
//!
//! The arena is a square on the x/z ground plane centred on the origin. All
//! gameplay geometry is 2D; height is cosmetic and only particles carry it.

/// Half-extent of the arena; projectiles beyond this on either axis are pruned.
pub const ARENA_HALF_EXTENT: f32 = 50.0;

/// Walkable half-extent for players and enemies (inside the arena walls).
pub const MOVEMENT_BOUND: f32 = 48.0;

/// Movement helpers shared by the player, enemy AI and projectiles
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Squared planar distance between two points
    pub fn distance_sq(x1: f32, z1: f32, x2: f32, z2: f32) -> f32 {
        let dx = x2 - x1;
        let dz = z2 - z1;
        dx * dx + dz * dz
    }

    /// Planar distance between two points
    pub fn distance(x1: f32, z1: f32, x2: f32, z2: f32) -> f32 {
        Self::distance_sq(x1, z1, x2, z2).sqrt()
    }

    /// Strict proximity test used by every hit check (`distance < radius`)
    pub fn within(x1: f32, z1: f32, x2: f32, z2: f32, radius: f32) -> bool {
        Self::distance_sq(x1, z1, x2, z2) < radius * radius
    }

    /// Clamp a position to the walkable area. Runs after movement regardless
    /// of how large the frame delta was.
    pub fn clamp_to_arena(x: f32, z: f32) -> (f32, f32) {
        (
            x.clamp(-MOVEMENT_BOUND, MOVEMENT_BOUND),
            z.clamp(-MOVEMENT_BOUND, MOVEMENT_BOUND),
        )
    }

    /// True once a point has left the arena on either horizontal axis
    pub fn out_of_bounds(x: f32, z: f32) -> bool {
        x.abs() >= ARENA_HALF_EXTENT || z.abs() >= ARENA_HALF_EXTENT
    }

    /// Heading (radians, measured from +x towards +z) from one point to another
    pub fn heading(from_x: f32, from_z: f32, to_x: f32, to_z: f32) -> f32 {
        (to_z - from_z).atan2(to_x - from_x)
    }

    /// Advance a point along a heading
    pub fn advance(x: f32, z: f32, heading: f32, distance: f32) -> (f32, f32) {
        (x + heading.cos() * distance, z + heading.sin() * distance)
    }

    /// Step towards a target by at most `step`. Returns the new position and
    /// the heading travelled, or `None` when already within `arrival_radius`.
    pub fn step_towards(
        x: f32,
        z: f32,
        target_x: f32,
        target_z: f32,
        step: f32,
        arrival_radius: f32,
    ) -> Option<(f32, f32, f32)> {
        let dist = Self::distance(x, z, target_x, target_z);
        if dist <= arrival_radius {
            return None;
        }

        let dx = (target_x - x) / dist;
        let dz = (target_z - z) / dist;
        Some((x + dx * step, z + dz * step, dz.atan2(dx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_holds_for_huge_moves() {
        let (x, z) = PhysicsSystem::clamp_to_arena(10_000.0, -10_000.0);
        assert_eq!((x, z), (MOVEMENT_BOUND, -MOVEMENT_BOUND));
    }

    #[test]
    fn within_is_strict() {
        assert!(PhysicsSystem::within(0.0, 0.0, 1.99, 0.0, 2.0));
        assert!(!PhysicsSystem::within(0.0, 0.0, 2.0, 0.0, 2.0));
    }

    #[test]
    fn step_towards_stops_inside_arrival_radius() {
        assert!(PhysicsSystem::step_towards(0.0, 0.0, 1.0, 1.0, 6.0, 2.0).is_none());

        let (x, z, heading) = PhysicsSystem::step_towards(0.0, 0.0, 10.0, 0.0, 3.0, 2.0).unwrap();
        assert!((x - 3.0).abs() < 1e-5);
        assert_eq!(z, 0.0);
        assert!(heading.abs() < 1e-6);
    }

    #[test]
    fn out_of_bounds_on_either_axis() {
        assert!(!PhysicsSystem::out_of_bounds(49.9, -49.9));
        assert!(PhysicsSystem::out_of_bounds(50.0, 0.0));
        assert!(PhysicsSystem::out_of_bounds(0.0, -51.0));
    }
}
