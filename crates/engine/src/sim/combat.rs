/// Half-width of the avatar's melee sector in degrees.
pub const ATTACK_HALF_ARC_DEGREES: f32 = 60.0;

pub fn normalize_degrees(angle: f32) -> f32 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Compass bearing from `(from_x, from_z)` to `(to_x, to_z)`, using the same
/// convention as movement: 0 degrees is +Z, 90 degrees is +X.
pub fn bearing(from_x: f32, from_z: f32, to_x: f32, to_z: f32) -> f32 {
    normalize_degrees((to_x - from_x).atan2(to_z - from_z).to_degrees())
}

pub fn distance(ax: f32, az: f32, bx: f32, bz: f32) -> f32 {
    ((ax - bx).powi(2) + (az - bz).powi(2)).sqrt()
}

/// Whether `angle` falls inside the sector centered on `facing`. When the
/// sector straddles 0/360 the valid range is `[lower, 360) ∪ [0, upper)`,
/// otherwise `[lower, upper]`.
pub fn in_attack_sector(facing: f32, angle: f32) -> bool {
    let lower = normalize_degrees(facing - ATTACK_HALF_ARC_DEGREES);
    let upper = (normalize_degrees(facing) + ATTACK_HALF_ARC_DEGREES) % 360.0;
    let angle = normalize_degrees(angle);
    if upper < lower {
        angle >= lower || angle < upper
    } else {
        angle >= lower && angle <= upper
    }
}

/// Unit step for a compass heading.
pub fn heading_vector(heading: f32) -> (f32, f32) {
    let radians = heading.to_radians();
    (radians.sin(), radians.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_wraps_around_zero() {
        assert!(in_attack_sector(0.0, 350.0));
        assert!(in_attack_sector(0.0, 10.0));
        assert!(!in_attack_sector(0.0, 190.0));
        assert!(!in_attack_sector(0.0, 60.0));
        assert!(in_attack_sector(0.0, 300.0));
    }

    #[test]
    fn sector_without_wrap_is_closed_interval() {
        assert!(in_attack_sector(180.0, 120.0));
        assert!(in_attack_sector(180.0, 240.0));
        assert!(!in_attack_sector(180.0, 241.0));
        assert!(!in_attack_sector(180.0, 10.0));
    }

    #[test]
    fn sector_near_upper_wrap() {
        assert!(in_attack_sector(330.0, 20.0));
        assert!(in_attack_sector(330.0, 280.0));
        assert!(!in_attack_sector(330.0, 30.0));
    }

    #[test]
    fn bearing_matches_movement_axes() {
        assert!((bearing(0.0, 0.0, 0.0, 1.0) - 0.0).abs() < 1e-4);
        assert!((bearing(0.0, 0.0, 1.0, 0.0) - 90.0).abs() < 1e-4);
        assert!((bearing(0.0, 0.0, 0.0, -1.0) - 180.0).abs() < 1e-4);
        assert!((bearing(0.0, 0.0, -1.0, 0.0) - 270.0).abs() < 1e-4);
    }

    #[test]
    fn normalize_wraps_negative_and_large_angles() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
    }
}
