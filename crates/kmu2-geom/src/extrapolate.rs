use kmu2_core::Track;
use nalgebra::{Vector2, Vector3};

/// Projects a point with slope `(dx/dz, dy/dz)` onto the plane `z = target_z`.
///
/// Works in both directions; a target upstream of the reference simply
/// yields a negative step.
pub fn extrapolate(position: &Vector3<f64>, slope: &Vector2<f64>, target_z: f64) -> Vector3<f64> {
    let step = target_z - position.z;
    position + Vector3::new(slope.x, slope.y, 1.0) * step
}

/// Extrapolates the post-magnet track state, used for every downstream detector.
pub fn extrapolate_downstream(track: &Track, target_z: f64) -> Vector3<f64> {
    extrapolate(&track.position_after, &track.slope_after, target_z)
}

/// Extrapolates the pre-magnet track state.
pub fn extrapolate_upstream(track: &Track, target_z: f64) -> Vector3<f64> {
    extrapolate(&track.position_before, &track.slope_before, target_z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_step_returns_reference() {
        let pos = Vector3::new(12.5, -3.0, 219_000.0);
        let slope = Vector2::new(0.01, -0.02);
        assert_eq!(extrapolate(&pos, &slope, 219_000.0), pos);
    }

    #[test]
    fn step_follows_slope() {
        let pos = Vector3::new(0.0, 0.0, 1000.0);
        let slope = Vector2::new(0.5, -0.25);
        let out = extrapolate(&pos, &slope, 1400.0);
        assert_eq!(out, Vector3::new(200.0, -100.0, 1400.0));
        let back = extrapolate(&pos, &slope, 600.0);
        assert_eq!(back, Vector3::new(-200.0, 100.0, 600.0));
    }
}
