use std::ops::Sub;

use kmu2_core::{BeamSpec, Track};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Converts a squared mass from MeV^2 to GeV^2.
pub const MEV2_TO_GEV2: f64 = 1.0e-6;

/// Energy and three-momentum of a particle (MeV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourMomentum {
    /// Total energy.
    pub energy: f64,
    /// Three-momentum.
    pub momentum: Vector3<f64>,
}

impl FourMomentum {
    /// Builds an on-shell four-momentum for the given mass.
    pub fn on_shell(momentum: Vector3<f64>, mass: f64) -> Self {
        let energy = (momentum.norm_squared() + mass * mass).sqrt();
        Self { energy, momentum }
    }

    /// Invariant mass squared, `E^2 - |p|^2`. May be negative off-shell.
    pub fn mass_squared(&self) -> f64 {
        self.energy * self.energy - self.momentum.norm_squared()
    }
}

impl Sub for FourMomentum {
    type Output = FourMomentum;

    fn sub(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum {
            energy: self.energy - rhs.energy,
            momentum: self.momentum - rhs.momentum,
        }
    }
}

/// Nominal beam three-momentum, tilted in x by the crossing angle.
pub fn beam_momentum(beam: &BeamSpec) -> Vector3<f64> {
    Vector3::new(beam.crossing_angle, 0.0, 1.0).normalize() * beam.momentum
}

/// Anchor point of the nominal beam ray.
pub fn beam_origin(beam: &BeamSpec) -> Vector3<f64> {
    Vector3::new(0.0, 0.0, beam.origin_z)
}

/// Nominal beam four-momentum for the given beam-particle mass.
pub fn beam_four_momentum(beam: &BeamSpec, mass: f64) -> FourMomentum {
    FourMomentum::on_shell(beam_momentum(beam), mass)
}

/// Track three-momentum from the fitted magnitude and the pre-magnet slopes.
pub fn track_momentum(track: &Track) -> Vector3<f64> {
    Vector3::new(track.slope_before.x, track.slope_before.y, 1.0).normalize() * track.momentum
}

/// Track four-momentum under a mass hypothesis.
pub fn track_four_momentum(track: &Track, mass: f64) -> FourMomentum {
    FourMomentum::on_shell(track_momentum(track), mass)
}

/// Squared missing mass `(P_beam - P_track)^2` in MeV^2.
pub fn missing_mass_squared(beam: &FourMomentum, track: &FourMomentum) -> f64 {
    (*beam - *track).mass_squared()
}

/// Angle between two three-vectors in radians.
pub fn opening_angle(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_shell_mass_is_recovered() {
        let p = FourMomentum::on_shell(Vector3::new(0.0, 0.0, 3.0), 4.0);
        assert_eq!(p.energy, 5.0);
        assert_eq!(p.mass_squared(), 16.0);
    }

    #[test]
    fn beam_points_along_crossing_angle() {
        let beam = BeamSpec::default();
        let p = beam_momentum(&beam);
        assert!((p.norm() - beam.momentum).abs() < 1e-6);
        assert!((p.x / p.z - beam.crossing_angle).abs() < 1e-12);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn parallel_vectors_have_zero_angle() {
        let a = Vector3::new(2.0, 3.0, 6.0);
        assert_eq!(opening_angle(&a, &(a * 2.0)), 0.0);
        assert_eq!(opening_angle(&a, &Vector3::zeros()), 0.0);
    }
}
