#![deny(missing_docs)]
#![doc = "Straight-line geometry for the Kmu2 selection: extrapolation of a track to \
detector planes, the closest approach of two rays and two-body decay kinematics."]

/// Linear propagation of track states to fixed z-planes.
pub mod extrapolate;
/// Relativistic four-momenta, missing mass and opening angle.
pub mod kinematics;
/// Closest distance of approach between two rays.
pub mod vertex;

pub use extrapolate::{extrapolate, extrapolate_downstream, extrapolate_upstream};
pub use kinematics::{
    beam_four_momentum, beam_momentum, beam_origin, missing_mass_squared, opening_angle,
    track_four_momentum, track_momentum, FourMomentum, MEV2_TO_GEV2,
};
pub use vertex::{closest_approach, ClosestApproach};
