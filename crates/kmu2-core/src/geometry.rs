//! Static physical constants and detector placement.
//!
//! Lengths are millimetres, momenta and masses MeV, angles radians. The
//! table is plain data: it is built once, validated with the rest of the
//! selection configuration and then shared read-only between events.

use serde::{Deserialize, Serialize};

use crate::event::DetectorKind;

fn default_muon_mass() -> f64 {
    105.658_37
}

fn default_pion_mass() -> f64 {
    139.57
}

fn default_kaon_mass() -> f64 {
    493.677
}

fn default_beam_momentum() -> f64 {
    74_800.0
}

fn default_crossing_angle() -> f64 {
    0.0012
}

fn default_beam_origin_z() -> f64 {
    101_800.0
}

fn default_chod_z() -> f64 {
    238_960.0
}

fn default_lkr_z() -> f64 {
    241_495.0
}

fn default_muv1_z() -> f64 {
    244_341.0
}

fn default_muv2_z() -> f64 {
    245_290.0
}

fn default_muv3_z() -> f64 {
    246_850.0
}

/// Particle masses used by the kinematic stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Masses {
    /// Charged muon mass.
    #[serde(default = "default_muon_mass")]
    pub muon: f64,
    /// Charged pion mass.
    #[serde(default = "default_pion_mass")]
    pub charged_pion: f64,
    /// Charged kaon mass.
    #[serde(default = "default_kaon_mass")]
    pub kaon: f64,
}

impl Default for Masses {
    fn default() -> Self {
        Self {
            muon: default_muon_mass(),
            charged_pion: default_pion_mass(),
            kaon: default_kaon_mass(),
        }
    }
}

/// Nominal beam description (no beam tracker available).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamSpec {
    /// Beam momentum magnitude.
    #[serde(default = "default_beam_momentum")]
    pub momentum: f64,
    /// Horizontal crossing angle of the beam with respect to the z axis.
    #[serde(default = "default_crossing_angle")]
    pub crossing_angle: f64,
    /// z of the trim magnet where the beam ray is anchored on the axis.
    #[serde(default = "default_beam_origin_z")]
    pub origin_z: f64,
}

impl Default for BeamSpec {
    fn default() -> Self {
        Self {
            momentum: default_beam_momentum(),
            crossing_angle: default_crossing_angle(),
            origin_z: default_beam_origin_z(),
        }
    }
}

/// Front-face z positions of the downstream detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanePositions {
    /// Charged hodoscope.
    #[serde(default = "default_chod_z")]
    pub chod: f64,
    /// Liquid krypton calorimeter.
    #[serde(default = "default_lkr_z")]
    pub lkr: f64,
    /// First hadronic calorimeter plane.
    #[serde(default = "default_muv1_z")]
    pub muv1: f64,
    /// Second hadronic calorimeter plane.
    #[serde(default = "default_muv2_z")]
    pub muv2: f64,
    /// Fast muon veto.
    #[serde(default = "default_muv3_z")]
    pub muv3: f64,
}

impl Default for PlanePositions {
    fn default() -> Self {
        Self {
            chod: default_chod_z(),
            lkr: default_lkr_z(),
            muv1: default_muv1_z(),
            muv2: default_muv2_z(),
            muv3: default_muv3_z(),
        }
    }
}

/// Immutable table of constants consumed by the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeometryTable {
    /// Particle masses.
    #[serde(default)]
    pub masses: Masses,
    /// Nominal beam.
    #[serde(default)]
    pub beam: BeamSpec,
    /// Detector plane positions.
    #[serde(default)]
    pub planes: PlanePositions,
}

impl GeometryTable {
    /// Returns the nominal z-plane of the given detector.
    pub fn plane_z(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::Chod => self.planes.chod,
            DetectorKind::Lkr => self.planes.lkr,
            DetectorKind::Muv1 => self.planes.muv1,
            DetectorKind::Muv2 => self.planes.muv2,
            DetectorKind::Muv3 => self.planes.muv3,
        }
    }
}

/// Mass assumed for the charged track when building its four-momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MassHypothesis {
    /// K → μν.
    #[default]
    Muon,
    /// Charged pion hypothesis used by the one-track analyses.
    ChargedPion,
}

impl MassHypothesis {
    /// Resolves the hypothesis against the mass table.
    pub fn mass(self, masses: &Masses) -> f64 {
        match self {
            MassHypothesis::Muon => masses.muon,
            MassHypothesis::ChargedPion => masses.charged_pion,
        }
    }
}
