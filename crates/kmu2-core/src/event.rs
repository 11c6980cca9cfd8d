//! Per-event input model: the spectrometer track and the reconstructed
//! candidates of every detector the selection looks at.

use std::fmt;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Detectors whose candidates are associated with the extrapolated track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Liquid krypton electromagnetic calorimeter (positions in cm).
    Lkr,
    /// Hadronic calorimeter front module (positions in mm).
    Muv1,
    /// Hadronic calorimeter back module (positions in mm).
    Muv2,
    /// Fast muon veto (positions in mm).
    Muv3,
    /// Charged hodoscope, the timing reference (positions in cm).
    Chod,
}

impl DetectorKind {
    /// Every associable detector, in downstream order of evaluation.
    pub const ALL: [DetectorKind; 5] = [
        DetectorKind::Chod,
        DetectorKind::Lkr,
        DetectorKind::Muv1,
        DetectorKind::Muv2,
        DetectorKind::Muv3,
    ];

    /// Short lowercase name used to prefix diagnostic quantities.
    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Lkr => "lkr",
            DetectorKind::Muv1 => "muv1",
            DetectorKind::Muv2 => "muv2",
            DetectorKind::Muv3 => "muv3",
            DetectorKind::Chod => "chod",
        }
    }

    /// Factor converting the detector's native position unit to millimetres.
    pub fn unit_scale(self) -> f64 {
        match self {
            DetectorKind::Lkr => LkrCluster::UNIT_SCALE,
            DetectorKind::Chod => ChodCandidate::UNIT_SCALE,
            DetectorKind::Muv1 | DetectorKind::Muv2 => MuvCluster::UNIT_SCALE,
            DetectorKind::Muv3 => Muv3Candidate::UNIT_SCALE,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability shared by every candidate that lives on a detector plane.
pub trait PlaneCandidate {
    /// Conversion from the native position unit to millimetres.
    const UNIT_SCALE: f64;

    /// Position as reported by the reconstruction, in native units.
    fn native_position(&self) -> Vector2<f64>;

    /// Candidate time in nanoseconds.
    fn time(&self) -> f64;

    /// Position in millimetres at the detector's nominal z-plane.
    fn position_mm(&self) -> Vector2<f64> {
        self.native_position() * Self::UNIT_SCALE
    }
}

/// Spectrometer track fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Electric charge in units of e.
    pub charge: i32,
    /// Fitted momentum magnitude (MeV).
    pub momentum: f64,
    /// Momentum estimate from pattern recognition, before the fit (MeV).
    pub momentum_before_fit: f64,
    /// (dx/dz, dy/dz) upstream of the analyzing magnet.
    pub slope_before: Vector2<f64>,
    /// (dx/dz, dy/dz) downstream of the analyzing magnet.
    pub slope_after: Vector2<f64>,
    /// Position upstream of the magnet (mm).
    pub position_before: Vector3<f64>,
    /// Position downstream of the magnet (mm).
    pub position_after: Vector3<f64>,
    /// Number of chambers contributing to the fit.
    pub chambers: u32,
    /// Fit chi-square.
    pub chi2: f64,
}

/// Upstream differential Cherenkov counter candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CedarCandidate {
    /// Candidate time (ns).
    pub time: f64,
    /// Number of sectors with signal.
    pub sectors: u32,
}

/// Charged hodoscope candidate. Positions are in centimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChodCandidate {
    /// Hit position (cm).
    pub position: Vector2<f64>,
    /// Candidate time (ns).
    pub time: f64,
}

impl PlaneCandidate for ChodCandidate {
    const UNIT_SCALE: f64 = 10.0;

    fn native_position(&self) -> Vector2<f64> {
        self.position
    }

    fn time(&self) -> f64 {
        self.time
    }
}

/// Calorimeter cluster. Positions and dead-cell distance are in centimetres,
/// energies in GeV as delivered by the reconstruction (uncorrected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LkrCluster {
    /// Cluster centroid (cm).
    pub position: Vector2<f64>,
    /// Cluster time (ns).
    pub time: f64,
    /// Raw cluster energy (GeV).
    pub energy: f64,
    /// Energy of the seed cell (GeV).
    #[serde(default)]
    pub seed_energy: f64,
    /// Number of cells in the cluster.
    pub cells: u32,
    /// Distance to the closest dead cell (cm).
    #[serde(default = "LkrCluster::far_from_dead_cells")]
    pub dead_cell_distance: f64,
}

impl LkrCluster {
    fn far_from_dead_cells() -> f64 {
        f64::MAX
    }
}

impl PlaneCandidate for LkrCluster {
    const UNIT_SCALE: f64 = 10.0;

    fn native_position(&self) -> Vector2<f64> {
        self.position
    }

    fn time(&self) -> f64 {
        self.time
    }
}

/// MUV1/MUV2 hadronic calorimeter cluster. Positions are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuvCluster {
    /// Cluster position (mm).
    pub position: Vector2<f64>,
    /// Cluster time (ns).
    pub time: f64,
    /// Cluster energy.
    #[serde(default)]
    pub energy: f64,
    /// Index of the horizontal scintillator strip.
    #[serde(default)]
    pub horizontal_channel: i32,
    /// Index of the vertical scintillator strip.
    #[serde(default)]
    pub vertical_channel: i32,
}

impl PlaneCandidate for MuvCluster {
    const UNIT_SCALE: f64 = 1.0;

    fn native_position(&self) -> Vector2<f64> {
        self.position
    }

    fn time(&self) -> f64 {
        self.time
    }
}

/// Fast muon veto candidate. Positions are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Muv3Candidate {
    /// Tile centre (mm).
    pub position: Vector2<f64>,
    /// Candidate time (ns).
    pub time: f64,
    /// Tile identifier.
    #[serde(default)]
    pub tile_id: u32,
}

impl PlaneCandidate for Muv3Candidate {
    const UNIT_SCALE: f64 = 1.0;

    fn native_position(&self) -> Vector2<f64> {
        self.position
    }

    fn time(&self) -> f64 {
        self.time
    }
}

/// Everything the selection reads for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Event {
    /// Burst the event belongs to. Passed through to diagnostics only.
    #[serde(default)]
    pub burst_id: u32,
    /// Spectrometer tracks.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Upstream Cherenkov candidates.
    #[serde(default)]
    pub cedar: Vec<CedarCandidate>,
    /// Charged hodoscope candidates.
    #[serde(default)]
    pub chod: Vec<ChodCandidate>,
    /// Calorimeter clusters.
    #[serde(default)]
    pub lkr: Vec<LkrCluster>,
    /// MUV1 clusters.
    #[serde(default)]
    pub muv1: Vec<MuvCluster>,
    /// MUV2 clusters.
    #[serde(default)]
    pub muv2: Vec<MuvCluster>,
    /// MUV3 candidates.
    #[serde(default)]
    pub muv3: Vec<Muv3Candidate>,
}

impl Event {
    /// Number of candidates reported by the given detector.
    pub fn candidate_count(&self, kind: DetectorKind) -> usize {
        match kind {
            DetectorKind::Lkr => self.lkr.len(),
            DetectorKind::Muv1 => self.muv1.len(),
            DetectorKind::Muv2 => self.muv2.len(),
            DetectorKind::Muv3 => self.muv3.len(),
            DetectorKind::Chod => self.chod.len(),
        }
    }

    /// Position in millimetres of a candidate, if the index exists.
    pub fn candidate_position_mm(&self, kind: DetectorKind, index: usize) -> Option<Vector2<f64>> {
        match kind {
            DetectorKind::Lkr => self.lkr.get(index).map(PlaneCandidate::position_mm),
            DetectorKind::Muv1 => self.muv1.get(index).map(PlaneCandidate::position_mm),
            DetectorKind::Muv2 => self.muv2.get(index).map(PlaneCandidate::position_mm),
            DetectorKind::Muv3 => self.muv3.get(index).map(PlaneCandidate::position_mm),
            DetectorKind::Chod => self.chod.get(index).map(PlaneCandidate::position_mm),
        }
    }

    /// Time of a candidate, if the index exists.
    pub fn candidate_time(&self, kind: DetectorKind, index: usize) -> Option<f64> {
        match kind {
            DetectorKind::Lkr => self.lkr.get(index).map(PlaneCandidate::time),
            DetectorKind::Muv1 => self.muv1.get(index).map(PlaneCandidate::time),
            DetectorKind::Muv2 => self.muv2.get(index).map(PlaneCandidate::time),
            DetectorKind::Muv3 => self.muv3.get(index).map(PlaneCandidate::time),
            DetectorKind::Chod => self.chod.get(index).map(PlaneCandidate::time),
        }
    }
}
