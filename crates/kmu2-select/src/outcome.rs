use std::collections::BTreeMap;
use std::fmt;

use kmu2_core::{DetectorKind, Track};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::matching::ClusterMatch;

/// Identifier of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Exactly one spectrometer track.
    TrackMultiplicity,
    /// Track charge equals the beam charge.
    Charge,
    /// Fit chi-square and chamber count.
    TrackQuality,
    /// Upstream Cherenkov multiplicity and sectors.
    UpstreamTag,
    /// Track-beam closest approach.
    Vertex,
    /// Squared missing mass.
    MissingMass,
    /// Momentum window and fit consistency.
    Momentum,
    /// Association with the timing reference detector.
    ReferenceAssociation,
    /// Upstream Cherenkov time against the reference time.
    UpstreamTiming,
    /// Association with a downstream detector.
    Downstream(DetectorKind),
    /// Final calorimeter filter.
    CalorimeterQuality,
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageId::TrackMultiplicity => f.write_str("track_multiplicity"),
            StageId::Charge => f.write_str("charge"),
            StageId::TrackQuality => f.write_str("track_quality"),
            StageId::UpstreamTag => f.write_str("upstream_tag"),
            StageId::Vertex => f.write_str("vertex"),
            StageId::MissingMass => f.write_str("missing_mass"),
            StageId::Momentum => f.write_str("momentum"),
            StageId::ReferenceAssociation => f.write_str("reference_association"),
            StageId::UpstreamTiming => f.write_str("upstream_timing"),
            StageId::Downstream(kind) => write!(f, "downstream_{kind}"),
            StageId::CalorimeterQuality => f.write_str("calorimeter_quality"),
        }
    }
}

/// The predicate that failed inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cut {
    /// No spectrometer track.
    NoTrack,
    /// More than one spectrometer track.
    MultipleTracks,
    /// Track charge differs from the beam charge.
    WrongCharge,
    /// Fit chi-square above the maximum.
    Chi2TooLarge,
    /// Fewer chambers than required.
    TooFewChambers,
    /// Fewer upstream candidates than required.
    TooFewUpstreamCandidates,
    /// An upstream candidate has too few sectors.
    TooFewSectors,
    /// Track and beam rays are parallel.
    DegenerateVertex,
    /// Closest distance of approach above the maximum.
    CdaTooLarge,
    /// Vertex z outside the fiducial range.
    VertexOutsideFiducial,
    /// |m^2_miss| above the tolerance.
    MissingMassOutOfWindow,
    /// Fitted momentum outside the window.
    MomentumOutOfWindow,
    /// Fitted and pattern-recognition momenta disagree.
    MomentumMismatch,
    /// The reference detector has no candidate.
    NoReferenceMatch,
    /// Closest reference candidate too far from the track.
    ReferenceMatchTooFar,
    /// Extrapolated reference point outside the annulus.
    ReferenceOutsideAcceptance,
    /// Post-magnet track position outside the spectrometer annulus.
    SpectrometerOutsideAcceptance,
    /// Another reference candidate coincides with the associated one.
    ReferenceAccidental,
    /// Best upstream candidate out of time with the reference.
    UpstreamOutOfTime,
    /// A required downstream detector has no candidate.
    MissingMatch,
    /// Extrapolated point outside the detector acceptance.
    OutsideAcceptance,
    /// Closest candidate too far from the track.
    MatchTooFar,
    /// Closest candidate too far along x or y.
    AxisOffsetTooLarge,
    /// Closest candidate out of time with the reference.
    OutOfTime,
    /// Matched cluster too close to a dead cell.
    DeadCellTooClose,
    /// A cluster fails the minimum-ionizing energy window.
    ClusterEnergyOutOfWindow,
    /// A cluster has too many cells.
    TooManyCells,
    /// The associated cluster deposit is too small or absent.
    InsufficientEnergy,
    /// Another cluster coincides with the associated one.
    AccidentalCluster,
    /// Not enough photon-like clusters.
    TooFewPhotons,
}

/// Where and why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// First failing stage.
    pub stage: StageId,
    /// Failing predicate inside that stage.
    pub cut: Cut,
}

/// Result of evaluating a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Move on to the next stage.
    Continue,
    /// Stop here.
    Reject(Rejection),
}

impl Verdict {
    /// Shorthand for a rejection.
    pub fn reject(stage: StageId, cut: Cut) -> Self {
        Verdict::Reject(Rejection { stage, cut })
    }
}

/// Track-beam closest approach as seen by the vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VertexSolution {
    /// Rays are parallel; no vertex exists.
    Degenerate,
    /// Regular solution.
    Found {
        /// Vertex position (mm).
        position: Vector3<f64>,
        /// Closest distance of approach (mm).
        cda: f64,
    },
}

/// Kinematic quantities of the decay hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicsInfo {
    /// Squared missing mass (GeV^2).
    pub mm2: f64,
    /// Opening angle between track and beam (rad).
    pub theta: f64,
    /// Track three-momentum (MeV).
    pub track_momentum: Vector3<f64>,
    /// Beam three-momentum (MeV).
    pub beam_momentum: Vector3<f64>,
}

/// Track association with one detector plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssociationInfo {
    /// Extrapolated track point at the detector plane (mm).
    pub point: Vector3<f64>,
    /// Closest candidate.
    pub matched: ClusterMatch,
    /// Time of the closest candidate (ns).
    pub candidate_time: Option<f64>,
    /// Candidate position minus extrapolated point (mm).
    pub offset: Option<Vector2<f64>>,
    /// `t_ref - t_det + offset` (ns); absent for the reference itself.
    pub time_diff: Option<f64>,
}

impl AssociationInfo {
    /// Transverse radius of the extrapolated point.
    pub fn radius(&self) -> f64 {
        self.point.x.hypot(self.point.y)
    }
}

/// Quantities computed by the calorimeter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalorimeterInfo {
    /// Corrected energies of every cluster (GeV), in input order.
    pub energies: Vec<f64>,
    /// Index of the cluster associated with the track.
    pub associated: Option<usize>,
    /// Number of photon-like clusters, when the photon requirement is active.
    pub photon_count: Option<usize>,
}

/// Every intermediate quantity produced before the first failing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Diagnostics {
    /// Burst the event came from.
    pub burst_id: u32,
    /// The selected track.
    pub track: Option<Track>,
    /// Closest approach to the nominal beam.
    pub vertex: Option<VertexSolution>,
    /// Decay kinematics.
    pub kinematics: Option<KinematicsInfo>,
    /// Reference detector association.
    pub reference: Option<AssociationInfo>,
    /// Radius of the post-magnet track position (mm).
    pub spectrometer_radius: Option<f64>,
    /// Best upstream candidate time difference (ns).
    pub upstream_time_diff: Option<f64>,
    /// Downstream associations keyed by detector.
    pub downstream: BTreeMap<DetectorKind, AssociationInfo>,
    /// Calorimeter stage quantities.
    pub calorimeter: Option<CalorimeterInfo>,
}

impl Diagnostics {
    pub(crate) fn new(burst_id: u32) -> Self {
        Self {
            burst_id,
            ..Self::default()
        }
    }

    /// Time of the associated reference candidate, once the reference stage has run.
    pub fn reference_time(&self) -> Option<f64> {
        self.reference.and_then(|info| info.candidate_time)
    }

    /// Flattens the diagnostics into named scalars.
    ///
    /// Only quantities that were actually computed appear in the map.
    pub fn scalars(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        if let Some(track) = &self.track {
            out.insert("track.p".to_string(), track.momentum);
            out.insert("track.p_before_fit".to_string(), track.momentum_before_fit);
            out.insert("track.chi2".to_string(), track.chi2);
            out.insert("track.chambers".to_string(), f64::from(track.chambers));
        }
        match self.vertex {
            Some(VertexSolution::Found { position, cda }) => {
                out.insert("vertex.x".to_string(), position.x);
                out.insert("vertex.y".to_string(), position.y);
                out.insert("vertex.z".to_string(), position.z);
                out.insert("vertex.cda".to_string(), cda);
            }
            Some(VertexSolution::Degenerate) | None => {}
        }
        if let Some(kinematics) = &self.kinematics {
            out.insert("kinematics.mm2".to_string(), kinematics.mm2);
            out.insert("kinematics.theta".to_string(), kinematics.theta);
        }
        if let Some(radius) = self.spectrometer_radius {
            out.insert("spectrometer.radius".to_string(), radius);
        }
        if let Some(dt) = self.upstream_time_diff {
            out.insert("upstream.time_diff".to_string(), dt);
        }
        if let Some(reference) = &self.reference {
            insert_association(&mut out, reference);
        }
        for info in self.downstream.values() {
            insert_association(&mut out, info);
        }
        if let Some(calo) = &self.calorimeter {
            if let Some(energy) = calo.associated.and_then(|idx| calo.energies.get(idx)) {
                out.insert("calorimeter.associated_energy".to_string(), *energy);
            }
            if let Some(count) = calo.photon_count {
                out.insert("calorimeter.photons".to_string(), count as f64);
            }
        }
        out
    }
}

fn insert_association(out: &mut BTreeMap<String, f64>, info: &AssociationInfo) {
    let name = info.matched.kind.name();
    out.insert(format!("{name}.x"), info.point.x);
    out.insert(format!("{name}.y"), info.point.y);
    out.insert(format!("{name}.radius"), info.radius());
    if let Some(distance) = info.matched.distance {
        out.insert(format!("{name}.distance"), distance);
    }
    if let Some(offset) = info.offset {
        out.insert(format!("{name}.dx"), offset.x);
        out.insert(format!("{name}.dy"), offset.y);
    }
    if let Some(dt) = info.time_diff {
        out.insert(format!("{name}.time_diff"), dt);
    }
}

/// Decision and diagnostics for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    /// True when every stage passed.
    pub accepted: bool,
    /// First failing stage and cut, `None` when accepted.
    pub rejection: Option<Rejection>,
    /// Quantities computed up to the decision.
    pub diagnostics: Diagnostics,
}

impl SelectionOutcome {
    /// Stage that rejected the event, if any.
    pub fn failed_stage(&self) -> Option<StageId> {
        self.rejection.map(|rejection| rejection.stage)
    }
}
