//! Selection thresholds and the three analysis presets.
//!
//! Units: lengths in mm (the LKr dead-cell distance stays in the detector's
//! native cm), momenta in MeV, calorimeter energies in GeV, squared missing
//! mass in GeV^2, times in ns. A cut set to `None` is not applied.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use kmu2_core::errors::{ErrorInfo, Kmu2Error};
use kmu2_core::{DetectorKind, GeometryTable, MassHypothesis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::EnergyCorrection;
use crate::serde::from_yaml_slice;

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl Window {
    /// Builds a window from its bounds.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true when `value` lies inside the window.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn check(&self, field: &str) -> Result<(), Kmu2Error> {
        if !(self.min < self.max) {
            return Err(Kmu2Error::Config(
                ErrorInfo::for_field(
                    "kmu2_select.config_range",
                    field,
                    "window minimum must be below maximum",
                )
                .with_context("min", self.min.to_string())
                .with_context("max", self.max.to_string()),
            ));
        }
        Ok(())
    }
}

/// Geometric acceptance of an extrapolated point on a detector plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum Acceptance {
    /// Radial annulus, both radii inclusive.
    Annulus {
        /// Inner radius.
        r_min: f64,
        /// Outer radius.
        r_max: f64,
    },
    /// Square frame: the inner beam-hole square (edges included) and
    /// everything at or beyond the outer half-width are excluded.
    Square {
        /// Half-width of the excluded central square.
        inner_half: f64,
        /// Half-width of the outer boundary.
        outer_half: f64,
    },
}

impl Acceptance {
    /// Returns true when the transverse point `(x, y)` is accepted.
    pub fn accepts(&self, x: f64, y: f64) -> bool {
        match *self {
            Acceptance::Annulus { r_min, r_max } => {
                let r = x.hypot(y);
                r >= r_min && r <= r_max
            }
            Acceptance::Square {
                inner_half,
                outer_half,
            } => {
                let in_hole = x.abs() <= inner_half && y.abs() <= inner_half;
                let outside = x.abs() >= outer_half || y.abs() >= outer_half;
                !in_hole && !outside
            }
        }
    }

    fn check(&self, field: &str) -> Result<(), Kmu2Error> {
        let (inner, outer) = match *self {
            Acceptance::Annulus { r_min, r_max } => (r_min, r_max),
            Acceptance::Square {
                inner_half,
                outer_half,
            } => (inner_half, outer_half),
        };
        if inner < 0.0 {
            return Err(Kmu2Error::config(
                "kmu2_select.config_negative",
                field,
                "acceptance bounds cannot be negative",
            ));
        }
        Window::new(inner, outer).check(field)
    }
}

/// Coincidence veto: another candidate closer than `distance` and within
/// `time_window` of the associated one rejects the event. Both bounds are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoincidenceVeto {
    /// Time window (ns).
    pub time_window: f64,
    /// Transverse distance (mm).
    pub distance: f64,
}

/// Stage 3: spectrometer fit quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackQualityCuts {
    /// Maximum fit chi-square (inclusive).
    #[serde(default = "TrackQualityCuts::default_chi2_max")]
    pub chi2_max: Option<f64>,
    /// Minimum number of chambers.
    #[serde(default = "TrackQualityCuts::default_min_chambers")]
    pub min_chambers: Option<u32>,
}

impl TrackQualityCuts {
    fn default_chi2_max() -> Option<f64> {
        Some(20.0)
    }
    fn default_min_chambers() -> Option<u32> {
        Some(3)
    }
}

impl Default for TrackQualityCuts {
    fn default() -> Self {
        Self {
            chi2_max: Self::default_chi2_max(),
            min_chambers: Self::default_min_chambers(),
        }
    }
}

/// Stage 4 (multiplicity and sectors) and the upstream timing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamCuts {
    /// Minimum number of Cedar candidates.
    #[serde(default = "UpstreamCuts::default_min_candidates")]
    pub min_candidates: Option<usize>,
    /// Minimum sectors required of every candidate.
    #[serde(default = "UpstreamCuts::default_min_sectors")]
    pub min_sectors: Option<u32>,
    /// Offset added to `t_ref - t_cedar`.
    #[serde(default)]
    pub time_offset: f64,
    /// Maximum |t_ref - t_cedar + offset| of the best candidate.
    #[serde(default = "UpstreamCuts::default_time_window")]
    pub time_window: Option<f64>,
}

impl UpstreamCuts {
    fn default_min_candidates() -> Option<usize> {
        Some(1)
    }
    fn default_min_sectors() -> Option<u32> {
        Some(5)
    }
    fn default_time_window() -> Option<f64> {
        Some(100.0)
    }
}

impl Default for UpstreamCuts {
    fn default() -> Self {
        Self {
            min_candidates: Self::default_min_candidates(),
            min_sectors: Self::default_min_sectors(),
            time_offset: 0.0,
            time_window: Self::default_time_window(),
        }
    }
}

/// Stage 5: vertex quality. The vertex is computed even when both cuts are off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexCuts {
    /// Maximum closest distance of approach (mm).
    #[serde(default = "VertexCuts::default_cda_max")]
    pub cda_max: Option<f64>,
    /// Fiducial range of the vertex z (mm).
    #[serde(default = "VertexCuts::default_z_range")]
    pub z_range: Option<Window>,
}

impl VertexCuts {
    fn default_cda_max() -> Option<f64> {
        Some(40.0)
    }
    fn default_z_range() -> Option<Window> {
        Some(Window::new(105_000.0, 180_000.0))
    }
}

impl Default for VertexCuts {
    fn default() -> Self {
        Self {
            cda_max: Self::default_cda_max(),
            z_range: Self::default_z_range(),
        }
    }
}

/// Stage 6: missing mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicCuts {
    /// Mass assigned to the track.
    #[serde(default)]
    pub hypothesis: MassHypothesis,
    /// Maximum |m^2_miss| (GeV^2).
    #[serde(default = "KinematicCuts::default_mm2_tolerance")]
    pub mm2_tolerance: Option<f64>,
}

impl KinematicCuts {
    fn default_mm2_tolerance() -> Option<f64> {
        Some(0.01)
    }
}

impl Default for KinematicCuts {
    fn default() -> Self {
        Self {
            hypothesis: MassHypothesis::default(),
            mm2_tolerance: Self::default_mm2_tolerance(),
        }
    }
}

/// Stage 7: momentum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumCuts {
    /// Accepted fitted momentum (MeV).
    #[serde(default = "MomentumCuts::default_window")]
    pub window: Option<Window>,
    /// Maximum |p_fit - p_pattern| (MeV).
    #[serde(default = "MomentumCuts::default_max_fit_difference")]
    pub max_fit_difference: Option<f64>,
}

impl MomentumCuts {
    fn default_window() -> Option<Window> {
        Some(Window::new(10_000.0, 65_000.0))
    }
    fn default_max_fit_difference() -> Option<f64> {
        Some(20_000.0)
    }
}

impl Default for MomentumCuts {
    fn default() -> Self {
        Self {
            window: Self::default_window(),
            max_fit_difference: Self::default_max_fit_difference(),
        }
    }
}

/// Stage 8: association with the timing reference detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCuts {
    /// Detector providing the reference time.
    #[serde(default = "ReferenceCuts::default_kind")]
    pub kind: DetectorKind,
    /// Maximum track-candidate distance (mm).
    #[serde(default = "ReferenceCuts::default_max_distance")]
    pub max_distance: Option<f64>,
    /// Accepted radius of the extrapolated point (mm).
    #[serde(default = "ReferenceCuts::default_radius")]
    pub radius: Option<Window>,
    /// Accepted radius of the post-magnet track position (mm).
    #[serde(default = "ReferenceCuts::default_spectrometer_radius")]
    pub spectrometer_radius: Option<Window>,
    /// Veto on other reference candidates coincident with the associated one.
    #[serde(default = "ReferenceCuts::default_accidental")]
    pub accidental: Option<CoincidenceVeto>,
}

impl ReferenceCuts {
    fn default_kind() -> DetectorKind {
        DetectorKind::Chod
    }
    fn default_max_distance() -> Option<f64> {
        Some(80.0)
    }
    fn default_radius() -> Option<Window> {
        Some(Window::new(100.0, 1200.0))
    }
    fn default_spectrometer_radius() -> Option<Window> {
        Some(Window::new(75.0, 1200.0))
    }
    fn default_accidental() -> Option<CoincidenceVeto> {
        Some(CoincidenceVeto {
            time_window: 5.0,
            distance: 100.0,
        })
    }

    /// Reference association with only the match requirement.
    pub fn match_only() -> Self {
        Self {
            kind: Self::default_kind(),
            max_distance: None,
            radius: None,
            spectrometer_radius: None,
            accidental: None,
        }
    }
}

impl Default for ReferenceCuts {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            max_distance: Self::default_max_distance(),
            radius: Self::default_radius(),
            spectrometer_radius: Self::default_spectrometer_radius(),
            accidental: Self::default_accidental(),
        }
    }
}

/// Stage 9: one downstream detector. Cuts apply only when a match exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownstreamCuts {
    /// Detector evaluated by this stage.
    pub kind: DetectorKind,
    /// Reject the event when the detector has no candidate at all.
    #[serde(default)]
    pub required: bool,
    /// Acceptance of the extrapolated point.
    #[serde(default)]
    pub acceptance: Option<Acceptance>,
    /// Maximum track-candidate distance (mm).
    #[serde(default)]
    pub max_distance: Option<f64>,
    /// Maximum |dx| and |dy| between candidate and extrapolated point (mm).
    #[serde(default)]
    pub max_axis_offset: Option<f64>,
    /// Offset added to `t_ref - t_det`.
    #[serde(default)]
    pub time_offset: f64,
    /// Maximum |t_ref - t_det + offset|.
    #[serde(default)]
    pub time_window: Option<f64>,
    /// Minimum distance of the matched cluster to a dead cell (cm, LKr only).
    #[serde(default)]
    pub min_dead_cell_distance: Option<f64>,
}

impl DownstreamCuts {
    /// Stage for `kind` with no cuts and no timing offset.
    pub fn open(kind: DetectorKind) -> Self {
        Self {
            kind,
            required: false,
            acceptance: None,
            max_distance: None,
            max_axis_offset: None,
            time_offset: 0.0,
            time_window: None,
            min_dead_cell_distance: None,
        }
    }
}

/// Energy requirement of the final calorimeter stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CalorimeterMode {
    /// Every cluster must look like a minimum-ionizing deposit.
    MinimumIonizing {
        /// Accepted corrected cluster energy (GeV).
        energy: Window,
        /// Maximum number of cells per cluster.
        max_cells: u32,
    },
    /// The associated cluster must carry a large deposit.
    HighEnergyDeposit {
        /// Minimum corrected energy of the associated cluster (GeV).
        min_energy: f64,
    },
}

/// Requirement on in-time clusters well separated from the associated one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotonRequirement {
    /// Minimum number of photon-like clusters.
    pub min_count: usize,
    /// Time window with respect to the associated cluster (ns, strict).
    pub time_window: f64,
    /// Minimum separation from the associated cluster (mm, strict).
    pub min_distance: f64,
}

/// Stage 10: optional calorimeter filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalorimeterCuts {
    /// Energy correction applied before any energy comparison.
    #[serde(default)]
    pub correction: Option<EnergyCorrection>,
    /// Energy requirement.
    #[serde(default)]
    pub mode: Option<CalorimeterMode>,
    /// Veto on clusters coincident with the associated one.
    #[serde(default)]
    pub accidental: Option<CoincidenceVeto>,
    /// Photon requirement.
    #[serde(default)]
    pub photons: Option<PhotonRequirement>,
}

impl CalorimeterCuts {
    /// Returns true when the stage has nothing to check.
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.accidental.is_none() && self.photons.is_none()
    }
}

/// Named configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// K -> mu nu selection.
    #[default]
    Kmu2,
    /// Single pion track with photons in the calorimeter.
    OneTrack,
    /// Single track with tight timing on every downstream detector.
    OneTrackSelection,
}

impl Variant {
    /// Configuration for the variant.
    pub fn config(self) -> SelectionConfig {
        match self {
            Variant::Kmu2 => SelectionConfig::kmu2(),
            Variant::OneTrack => SelectionConfig::one_track(),
            Variant::OneTrackSelection => SelectionConfig::one_track_selection(),
        }
    }
}

/// Complete, read-only configuration of a selection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Physical constants and detector placement.
    #[serde(default)]
    pub geometry: GeometryTable,
    /// Charge required of the track.
    #[serde(default = "SelectionConfig::default_beam_charge")]
    pub beam_charge: i32,
    /// Track quality cuts.
    #[serde(default)]
    pub track: TrackQualityCuts,
    /// Upstream tagging and timing cuts.
    #[serde(default)]
    pub upstream: UpstreamCuts,
    /// Vertex cuts.
    #[serde(default)]
    pub vertex: VertexCuts,
    /// Missing-mass cuts.
    #[serde(default)]
    pub kinematics: KinematicCuts,
    /// Momentum cuts.
    #[serde(default)]
    pub momentum: MomentumCuts,
    /// Reference detector association.
    #[serde(default)]
    pub reference: ReferenceCuts,
    /// Downstream detectors, evaluated in list order.
    #[serde(default = "SelectionConfig::default_downstream")]
    pub downstream: Vec<DownstreamCuts>,
    /// Final calorimeter filter.
    #[serde(default = "SelectionConfig::default_calorimeter")]
    pub calorimeter: CalorimeterCuts,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::kmu2()
    }
}

impl SelectionConfig {
    fn default_beam_charge() -> i32 {
        1
    }

    /// Beam-hole and outer frame shared by the muon veto planes.
    const MUON_VETO_FRAME: Acceptance = Acceptance::Square {
        inner_half: 130.0,
        outer_half: 1100.0,
    };

    fn default_downstream() -> Vec<DownstreamCuts> {
        let muon_veto_frame = Self::MUON_VETO_FRAME;
        vec![
            DownstreamCuts {
                required: true,
                acceptance: Some(Acceptance::Annulus {
                    r_min: 150.0,
                    r_max: 1100.0,
                }),
                max_distance: Some(50.0),
                time_offset: 115.0,
                time_window: Some(100.0),
                min_dead_cell_distance: Some(2.0),
                ..DownstreamCuts::open(DetectorKind::Lkr)
            },
            DownstreamCuts {
                acceptance: Some(muon_veto_frame),
                max_distance: Some(100.0),
                max_axis_offset: Some(160.0),
                time_window: Some(100.0),
                ..DownstreamCuts::open(DetectorKind::Muv1)
            },
            DownstreamCuts {
                acceptance: Some(muon_veto_frame),
                max_distance: Some(150.0),
                max_axis_offset: Some(260.0),
                time_window: Some(100.0),
                ..DownstreamCuts::open(DetectorKind::Muv2)
            },
            DownstreamCuts {
                required: true,
                acceptance: Some(muon_veto_frame),
                max_axis_offset: Some(200.0),
                time_window: Some(100.0),
                ..DownstreamCuts::open(DetectorKind::Muv3)
            },
        ]
    }

    fn default_calorimeter() -> CalorimeterCuts {
        CalorimeterCuts {
            correction: Some(EnergyCorrection::default()),
            mode: Some(CalorimeterMode::MinimumIonizing {
                energy: Window::new(0.3, 0.8),
                max_cells: 5,
            }),
            accidental: Some(CoincidenceVeto {
                time_window: 5.0,
                distance: 200.0,
            }),
            photons: None,
        }
    }

    /// K -> mu nu selection: muon hypothesis, MIP calorimeter deposit,
    /// mandatory LKr and MUV3 associations. Also the default configuration.
    pub fn kmu2() -> Self {
        Self {
            geometry: GeometryTable::default(),
            beam_charge: Self::default_beam_charge(),
            track: TrackQualityCuts::default(),
            upstream: UpstreamCuts::default(),
            vertex: VertexCuts::default(),
            kinematics: KinematicCuts::default(),
            momentum: MomentumCuts::default(),
            reference: ReferenceCuts::default(),
            downstream: Self::default_downstream(),
            calorimeter: Self::default_calorimeter(),
        }
    }

    /// One-track analysis: pion hypothesis, no kinematic windows, a large
    /// calorimeter deposit plus two photon candidates.
    pub fn one_track() -> Self {
        Self {
            upstream: UpstreamCuts {
                time_window: None,
                ..UpstreamCuts::default()
            },
            kinematics: KinematicCuts {
                hypothesis: MassHypothesis::ChargedPion,
                mm2_tolerance: None,
            },
            momentum: MomentumCuts {
                window: None,
                max_fit_difference: None,
            },
            reference: ReferenceCuts::match_only(),
            downstream: vec![DownstreamCuts {
                time_offset: 115.0,
                ..DownstreamCuts::open(DetectorKind::Lkr)
            }],
            calorimeter: CalorimeterCuts {
                correction: Some(EnergyCorrection::default()),
                mode: Some(CalorimeterMode::HighEnergyDeposit { min_energy: 1.5 }),
                accidental: None,
                photons: Some(PhotonRequirement {
                    min_count: 2,
                    time_window: 10.0,
                    min_distance: 200.0,
                }),
            },
            ..Self::kmu2()
        }
    }

    /// One-track selection: no vertex or kinematic cuts, tight timing on
    /// every downstream detector.
    pub fn one_track_selection() -> Self {
        Self {
            upstream: UpstreamCuts {
                time_window: Some(3.0),
                ..UpstreamCuts::default()
            },
            vertex: VertexCuts {
                cda_max: None,
                z_range: None,
            },
            kinematics: KinematicCuts {
                hypothesis: MassHypothesis::ChargedPion,
                mm2_tolerance: None,
            },
            momentum: MomentumCuts {
                window: None,
                max_fit_difference: None,
            },
            reference: ReferenceCuts {
                spectrometer_radius: None,
                accidental: None,
                ..ReferenceCuts::default()
            },
            downstream: vec![
                DownstreamCuts {
                    acceptance: Some(Acceptance::Annulus {
                        r_min: 150.0,
                        r_max: 1100.0,
                    }),
                    max_distance: Some(50.0),
                    time_offset: 120.0,
                    time_window: Some(10.0),
                    min_dead_cell_distance: Some(2.0),
                    ..DownstreamCuts::open(DetectorKind::Lkr)
                },
                DownstreamCuts {
                    acceptance: Some(Self::MUON_VETO_FRAME),
                    max_axis_offset: Some(120.0),
                    time_window: Some(20.0),
                    ..DownstreamCuts::open(DetectorKind::Muv1)
                },
                DownstreamCuts {
                    acceptance: Some(Self::MUON_VETO_FRAME),
                    max_axis_offset: Some(240.0),
                    time_window: Some(20.0),
                    ..DownstreamCuts::open(DetectorKind::Muv2)
                },
                DownstreamCuts {
                    acceptance: Some(Self::MUON_VETO_FRAME),
                    max_axis_offset: Some(200.0),
                    time_window: Some(5.0),
                    ..DownstreamCuts::open(DetectorKind::Muv3)
                },
            ],
            calorimeter: CalorimeterCuts::default(),
            ..Self::kmu2()
        }
    }

    /// Checks every threshold. Called by the pipeline before any event is seen.
    pub fn validate(&self) -> Result<(), Kmu2Error> {
        if self.beam_charge != 1 && self.beam_charge != -1 {
            return Err(Kmu2Error::config(
                "kmu2_select.config_charge",
                "beam_charge",
                "beam charge must be +1 or -1",
            ));
        }
        self.validate_geometry()?;

        positive_opt("track.chi2_max", self.track.chi2_max)?;
        if self.track.min_chambers == Some(0) {
            return Err(Kmu2Error::config(
                "kmu2_select.config_non_positive",
                "track.min_chambers",
                "minimum chamber count must be positive",
            ));
        }
        positive_opt("upstream.time_window", self.upstream.time_window)?;
        finite("upstream.time_offset", self.upstream.time_offset)?;

        positive_opt("vertex.cda_max", self.vertex.cda_max)?;
        window_opt("vertex.z_range", self.vertex.z_range)?;
        positive_opt("kinematics.mm2_tolerance", self.kinematics.mm2_tolerance)?;
        window_opt("momentum.window", self.momentum.window)?;
        positive_opt("momentum.max_fit_difference", self.momentum.max_fit_difference)?;

        positive_opt("reference.max_distance", self.reference.max_distance)?;
        window_opt("reference.radius", self.reference.radius)?;
        window_opt("reference.spectrometer_radius", self.reference.spectrometer_radius)?;
        if let Some(veto) = &self.reference.accidental {
            veto_check("reference.accidental", veto)?;
        }

        let mut seen = BTreeSet::new();
        for cuts in &self.downstream {
            let prefix = format!("downstream.{}", cuts.kind);
            if cuts.kind == self.reference.kind {
                return Err(Kmu2Error::config(
                    "kmu2_select.config_reference_downstream",
                    &prefix,
                    "the reference detector cannot also be a downstream stage",
                ));
            }
            if !seen.insert(cuts.kind) {
                return Err(Kmu2Error::config(
                    "kmu2_select.config_duplicate_detector",
                    &prefix,
                    "downstream detector listed twice",
                ));
            }
            if let Some(acceptance) = &cuts.acceptance {
                acceptance.check(&format!("{prefix}.acceptance"))?;
            }
            positive_opt(&format!("{prefix}.max_distance"), cuts.max_distance)?;
            positive_opt(&format!("{prefix}.max_axis_offset"), cuts.max_axis_offset)?;
            positive_opt(&format!("{prefix}.time_window"), cuts.time_window)?;
            finite(&format!("{prefix}.time_offset"), cuts.time_offset)?;
            if cuts.min_dead_cell_distance.is_some() && cuts.kind != DetectorKind::Lkr {
                return Err(Kmu2Error::config(
                    "kmu2_select.config_dead_cell_kind",
                    &format!("{prefix}.min_dead_cell_distance"),
                    "dead-cell distance is only defined for the LKr",
                ));
            }
            positive_opt(
                &format!("{prefix}.min_dead_cell_distance"),
                cuts.min_dead_cell_distance,
            )?;
        }

        self.validate_calorimeter()
    }

    fn validate_geometry(&self) -> Result<(), Kmu2Error> {
        let masses = &self.geometry.masses;
        positive("geometry.masses.muon", masses.muon)?;
        positive("geometry.masses.charged_pion", masses.charged_pion)?;
        positive("geometry.masses.kaon", masses.kaon)?;
        positive("geometry.beam.momentum", self.geometry.beam.momentum)?;
        finite("geometry.beam.crossing_angle", self.geometry.beam.crossing_angle)?;
        finite("geometry.beam.origin_z", self.geometry.beam.origin_z)?;
        for kind in DetectorKind::ALL {
            finite(
                &format!("geometry.planes.{kind}"),
                self.geometry.plane_z(kind),
            )?;
        }
        Ok(())
    }

    fn validate_calorimeter(&self) -> Result<(), Kmu2Error> {
        let cuts = &self.calorimeter;
        if let Some(correction) = &cuts.correction {
            positive("calorimeter.correction.scale", correction.scale)?;
        }
        match cuts.mode {
            Some(CalorimeterMode::MinimumIonizing { energy, max_cells }) => {
                energy.check("calorimeter.mode.energy")?;
                if max_cells == 0 {
                    return Err(Kmu2Error::config(
                        "kmu2_select.config_non_positive",
                        "calorimeter.mode.max_cells",
                        "maximum cell count must be positive",
                    ));
                }
            }
            Some(CalorimeterMode::HighEnergyDeposit { min_energy }) => {
                positive("calorimeter.mode.min_energy", min_energy)?;
            }
            None => {}
        }
        if let Some(veto) = &cuts.accidental {
            veto_check("calorimeter.accidental", veto)?;
        }
        if let Some(photons) = &cuts.photons {
            if photons.min_count == 0 {
                return Err(Kmu2Error::config(
                    "kmu2_select.config_non_positive",
                    "calorimeter.photons.min_count",
                    "photon count must be positive",
                ));
            }
            positive("calorimeter.photons.time_window", photons.time_window)?;
            positive("calorimeter.photons.min_distance", photons.min_distance)?;
        }
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<(), Kmu2Error> {
    if value > 0.0 && value.is_finite() {
        return Ok(());
    }
    Err(Kmu2Error::Config(
        ErrorInfo::for_field("kmu2_select.config_non_positive", field, "threshold must be positive")
            .with_context("value", value.to_string()),
    ))
}

fn positive_opt(field: &str, value: Option<f64>) -> Result<(), Kmu2Error> {
    match value {
        Some(value) => positive(field, value),
        None => Ok(()),
    }
}

fn finite(field: &str, value: f64) -> Result<(), Kmu2Error> {
    if value.is_finite() {
        return Ok(());
    }
    Err(Kmu2Error::config(
        "kmu2_select.config_not_finite",
        field,
        "value must be finite",
    ))
}

fn window_opt(field: &str, window: Option<Window>) -> Result<(), Kmu2Error> {
    match window {
        Some(window) => window.check(field),
        None => Ok(()),
    }
}

fn veto_check(field: &str, veto: &CoincidenceVeto) -> Result<(), Kmu2Error> {
    positive(&format!("{field}.time_window"), veto.time_window)?;
    positive(&format!("{field}.distance"), veto.distance)
}

/// Reads, deserializes and validates a YAML selection configuration.
pub fn load_config(path: &Path) -> Result<SelectionConfig, Kmu2Error> {
    let bytes = fs::read(path).map_err(|err| {
        Kmu2Error::Serde(
            ErrorInfo::new("kmu2_select.config_read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let config: SelectionConfig = from_yaml_slice(&bytes)?;
    config.validate()?;
    debug!(
        path = %path.display(),
        downstream = config.downstream.len(),
        "loaded selection configuration"
    );
    Ok(config)
}
