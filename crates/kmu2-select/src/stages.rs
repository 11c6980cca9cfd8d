use kmu2_core::{DetectorKind, Event, GeometryTable, PlaneCandidate, Track};
use kmu2_geom::{
    beam_four_momentum, beam_momentum, beam_origin, closest_approach, extrapolate_downstream,
    missing_mass_squared, opening_angle, track_four_momentum, track_momentum, MEV2_TO_GEV2,
};

use crate::config::{
    CalorimeterCuts, CalorimeterMode, DownstreamCuts, KinematicCuts, MomentumCuts, ReferenceCuts,
    TrackQualityCuts, UpstreamCuts, VertexCuts,
};
use crate::matching::{match_detector, ClusterMatch};
use crate::outcome::{
    AssociationInfo, CalorimeterInfo, Cut, Diagnostics, KinematicsInfo, StageId, Verdict,
    VertexSolution,
};

/// Per-event scratch state threaded through the stages.
///
/// Diagnostics are only ever written by the stage that computes them, so
/// after a rejection nothing from later stages is present.
#[derive(Debug)]
pub struct EventContext<'a> {
    /// Event under evaluation.
    pub event: &'a Event,
    /// Constants shared by every event.
    pub geometry: &'a GeometryTable,
    /// Quantities accumulated so far.
    pub diagnostics: Diagnostics,
}

impl<'a> EventContext<'a> {
    /// Fresh context for one event.
    pub fn new(event: &'a Event, geometry: &'a GeometryTable) -> Self {
        Self {
            event,
            geometry,
            diagnostics: Diagnostics::new(event.burst_id),
        }
    }

    /// The selected track; only meaningful once the multiplicity stage passed.
    pub fn track(&self) -> Option<&'a Track> {
        match self.event.tracks.as_slice() {
            [track] => Some(track),
            _ => None,
        }
    }

    fn associate(&self, kind: DetectorKind, track: &Track) -> AssociationInfo {
        let point = extrapolate_downstream(track, self.geometry.plane_z(kind));
        let matched = match_detector(self.event, kind, &point);
        let (candidate_time, offset) = match matched.index {
            Some(index) => (
                self.event.candidate_time(kind, index),
                self.event
                    .candidate_position_mm(kind, index)
                    .map(|position| position - point.xy()),
            ),
            None => (None, None),
        };
        AssociationInfo {
            point,
            matched,
            candidate_time,
            offset,
            time_diff: None,
        }
    }
}

/// One named predicate of the selection.
pub trait Stage: Send + Sync {
    /// Stage identifier reported on rejection.
    fn id(&self) -> StageId;

    /// Evaluates the stage, recording whatever it computes.
    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict;
}

macro_rules! selected_track {
    ($ctx:expr, $stage:expr) => {
        match $ctx.track() {
            Some(track) => track,
            None => return Verdict::reject($stage, Cut::NoTrack),
        }
    };
}

fn exceeds(value: f64, limit: Option<f64>) -> bool {
    limit.map_or(false, |limit| value > limit)
}

/// Exactly one spectrometer track.
#[derive(Debug, Clone, Default)]
pub struct TrackMultiplicityStage;

impl Stage for TrackMultiplicityStage {
    fn id(&self) -> StageId {
        StageId::TrackMultiplicity
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        match ctx.event.tracks.as_slice() {
            [] => Verdict::reject(self.id(), Cut::NoTrack),
            [track] => {
                ctx.diagnostics.track = Some(track.clone());
                Verdict::Continue
            }
            _ => Verdict::reject(self.id(), Cut::MultipleTracks),
        }
    }
}

/// Track charge equals the beam charge.
#[derive(Debug, Clone)]
pub struct ChargeStage {
    beam_charge: i32,
}

impl ChargeStage {
    /// Stage requiring the given charge.
    pub fn new(beam_charge: i32) -> Self {
        Self { beam_charge }
    }
}

impl Stage for ChargeStage {
    fn id(&self) -> StageId {
        StageId::Charge
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        if track.charge != self.beam_charge {
            return Verdict::reject(self.id(), Cut::WrongCharge);
        }
        Verdict::Continue
    }
}

/// Fit chi-square and chamber count.
#[derive(Debug, Clone)]
pub struct TrackQualityStage {
    cuts: TrackQualityCuts,
}

impl TrackQualityStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: TrackQualityCuts) -> Self {
        Self { cuts }
    }
}

impl Stage for TrackQualityStage {
    fn id(&self) -> StageId {
        StageId::TrackQuality
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        if exceeds(track.chi2, self.cuts.chi2_max) {
            return Verdict::reject(self.id(), Cut::Chi2TooLarge);
        }
        if let Some(min) = self.cuts.min_chambers {
            if track.chambers < min {
                return Verdict::reject(self.id(), Cut::TooFewChambers);
            }
        }
        Verdict::Continue
    }
}

/// Upstream Cherenkov multiplicity; every candidate must have enough sectors.
#[derive(Debug, Clone)]
pub struct UpstreamTagStage {
    min_candidates: Option<usize>,
    min_sectors: Option<u32>,
}

impl UpstreamTagStage {
    /// Stage applying the multiplicity part of the upstream cuts.
    pub fn new(cuts: &UpstreamCuts) -> Self {
        Self {
            min_candidates: cuts.min_candidates,
            min_sectors: cuts.min_sectors,
        }
    }
}

impl Stage for UpstreamTagStage {
    fn id(&self) -> StageId {
        StageId::UpstreamTag
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let cedar = &ctx.event.cedar;
        if let Some(min) = self.min_candidates {
            if cedar.len() < min {
                return Verdict::reject(self.id(), Cut::TooFewUpstreamCandidates);
            }
        }
        if let Some(min) = self.min_sectors {
            if cedar.iter().any(|candidate| candidate.sectors < min) {
                return Verdict::reject(self.id(), Cut::TooFewSectors);
            }
        }
        Verdict::Continue
    }
}

/// Closest approach of the track to the nominal beam.
#[derive(Debug, Clone)]
pub struct VertexStage {
    cuts: VertexCuts,
}

impl VertexStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: VertexCuts) -> Self {
        Self { cuts }
    }
}

impl Stage for VertexStage {
    fn id(&self) -> StageId {
        StageId::Vertex
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        let beam = &ctx.geometry.beam;
        let solution = closest_approach(
            &track.position_before,
            &track_momentum(track),
            &beam_origin(beam),
            &beam_momentum(beam),
        );
        let Some(solution) = solution else {
            ctx.diagnostics.vertex = Some(VertexSolution::Degenerate);
            return Verdict::reject(self.id(), Cut::DegenerateVertex);
        };
        ctx.diagnostics.vertex = Some(VertexSolution::Found {
            position: solution.vertex,
            cda: solution.cda,
        });
        if exceeds(solution.cda, self.cuts.cda_max) {
            return Verdict::reject(self.id(), Cut::CdaTooLarge);
        }
        if let Some(range) = &self.cuts.z_range {
            if !range.contains(solution.vertex.z) {
                return Verdict::reject(self.id(), Cut::VertexOutsideFiducial);
            }
        }
        Verdict::Continue
    }
}

/// Squared missing mass under the configured track-mass hypothesis.
#[derive(Debug, Clone)]
pub struct MissingMassStage {
    cuts: KinematicCuts,
}

impl MissingMassStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: KinematicCuts) -> Self {
        Self { cuts }
    }
}

impl Stage for MissingMassStage {
    fn id(&self) -> StageId {
        StageId::MissingMass
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        let masses = &ctx.geometry.masses;
        let beam = beam_four_momentum(&ctx.geometry.beam, masses.kaon);
        let daughter = track_four_momentum(track, self.cuts.hypothesis.mass(masses));
        let mm2 = missing_mass_squared(&beam, &daughter) * MEV2_TO_GEV2;
        ctx.diagnostics.kinematics = Some(KinematicsInfo {
            mm2,
            theta: opening_angle(&daughter.momentum, &beam.momentum),
            track_momentum: daughter.momentum,
            beam_momentum: beam.momentum,
        });
        if exceeds(mm2.abs(), self.cuts.mm2_tolerance) {
            return Verdict::reject(self.id(), Cut::MissingMassOutOfWindow);
        }
        Verdict::Continue
    }
}

/// Momentum window and agreement with the pattern-recognition estimate.
#[derive(Debug, Clone)]
pub struct MomentumStage {
    cuts: MomentumCuts,
}

impl MomentumStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: MomentumCuts) -> Self {
        Self { cuts }
    }
}

impl Stage for MomentumStage {
    fn id(&self) -> StageId {
        StageId::Momentum
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        if let Some(window) = &self.cuts.window {
            if !window.contains(track.momentum) {
                return Verdict::reject(self.id(), Cut::MomentumOutOfWindow);
            }
        }
        let difference = (track.momentum - track.momentum_before_fit).abs();
        if exceeds(difference, self.cuts.max_fit_difference) {
            return Verdict::reject(self.id(), Cut::MomentumMismatch);
        }
        Verdict::Continue
    }
}

/// Association with the timing reference detector.
#[derive(Debug, Clone)]
pub struct ReferenceStage {
    cuts: ReferenceCuts,
}

impl ReferenceStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: ReferenceCuts) -> Self {
        Self { cuts }
    }

    fn has_accidental(&self, event: &Event, associated: usize) -> bool {
        let Some(veto) = &self.cuts.accidental else {
            return false;
        };
        let kind = self.cuts.kind;
        let (Some(position), Some(time)) = (
            event.candidate_position_mm(kind, associated),
            event.candidate_time(kind, associated),
        ) else {
            return false;
        };
        (0..event.candidate_count(kind))
            .filter(|&index| index != associated)
            .any(|index| {
                match (
                    event.candidate_position_mm(kind, index),
                    event.candidate_time(kind, index),
                ) {
                    (Some(other_position), Some(other_time)) => {
                        (time - other_time).abs() < veto.time_window
                            && (position - other_position).norm() < veto.distance
                    }
                    _ => false,
                }
            })
    }
}

impl Stage for ReferenceStage {
    fn id(&self) -> StageId {
        StageId::ReferenceAssociation
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        let info = ctx.associate(self.cuts.kind, track);
        let spectrometer_radius = track.position_after.x.hypot(track.position_after.y);
        ctx.diagnostics.reference = Some(info);
        ctx.diagnostics.spectrometer_radius = Some(spectrometer_radius);

        let (Some(index), Some(distance)) = (info.matched.index, info.matched.distance) else {
            return Verdict::reject(self.id(), Cut::NoReferenceMatch);
        };
        if exceeds(distance, self.cuts.max_distance) {
            return Verdict::reject(self.id(), Cut::ReferenceMatchTooFar);
        }
        if let Some(radius) = &self.cuts.radius {
            if !radius.contains(info.radius()) {
                return Verdict::reject(self.id(), Cut::ReferenceOutsideAcceptance);
            }
        }
        if let Some(radius) = &self.cuts.spectrometer_radius {
            if !radius.contains(spectrometer_radius) {
                return Verdict::reject(self.id(), Cut::SpectrometerOutsideAcceptance);
            }
        }
        if self.has_accidental(ctx.event, index) {
            return Verdict::reject(self.id(), Cut::ReferenceAccidental);
        }
        Verdict::Continue
    }
}

/// Upstream Cherenkov timing against the reference.
///
/// The candidate with the smallest signed `t_ref - t_cedar + offset` is
/// kept (first on ties) and its absolute value is cut on.
#[derive(Debug, Clone)]
pub struct UpstreamTimingStage {
    time_offset: f64,
    time_window: Option<f64>,
}

impl UpstreamTimingStage {
    /// Stage applying the timing part of the upstream cuts.
    pub fn new(cuts: &UpstreamCuts) -> Self {
        Self {
            time_offset: cuts.time_offset,
            time_window: cuts.time_window,
        }
    }
}

impl Stage for UpstreamTimingStage {
    fn id(&self) -> StageId {
        StageId::UpstreamTiming
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let Some(reference_time) = ctx.diagnostics.reference_time() else {
            return Verdict::Continue;
        };
        let mut best: Option<f64> = None;
        for candidate in &ctx.event.cedar {
            let dt = reference_time - candidate.time + self.time_offset;
            match best {
                Some(current) if dt >= current => {}
                _ => best = Some(dt),
            }
        }
        let Some(dt) = best else {
            return Verdict::Continue;
        };
        ctx.diagnostics.upstream_time_diff = Some(dt);
        if exceeds(dt.abs(), self.time_window) {
            return Verdict::reject(self.id(), Cut::UpstreamOutOfTime);
        }
        Verdict::Continue
    }
}

/// Association with one downstream detector.
#[derive(Debug, Clone)]
pub struct DownstreamStage {
    cuts: DownstreamCuts,
}

impl DownstreamStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: DownstreamCuts) -> Self {
        Self { cuts }
    }
}

impl Stage for DownstreamStage {
    fn id(&self) -> StageId {
        StageId::Downstream(self.cuts.kind)
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        let kind = self.cuts.kind;
        let mut info = ctx.associate(kind, track);
        info.time_diff = match (ctx.diagnostics.reference_time(), info.candidate_time) {
            (Some(reference), Some(time)) => Some(reference - time + self.cuts.time_offset),
            _ => None,
        };
        ctx.diagnostics.downstream.insert(kind, info);

        let (Some(index), Some(distance)) = (info.matched.index, info.matched.distance) else {
            if self.cuts.required {
                return Verdict::reject(self.id(), Cut::MissingMatch);
            }
            return Verdict::Continue;
        };
        if let Some(acceptance) = &self.cuts.acceptance {
            if !acceptance.accepts(info.point.x, info.point.y) {
                return Verdict::reject(self.id(), Cut::OutsideAcceptance);
            }
        }
        if exceeds(distance, self.cuts.max_distance) {
            return Verdict::reject(self.id(), Cut::MatchTooFar);
        }
        if let (Some(limit), Some(offset)) = (self.cuts.max_axis_offset, info.offset) {
            if offset.x.abs() > limit || offset.y.abs() > limit {
                return Verdict::reject(self.id(), Cut::AxisOffsetTooLarge);
            }
        }
        if let (Some(window), Some(dt)) = (self.cuts.time_window, info.time_diff) {
            if dt.abs() > window {
                return Verdict::reject(self.id(), Cut::OutOfTime);
            }
        }
        if let (Some(min), DetectorKind::Lkr) = (self.cuts.min_dead_cell_distance, kind) {
            let too_close = ctx
                .event
                .lkr
                .get(index)
                .map_or(false, |cluster| cluster.dead_cell_distance < min);
            if too_close {
                return Verdict::reject(self.id(), Cut::DeadCellTooClose);
            }
        }
        Verdict::Continue
    }
}

/// Final calorimeter filter on corrected cluster energies.
#[derive(Debug, Clone)]
pub struct CalorimeterStage {
    cuts: CalorimeterCuts,
}

impl CalorimeterStage {
    /// Stage applying the given cuts.
    pub fn new(cuts: CalorimeterCuts) -> Self {
        Self { cuts }
    }

    fn associated_cluster(ctx: &EventContext<'_>, track: &Track) -> ClusterMatch {
        if let Some(info) = ctx.diagnostics.downstream.get(&DetectorKind::Lkr) {
            return info.matched;
        }
        let point = extrapolate_downstream(track, ctx.geometry.plane_z(DetectorKind::Lkr));
        match_detector(ctx.event, DetectorKind::Lkr, &point)
    }

    /// Other clusters passing `keep` when compared with the associated one.
    fn count_relative<F>(event: &Event, associated: usize, keep: F) -> usize
    where
        F: Fn(f64, f64) -> bool,
    {
        let Some(reference) = event.lkr.get(associated) else {
            return 0;
        };
        let origin = reference.position_mm();
        event
            .lkr
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != associated)
            .filter(|(_, cluster)| {
                let dt = reference.time - cluster.time;
                let distance = (cluster.position_mm() - origin).norm();
                keep(dt, distance)
            })
            .count()
    }
}

impl Stage for CalorimeterStage {
    fn id(&self) -> StageId {
        StageId::CalorimeterQuality
    }

    fn evaluate(&self, ctx: &mut EventContext<'_>) -> Verdict {
        let track = selected_track!(ctx, self.id());
        let event = ctx.event;
        let clusters = &event.lkr;
        let energies = match &self.cuts.correction {
            Some(correction) => correction.apply_all(clusters),
            None => clusters.iter().map(|cluster| cluster.energy).collect(),
        };
        let associated = Self::associated_cluster(ctx, track).index;
        let photon_count = self.cuts.photons.map(|photons| match associated {
            Some(index) => Self::count_relative(event, index, |dt, distance| {
                dt.abs() < photons.time_window && distance > photons.min_distance
            }),
            None => 0,
        });
        let accidentals = match (&self.cuts.accidental, associated) {
            (Some(veto), Some(index)) => Self::count_relative(event, index, |dt, distance| {
                dt.abs() < veto.time_window && distance < veto.distance
            }),
            _ => 0,
        };
        ctx.diagnostics.calorimeter = Some(CalorimeterInfo {
            energies: energies.clone(),
            associated,
            photon_count,
        });

        match self.cuts.mode {
            Some(CalorimeterMode::MinimumIonizing { energy, max_cells }) => {
                for (cluster, corrected) in clusters.iter().zip(&energies) {
                    if !energy.contains(*corrected) {
                        return Verdict::reject(self.id(), Cut::ClusterEnergyOutOfWindow);
                    }
                    if cluster.cells > max_cells {
                        return Verdict::reject(self.id(), Cut::TooManyCells);
                    }
                }
            }
            Some(CalorimeterMode::HighEnergyDeposit { min_energy }) => {
                let deposit = associated.and_then(|index| energies.get(index)).copied();
                if deposit.map_or(true, |deposit| deposit < min_energy) {
                    return Verdict::reject(self.id(), Cut::InsufficientEnergy);
                }
            }
            None => {}
        }
        if accidentals > 0 {
            return Verdict::reject(self.id(), Cut::AccidentalCluster);
        }
        if let (Some(photons), Some(count)) = (&self.cuts.photons, photon_count) {
            if count < photons.min_count {
                return Verdict::reject(self.id(), Cut::TooFewPhotons);
            }
        }
        Verdict::Continue
    }
}
