use kmu2_core::{DetectorKind, Event, PlaneCandidate};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Nearest candidate of one detector to an extrapolated track point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMatch {
    /// Detector the candidates belong to.
    pub kind: DetectorKind,
    /// Index of the closest candidate, `None` when the list was empty.
    pub index: Option<usize>,
    /// Transverse distance in millimetres, `None` when the list was empty.
    pub distance: Option<f64>,
}

impl ClusterMatch {
    /// Match result for an empty candidate list.
    pub fn none(kind: DetectorKind) -> Self {
        Self {
            kind,
            index: None,
            distance: None,
        }
    }

    /// Returns true when a candidate was found.
    pub fn is_match(&self) -> bool {
        self.index.is_some()
    }
}

/// Finds the candidate closest to `point` in the transverse plane.
///
/// Candidate positions are converted to millimetres before the comparison.
/// The first occurrence wins on ties.
pub fn find_closest<C: PlaneCandidate>(
    kind: DetectorKind,
    candidates: &[C],
    point: &Vector3<f64>,
) -> ClusterMatch {
    let target = point.xy();
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let distance = (candidate.position_mm() - target).norm();
        match best {
            Some((_, current)) if distance >= current => {}
            _ => best = Some((index, distance)),
        }
    }
    match best {
        Some((index, distance)) => ClusterMatch {
            kind,
            index: Some(index),
            distance: Some(distance),
        },
        None => ClusterMatch::none(kind),
    }
}

/// Runs [`find_closest`] on the candidate list of the given detector.
pub fn match_detector(event: &Event, kind: DetectorKind, point: &Vector3<f64>) -> ClusterMatch {
    match kind {
        DetectorKind::Lkr => find_closest(kind, &event.lkr, point),
        DetectorKind::Muv1 => find_closest(kind, &event.muv1, point),
        DetectorKind::Muv2 => find_closest(kind, &event.muv2, point),
        DetectorKind::Muv3 => find_closest(kind, &event.muv3, point),
        DetectorKind::Chod => find_closest(kind, &event.chod, point),
    }
}
