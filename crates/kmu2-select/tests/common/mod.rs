#![allow(dead_code)]

use kmu2_core::{
    CedarCandidate, ChodCandidate, Event, GeometryTable, LkrCluster, Muv3Candidate, MuvCluster,
    Track,
};
use nalgebra::{Vector2, Vector3};

pub const VERTEX_Z: f64 = 150_000.0;
pub const TRACK_P: f64 = 30_000.0;
pub const STRAW1_Z: f64 = 183_508.0;

/// Opening angle for which a muon of `TRACK_P` closes K -> mu nu exactly.
fn kmu2_theta(table: &GeometryTable) -> f64 {
    let beam_p = table.beam.momentum;
    let kaon_mass = table.masses.kaon;
    let muon_mass = table.masses.muon;
    let kaon_energy = (beam_p * beam_p + kaon_mass * kaon_mass).sqrt();
    let muon_energy = (TRACK_P * TRACK_P + muon_mass * muon_mass).sqrt();
    let cos_theta = (2.0 * kaon_energy * muon_energy - kaon_mass * kaon_mass - muon_mass * muon_mass)
        / (2.0 * beam_p * TRACK_P);
    cos_theta.acos()
}

/// Positive muon track leaving the beam line at `VERTEX_Z`, displaced by
/// `y_offset` in y so that the closest distance of approach equals it.
pub fn kmu2_track(table: &GeometryTable, y_offset: f64) -> Track {
    let slope_x = (table.beam.crossing_angle.atan() + kmu2_theta(table)).tan();
    let beam_x = table.beam.crossing_angle * (VERTEX_Z - table.beam.origin_z);
    Track {
        charge: 1,
        momentum: TRACK_P,
        momentum_before_fit: TRACK_P,
        slope_before: Vector2::new(slope_x, 0.0),
        slope_after: Vector2::new(0.002, 0.001),
        position_before: Vector3::new(
            beam_x + slope_x * (STRAW1_Z - VERTEX_Z),
            y_offset,
            STRAW1_Z,
        ),
        position_after: Vector3::new(300.0, 200.0, 219_000.0),
        chambers: 4,
        chi2: 5.0,
    }
}

pub fn lkr_cluster(x_cm: f64, y_cm: f64, time: f64, energy: f64) -> LkrCluster {
    LkrCluster {
        position: Vector2::new(x_cm, y_cm),
        time,
        energy,
        seed_energy: energy * 0.8,
        cells: 3,
        dead_cell_distance: 10.0,
    }
}

pub fn muv_cluster(x: f64, y: f64, time: f64) -> MuvCluster {
    MuvCluster {
        position: Vector2::new(x, y),
        time,
        energy: 0.2,
        horizontal_channel: 0,
        vertical_channel: 0,
    }
}

pub fn muv3_candidate(x: f64, y: f64, time: f64) -> Muv3Candidate {
    Muv3Candidate {
        position: Vector2::new(x, y),
        time,
        tile_id: 0,
    }
}

/// Track and one good Cedar candidate, no downstream candidates at all.
pub fn bare_event() -> Event {
    let table = GeometryTable::default();
    Event {
        burst_id: 42,
        tracks: vec![kmu2_track(&table, 10.0)],
        cedar: vec![CedarCandidate {
            time: 0.0,
            sectors: 6,
        }],
        ..Event::default()
    }
}

/// Event accepted by the default K -> mu nu selection.
///
/// Candidates sit within a millimetre of the extrapolated track on every
/// plane; the LKr time compensates the +115 ns offset.
pub fn kmu2_event() -> Event {
    Event {
        chod: vec![ChodCandidate {
            position: Vector2::new(34.0, 22.0),
            time: 0.0,
        }],
        lkr: vec![lkr_cluster(34.5, 22.25, 115.0, 0.5)],
        muv1: vec![muv_cluster(351.0, 225.0, 0.0)],
        muv2: vec![muv_cluster(352.0, 226.0, 0.0)],
        muv3: vec![muv3_candidate(356.0, 228.0, 0.0)],
        ..bare_event()
    }
}
