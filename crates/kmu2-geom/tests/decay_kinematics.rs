use kmu2_core::{GeometryTable, Track};
use kmu2_geom::{
    beam_four_momentum, beam_momentum, beam_origin, closest_approach, extrapolate_upstream,
    missing_mass_squared, opening_angle, track_four_momentum, track_momentum, MEV2_TO_GEV2,
};
use nalgebra::{Vector2, Vector3};

const TRACK_MOMENTUM: f64 = 30_000.0;

/// Muon track whose opening angle closes the K -> mu nu kinematics exactly.
fn two_body_track(table: &GeometryTable) -> Track {
    let kaon = beam_four_momentum(&table.beam, table.masses.kaon);
    let beam_p = kaon.momentum.norm();
    let muon_mass = table.masses.muon;
    let muon_energy = (TRACK_MOMENTUM * TRACK_MOMENTUM + muon_mass * muon_mass).sqrt();
    let cos_theta = (2.0 * kaon.energy * muon_energy
        - table.masses.kaon * table.masses.kaon
        - muon_mass * muon_mass)
        / (2.0 * beam_p * TRACK_MOMENTUM);
    let theta = cos_theta.acos();
    let phi = table.beam.crossing_angle.atan() + theta;
    Track {
        charge: 1,
        momentum: TRACK_MOMENTUM,
        momentum_before_fit: TRACK_MOMENTUM,
        slope_before: Vector2::new(phi.tan(), 0.0),
        slope_after: Vector2::new(phi.tan(), 0.0),
        position_before: Vector3::new(0.0, 0.0, 183_508.0),
        position_after: Vector3::new(0.0, 0.0, 219_000.0),
        chambers: 4,
        chi2: 1.0,
    }
}

#[test]
fn two_body_decay_has_vanishing_missing_mass() {
    let table = GeometryTable::default();
    let track = two_body_track(&table);
    let kaon = beam_four_momentum(&table.beam, table.masses.kaon);
    let muon = track_four_momentum(&track, table.masses.muon);
    let mm2 = missing_mass_squared(&kaon, &muon) * MEV2_TO_GEV2;
    assert!(mm2.abs() < 1e-6, "mm2 = {mm2}");

    let pion = track_four_momentum(&track, table.masses.charged_pion);
    let mm2_pion = missing_mass_squared(&kaon, &pion) * MEV2_TO_GEV2;
    assert!(mm2_pion < -1e-3, "pion hypothesis shifts mm2 negative: {mm2_pion}");

    let theta = opening_angle(&kaon.momentum, &muon.momentum);
    assert!(theta > 0.0 && theta < 0.05);
}

#[test]
fn track_from_known_vertex_reconstructs_it() {
    let table = GeometryTable::default();
    let origin = beam_origin(&table.beam);
    let beam_dir = beam_momentum(&table.beam);
    let true_z = 150_000.0;
    let on_beam = origin + beam_dir * ((true_z - origin.z) / beam_dir.z);

    let mut track = two_body_track(&table);
    track.position_before = Vector3::new(on_beam.x, on_beam.y + 10.0, true_z);
    let reference = extrapolate_upstream(&track, 183_508.0);
    track.position_before = reference;

    let ca = closest_approach(
        &track.position_before,
        &track_momentum(&track),
        &origin,
        &beam_dir,
    )
    .expect("track and beam are not parallel");
    assert!((ca.cda - 10.0).abs() < 1e-3, "cda = {}", ca.cda);
    assert!((ca.vertex.z - true_z).abs() < 1.0, "z = {}", ca.vertex.z);
}
