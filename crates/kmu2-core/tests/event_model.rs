use kmu2_core::{DetectorKind, Event, GeometryTable, MassHypothesis, PlaneCandidate};

const EVENT_JSON: &str = r#"{
    "burst_id": 17,
    "tracks": [{
        "charge": 1,
        "momentum": 30000.0,
        "momentum_before_fit": 29500.0,
        "slope_before": [0.001, -0.0005],
        "slope_after": [0.002, 0.001],
        "position_before": [10.0, -5.0, 183508.0],
        "position_after": [300.0, 200.0, 219000.0],
        "chambers": 4,
        "chi2": 5.0
    }],
    "cedar": [{"time": 0.4, "sectors": 6}],
    "chod": [{"position": [34.0, 22.0], "time": 0.0}],
    "lkr": [{"position": [34.5, 22.2], "time": 115.0, "energy": 0.5, "cells": 3}],
    "muv3": [{"position": [352.0, 228.0], "time": 0.5, "tile_id": 101}]
}"#;

#[test]
fn event_decodes_with_missing_detectors_defaulted() {
    let event: Event = serde_json::from_str(EVENT_JSON).expect("decode event");
    assert_eq!(event.burst_id, 17);
    assert_eq!(event.tracks.len(), 1);
    assert!(event.muv1.is_empty());
    assert!(event.muv2.is_empty());
    assert_eq!(event.candidate_count(DetectorKind::Muv3), 1);
    assert_eq!(event.lkr[0].dead_cell_distance, f64::MAX);
}

#[test]
fn centimetre_detectors_report_millimetres() {
    let event: Event = serde_json::from_str(EVENT_JSON).expect("decode event");
    let chod = event.chod[0].position_mm();
    assert_eq!(chod.x, 340.0);
    assert_eq!(chod.y, 220.0);
    let lkr = event
        .candidate_position_mm(DetectorKind::Lkr, 0)
        .expect("lkr candidate");
    assert_eq!(lkr.x, 345.0);
    let muv3 = event
        .candidate_position_mm(DetectorKind::Muv3, 0)
        .expect("muv3 candidate");
    assert_eq!(muv3.x, 352.0);
    assert!(event.candidate_position_mm(DetectorKind::Muv3, 1).is_none());
    assert_eq!(DetectorKind::Chod.unit_scale(), 10.0);
    assert_eq!(DetectorKind::Muv1.unit_scale(), 1.0);
}

#[test]
fn geometry_defaults_follow_the_beam_line() {
    let table = GeometryTable::default();
    let mut previous = table.beam.origin_z;
    for kind in DetectorKind::ALL {
        let z = table.plane_z(kind);
        assert!(z > previous, "{kind} must sit downstream of the previous plane");
        previous = z;
    }
    assert_eq!(MassHypothesis::Muon.mass(&table.masses), 105.658_37);
    assert_eq!(MassHypothesis::ChargedPion.mass(&table.masses), 139.57);
}
