mod common;

use common::muv3_candidate;
use kmu2_core::{ChodCandidate, DetectorKind, Event, Muv3Candidate};
use kmu2_select::{find_closest, match_detector, ClusterMatch};
use nalgebra::{Vector2, Vector3};
use proptest::prelude::*;

#[test]
fn closest_muv3_candidate_wins_and_ties_keep_the_first() {
    let candidates: Vec<Muv3Candidate> = [
        (100.0, 0.0),
        (0.0, -70.0),
        (50.0, 0.0),
        (60.0, 60.0),
        (-80.0, 0.0),
        (0.0, 50.0),
    ]
    .into_iter()
    .map(|(x, y)| muv3_candidate(x, y, 0.0))
    .collect();
    let found = find_closest(DetectorKind::Muv3, &candidates, &Vector3::zeros());
    assert_eq!(found.index, Some(2));
    assert_eq!(found.distance, Some(50.0));
    assert!(found.is_match());
}

#[test]
fn empty_list_has_no_match() {
    let none: Vec<Muv3Candidate> = Vec::new();
    let found = find_closest(DetectorKind::Muv3, &none, &Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(found, ClusterMatch::none(DetectorKind::Muv3));
    assert!(!found.is_match());
}

#[test]
fn hodoscope_positions_are_converted_to_millimetres() {
    let event = Event {
        chod: vec![ChodCandidate {
            position: Vector2::new(5.0, 0.0),
            time: 0.0,
        }],
        ..Event::default()
    };
    let found = match_detector(&event, DetectorKind::Chod, &Vector3::new(50.0, 0.0, 238_960.0));
    assert_eq!(found.index, Some(0));
    assert_eq!(found.distance, Some(0.0));
}

#[test]
fn plane_z_is_ignored() {
    let candidates = vec![muv3_candidate(3.0, 4.0, 0.0)];
    let near = find_closest(DetectorKind::Muv3, &candidates, &Vector3::new(0.0, 0.0, 0.0));
    let far = find_closest(DetectorKind::Muv3, &candidates, &Vector3::new(0.0, 0.0, 1.0e6));
    assert_eq!(near, far);
    assert_eq!(near.distance, Some(5.0));
}

fn candidate_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-1500.0f64..1500.0, -1500.0f64..1500.0), 1..16)
}

proptest! {
    #[test]
    fn match_is_no_farther_than_any_candidate(
        positions in candidate_strategy(),
        px in -1200.0f64..1200.0,
        py in -1200.0f64..1200.0,
    ) {
        let candidates: Vec<Muv3Candidate> = positions
            .iter()
            .map(|&(x, y)| muv3_candidate(x, y, 0.0))
            .collect();
        let point = Vector3::new(px, py, 246_850.0);
        let found = find_closest(DetectorKind::Muv3, &candidates, &point);
        let index = found.index.expect("non-empty list always matches");
        let distance = found.distance.expect("distance present with index");
        prop_assert!(index < positions.len());
        for &(x, y) in &positions {
            prop_assert!(distance <= (x - px).hypot(y - py) + 1e-9);
        }
    }
}
