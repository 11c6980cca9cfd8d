use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use kmu2_core::{DetectorKind, Kmu2Error};
use kmu2_select::config::{Acceptance, DownstreamCuts, Window};
use kmu2_select::hash::stable_hash_string;
use kmu2_select::io::parse_events;
use kmu2_select::serde::to_yaml_string;
use kmu2_select::{load_config, SelectionConfig, SelectionPipeline, Variant};

fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join(relative)
}

fn write_yaml(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write yaml");
    path
}

fn config_code(err: Kmu2Error) -> String {
    match err {
        Kmu2Error::Config(info) => info.code,
        other => panic!("expected a config error, got {other}"),
    }
}

#[test]
fn presets_survive_a_yaml_roundtrip() {
    let dir = tempfile::tempdir().expect("tmp dir");
    for variant in [Variant::Kmu2, Variant::OneTrack, Variant::OneTrackSelection] {
        let config = variant.config();
        config.validate().expect("preset is valid");
        let yaml = to_yaml_string(&config).expect("serialize");
        let path = write_yaml(&dir, "config.yaml", &yaml);
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, config);
        assert_eq!(
            stable_hash_string(&loaded).expect("hash"),
            stable_hash_string(&config).expect("hash")
        );
    }
}

#[derive(serde::Serialize)]
struct Point {
    y: u32,
    x: u32,
}

#[derive(serde::Serialize)]
struct Unordered {
    b: u32,
    a: Vec<Point>,
}

#[test]
fn hash_is_sha256_of_sorted_compact_json() {
    assert_eq!(
        stable_hash_string(&serde_json::json!({})).expect("hash"),
        "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
    );
    // hashes {"a":[{"x":1,"y":2}],"b":1}
    let value = Unordered {
        b: 1,
        a: vec![Point { y: 2, x: 1 }],
    };
    assert_eq!(
        stable_hash_string(&value).expect("hash"),
        "644408bd76f399b8ede2a3cef08e70e1d485d59bfb7321c8a7e776a23b6aee0c"
    );
}

#[test]
fn presets_hash_differently() {
    let kmu2 = stable_hash_string(&SelectionConfig::kmu2()).expect("hash");
    let one_track = stable_hash_string(&SelectionConfig::one_track()).expect("hash");
    assert_eq!(kmu2.len(), 64);
    assert_ne!(kmu2, one_track);
    assert_eq!(kmu2, stable_hash_string(&SelectionConfig::default()).expect("hash"));
}

#[test]
fn partial_yaml_fills_in_defaults() {
    let config = load_config(&fixture_path("configs/kmu2_tight.yaml")).expect("load");
    assert_eq!(config.vertex.cda_max, Some(25.0));
    assert_eq!(config.vertex.z_range, Some(Window::new(110_000.0, 165_000.0)));
    assert_eq!(config.upstream.time_window, Some(2.0));
    assert_eq!(config.upstream.min_sectors, Some(5));
    assert_eq!(config.downstream, SelectionConfig::kmu2().downstream);
    assert_eq!(config.calorimeter, SelectionConfig::kmu2().calorimeter);

    let one_track = load_config(&fixture_path("configs/one_track.yaml")).expect("load");
    assert_eq!(one_track, SelectionConfig::one_track());
}

#[test]
fn negative_cda_is_rejected() {
    let mut config = SelectionConfig::kmu2();
    config.vertex.cda_max = Some(-1.0);
    let err = SelectionPipeline::new(config).expect_err("must fail");
    assert_eq!(err.info().field.as_deref(), Some("vertex.cda_max"));
    assert_eq!(config_code(err), "kmu2_select.config_non_positive");
}

#[test]
fn inverted_window_is_rejected() {
    let mut config = SelectionConfig::kmu2();
    config.momentum.window = Some(Window::new(65_000.0, 10_000.0));
    assert_eq!(
        config_code(config.validate().expect_err("must fail")),
        "kmu2_select.config_range"
    );

    let mut config = SelectionConfig::kmu2();
    config.downstream[0].acceptance = Some(Acceptance::Annulus {
        r_min: -5.0,
        r_max: 1100.0,
    });
    assert_eq!(
        config_code(config.validate().expect_err("must fail")),
        "kmu2_select.config_negative"
    );
}

#[test]
fn downstream_list_is_checked() {
    let mut config = SelectionConfig::kmu2();
    config.downstream.push(DownstreamCuts::open(DetectorKind::Muv3));
    assert_eq!(
        config_code(config.validate().expect_err("duplicate")),
        "kmu2_select.config_duplicate_detector"
    );

    let mut config = SelectionConfig::kmu2();
    config.downstream.push(DownstreamCuts::open(DetectorKind::Chod));
    assert_eq!(
        config_code(config.validate().expect_err("reference downstream")),
        "kmu2_select.config_reference_downstream"
    );

    let mut config = SelectionConfig::kmu2();
    config.downstream[1].min_dead_cell_distance = Some(2.0);
    assert_eq!(
        config_code(config.validate().expect_err("dead cell on muv1")),
        "kmu2_select.config_dead_cell_kind"
    );
}

#[test]
fn beam_charge_must_be_unit() {
    let mut config = SelectionConfig::kmu2();
    config.beam_charge = 0;
    assert_eq!(
        config_code(config.validate().expect_err("zero charge")),
        "kmu2_select.config_charge"
    );
    config.beam_charge = -1;
    config.validate().expect("negative beam is fine");
}

#[test]
fn invalid_yaml_files_fail_to_load() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let unknown = write_yaml(&dir, "unknown.yaml", "downstream:\n  - kind: rich\n");
    assert!(matches!(load_config(&unknown), Err(Kmu2Error::Serde(_))));

    let invalid = write_yaml(&dir, "invalid.yaml", "vertex:\n  cda_max: 0.0\n");
    let err = load_config(&invalid).expect_err("zero cda");
    assert_eq!(config_code(err), "kmu2_select.config_non_positive");

    let missing = dir.path().join("missing.yaml");
    match load_config(&missing) {
        Err(Kmu2Error::Serde(info)) => {
            assert_eq!(info.code, "kmu2_select.config_read");
            assert!(info.context.contains_key("path"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn event_decode_errors_name_the_line() {
    let input = "{\"burst_id\": 7}\n\n{\"burst_id\": \"x\"}\n";
    let err = parse_events(Cursor::new(input)).expect_err("bad second event");
    match err {
        Kmu2Error::Event(info) => {
            assert_eq!(info.code, "kmu2_select.event_decode");
            assert_eq!(info.context.get("line").map(String::as_str), Some("3"));
            assert!(info.hint.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }

    let events = parse_events(Cursor::new("{\"burst_id\": 7}\n\n{}\n")).expect("parse");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].burst_id, 7);
    assert!(events[1].tracks.is_empty());
}
