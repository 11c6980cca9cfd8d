use std::fs;
use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join(relative)
}

fn kmu2_sim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_kmu2-sim"))
}

fn read_json(path: PathBuf) -> Value {
    let bytes = fs::read(&path).expect("read artefact");
    serde_json::from_slice(&bytes).expect("parse artefact")
}

#[test]
fn select_writes_every_artefact() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let out = temp.path().join("run");
    let status = kmu2_sim()
        .arg("select")
        .arg("--events")
        .arg(fixture_path("data/sample_events.jsonl"))
        .arg("--out")
        .arg(&out)
        .status()
        .expect("spawn kmu2-sim");
    assert!(status.success());

    let report = read_json(out.join("report.json"));
    assert_eq!(report["events"], 8);
    assert_eq!(report["accepted"], 3);
    assert_eq!(report["config"], "preset:kmu2");
    assert_eq!(report["config_hash"].as_str().map(str::len), Some(64));

    let cutflow = read_json(out.join("cutflow.json"));
    let stages = cutflow["stages"].as_array().expect("stages");
    assert_eq!(stages[0]["stage"], "track_multiplicity");
    assert_eq!(stages[0]["entered"], 8);

    let lines = fs::read_to_string(out.join("outcomes.jsonl")).expect("outcomes");
    let outcomes: Vec<Value> = lines
        .lines()
        .map(|line| serde_json::from_str(line).expect("outcome line"))
        .collect();
    assert_eq!(outcomes.len(), 8);
    assert_eq!(outcomes[0]["accepted"], true);
    assert_eq!(outcomes[1]["rejection"]["cut"], "no_reference_match");
    assert_eq!(outcomes[3]["rejection"]["stage"], "charge");
    assert_eq!(outcomes[6]["rejection"]["cut"], "missing_match");

    let csv = fs::read_to_string(out.join("accepted.csv")).expect("csv");
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("index,burst_id,track.p"));
    assert!(rows[1].starts_with("0,1,"));

    let histograms = read_json(out.join("histograms.json"));
    assert_eq!(histograms["accepted_only"], true);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let temp = tempfile::tempdir().expect("tmp dir");
    for (name, parallel) in [("seq", false), ("par", true)] {
        let mut command = kmu2_sim();
        command
            .arg("select")
            .arg("--events")
            .arg(fixture_path("data/sample_events.jsonl"))
            .arg("--out")
            .arg(temp.path().join(name));
        if parallel {
            command.arg("--parallel");
        }
        assert!(command.status().expect("spawn kmu2-sim").success());
    }
    for artefact in ["outcomes.jsonl", "cutflow.json", "accepted.csv"] {
        let seq = fs::read(temp.path().join("seq").join(artefact)).expect("seq artefact");
        let par = fs::read(temp.path().join("par").join(artefact)).expect("par artefact");
        assert_eq!(seq, par, "{artefact} differs");
    }
}

#[test]
fn printed_preset_validates() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let path = temp.path().join("one_track.yaml");
    let status = kmu2_sim()
        .args(["config", "--variant", "one-track", "--out"])
        .arg(&path)
        .status()
        .expect("spawn kmu2-sim");
    assert!(status.success());

    let output = kmu2_sim()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .output()
        .expect("spawn kmu2-sim");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.starts_with("config_hash: "));
    assert!(stdout.contains("downstream_lkr"));
    assert!(stdout.contains("calorimeter_quality"));
}

#[test]
fn invalid_configuration_fails() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let path = temp.path().join("bad.yaml");
    fs::write(&path, "vertex:\n  cda_max: -3.0\n").expect("write config");
    let output = kmu2_sim()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .output()
        .expect("spawn kmu2-sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kmu2_select.config_non_positive"));
}
