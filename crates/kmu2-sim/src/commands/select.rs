use std::error::Error;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use kmu2_select::hash::stable_hash_string;
use kmu2_select::io::read_events;
use kmu2_select::sink::DiagnosticsSink;
use kmu2_select::{CutFlow, HistogramBook, SelectionOutcome, SelectionPipeline};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::ConfigSource;
use crate::write_json;

#[derive(Args, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub source: ConfigSource,
    /// JSON-lines file with one event per line.
    #[arg(long)]
    pub events: PathBuf,
    /// Output directory for the selection artefacts.
    #[arg(long)]
    pub out: PathBuf,
    /// Evaluate events on the rayon thread pool.
    #[arg(long)]
    pub parallel: bool,
    /// Fill histograms from every event, not only accepted ones.
    #[arg(long)]
    pub all_events: bool,
}

#[derive(Serialize)]
struct OutcomeLine<'a> {
    index: usize,
    #[serde(flatten)]
    outcome: &'a SelectionOutcome,
}

pub fn run(args: &SelectArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = args.source.resolve()?;
    let config_hash = stable_hash_string(&config)?;
    let pipeline = SelectionPipeline::new(config)?;
    let events = read_events(&args.events)?;
    debug!(events = events.len(), parallel = args.parallel, "events loaded");

    // par_iter().collect() keeps input order
    let outcomes: Vec<SelectionOutcome> = if args.parallel {
        events.par_iter().map(|event| pipeline.run(event)).collect()
    } else {
        events.iter().map(|event| pipeline.run(event)).collect()
    };

    let stage_ids = pipeline.stage_ids();
    let mut cutflow = CutFlow::new(&stage_ids);
    let mut histograms = HistogramBook::standard(!args.all_events);
    for outcome in &outcomes {
        cutflow.record(outcome);
        histograms.record(outcome);
    }

    write_outcomes(&args.out.join("outcomes.jsonl"), &outcomes)?;
    write_accepted_csv(&args.out.join("accepted.csv"), &outcomes)?;
    write_json(args.out.join("cutflow.json"), &cutflow)?;
    write_json(args.out.join("histograms.json"), &histograms)?;

    let report = json!({
        "config": args.source.describe(),
        "config_hash": config_hash,
        "events_path": args.events.display().to_string(),
        "events": cutflow.events,
        "accepted": cutflow.accepted,
        "stages": stage_ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    write_json(args.out.join("report.json"), &report)?;

    info!(
        events = cutflow.events,
        accepted = cutflow.accepted,
        out = %args.out.display(),
        "selection finished"
    );
    Ok(())
}

fn write_outcomes(path: &Path, outcomes: &[SelectionOutcome]) -> Result<(), Box<dyn Error>> {
    let mut file = BufWriter::new(fs::File::create(path)?);
    for (index, outcome) in outcomes.iter().enumerate() {
        serde_json::to_writer(&mut file, &OutcomeLine { index, outcome })?;
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}

fn scalar_field(outcome: &SelectionOutcome, name: &str) -> String {
    outcome
        .diagnostics
        .scalars()
        .get(name)
        .map(|value| format!("{value:.6}"))
        .unwrap_or_default()
}

const ACCEPTED_COLUMNS: [&str; 8] = [
    "track.p",
    "kinematics.mm2",
    "kinematics.theta",
    "vertex.z",
    "vertex.cda",
    "upstream.time_diff",
    "lkr.time_diff",
    "muv3.time_diff",
];

fn write_accepted_csv(path: &Path, outcomes: &[SelectionOutcome]) -> Result<(), Box<dyn Error>> {
    let mut file = csv::Writer::from_path(path)?;
    let mut header = vec!["index".to_string(), "burst_id".to_string()];
    header.extend(ACCEPTED_COLUMNS.iter().map(|name| name.to_string()));
    file.write_record(&header)?;
    for (index, outcome) in outcomes.iter().enumerate() {
        if !outcome.accepted {
            continue;
        }
        let mut row = vec![index.to_string(), outcome.diagnostics.burst_id.to_string()];
        row.extend(ACCEPTED_COLUMNS.iter().map(|name| scalar_field(outcome, name)));
        file.write_record(&row)?;
    }
    file.flush()?;
    Ok(())
}
