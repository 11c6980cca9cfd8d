use std::collections::BTreeMap;

use kmu2_core::errors::{ErrorInfo, Kmu2Error};
use serde::{Deserialize, Serialize};

use crate::outcome::{Cut, SelectionOutcome, StageId};

/// Receiver of per-event outcomes.
pub trait DiagnosticsSink {
    /// Records one outcome.
    fn record(&mut self, outcome: &SelectionOutcome);
}

fn merge_error(code: &str, message: &str) -> Kmu2Error {
    Kmu2Error::Serde(ErrorInfo::new(code, message))
}

/// Counters for one stage of the cut flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCount {
    /// Stage the counters belong to.
    pub stage: StageId,
    /// Events that reached the stage.
    pub entered: u64,
    /// Events rejected by the stage.
    pub rejected: u64,
    /// Rejections broken down by cut.
    #[serde(default)]
    pub cuts: BTreeMap<Cut, u64>,
}

/// Events entering and leaving every stage, in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutFlow {
    /// Total events recorded.
    pub events: u64,
    /// Events accepted by every stage.
    pub accepted: u64,
    /// Per-stage counters.
    pub stages: Vec<StageCount>,
}

impl CutFlow {
    /// Empty cut flow for the given stage order.
    pub fn new(stages: &[StageId]) -> Self {
        Self {
            events: 0,
            accepted: 0,
            stages: stages
                .iter()
                .map(|&stage| StageCount {
                    stage,
                    entered: 0,
                    rejected: 0,
                    cuts: BTreeMap::new(),
                })
                .collect(),
        }
    }

    /// Adds the counters of another cut flow built for the same stages.
    pub fn merge(&mut self, other: &CutFlow) -> Result<(), Kmu2Error> {
        let same_stages = self.stages.len() == other.stages.len()
            && self
                .stages
                .iter()
                .zip(&other.stages)
                .all(|(a, b)| a.stage == b.stage);
        if !same_stages {
            return Err(merge_error(
                "kmu2_select.cutflow_mismatch",
                "cut flows were built for different stage lists",
            ));
        }
        self.events += other.events;
        self.accepted += other.accepted;
        for (mine, theirs) in self.stages.iter_mut().zip(&other.stages) {
            mine.entered += theirs.entered;
            mine.rejected += theirs.rejected;
            for (cut, count) in &theirs.cuts {
                *mine.cuts.entry(*cut).or_insert(0) += count;
            }
        }
        Ok(())
    }
}

impl DiagnosticsSink for CutFlow {
    fn record(&mut self, outcome: &SelectionOutcome) {
        self.events += 1;
        for count in &mut self.stages {
            count.entered += 1;
            if let Some(rejection) = outcome.rejection {
                if rejection.stage == count.stage {
                    count.rejected += 1;
                    *count.cuts.entry(rejection.cut).or_insert(0) += 1;
                    return;
                }
            }
        }
        if outcome.accepted {
            self.accepted += 1;
        }
    }
}

/// Fixed-range one-dimensional histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
    /// Counts per bin; each bin includes its left edge.
    pub counts: Vec<u64>,
    /// Values below `min`.
    pub underflow: u64,
    /// Values at or above `max`, and NaN.
    pub overflow: u64,
}

impl Histogram1D {
    /// Empty histogram with `bins` equal-width bins.
    pub fn new(bins: usize, min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
        }
    }

    /// Adds one value.
    pub fn fill(&mut self, value: f64) {
        if value < self.min {
            self.underflow += 1;
            return;
        }
        let bins = self.counts.len();
        let position = (value - self.min) / (self.max - self.min) * bins as f64;
        if !(position < bins as f64) {
            self.overflow += 1;
            return;
        }
        self.counts[position.floor() as usize] += 1;
    }

    /// Total number of filled values, including under- and overflow.
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.underflow + self.overflow
    }

    fn same_binning(&self, other: &Histogram1D) -> bool {
        self.min == other.min && self.max == other.max && self.counts.len() == other.counts.len()
    }
}

/// Histograms of named diagnostic scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBook {
    /// Fill only from accepted events.
    pub accepted_only: bool,
    /// Histograms keyed by scalar name.
    pub histograms: BTreeMap<String, Histogram1D>,
}

impl HistogramBook {
    /// Empty book.
    pub fn new(accepted_only: bool) -> Self {
        Self {
            accepted_only,
            histograms: BTreeMap::new(),
        }
    }

    /// Book covering the quantities inspected when tuning the selection.
    pub fn standard(accepted_only: bool) -> Self {
        let mut book = Self::new(accepted_only);
        book.book("kinematics.mm2", 200, -0.1, 0.1);
        book.book("kinematics.theta", 100, 0.0, 0.02);
        book.book("track.p", 80, 0.0, 80_000.0);
        book.book("vertex.z", 100, 90_000.0, 190_000.0);
        book.book("vertex.cda", 100, 0.0, 100.0);
        book.book("chod.distance", 100, 0.0, 200.0);
        book.book("upstream.time_diff", 100, -50.0, 50.0);
        book.book("lkr.distance", 100, 0.0, 200.0);
        book.book("lkr.time_diff", 100, -50.0, 50.0);
        book.book("muv1.time_diff", 100, -50.0, 50.0);
        book.book("muv2.time_diff", 100, -50.0, 50.0);
        book.book("muv3.time_diff", 100, -50.0, 50.0);
        book.book("calorimeter.associated_energy", 100, 0.0, 10.0);
        book
    }

    /// Books (or re-books) a histogram for a scalar name.
    pub fn book(&mut self, name: &str, bins: usize, min: f64, max: f64) {
        self.histograms
            .insert(name.to_string(), Histogram1D::new(bins, min, max));
    }

    /// Adds the contents of another book with identical binning.
    pub fn merge(&mut self, other: &HistogramBook) -> Result<(), Kmu2Error> {
        for (name, theirs) in &other.histograms {
            let Some(mine) = self.histograms.get_mut(name) else {
                return Err(Kmu2Error::Serde(
                    ErrorInfo::new("kmu2_select.histogram_missing", "histogram not booked")
                        .with_context("name", name.clone()),
                ));
            };
            if !mine.same_binning(theirs) {
                return Err(Kmu2Error::Serde(
                    ErrorInfo::new("kmu2_select.histogram_binning", "histogram binning differs")
                        .with_context("name", name.clone()),
                ));
            }
            for (a, b) in mine.counts.iter_mut().zip(&theirs.counts) {
                *a += b;
            }
            mine.underflow += theirs.underflow;
            mine.overflow += theirs.overflow;
        }
        Ok(())
    }
}

impl DiagnosticsSink for HistogramBook {
    fn record(&mut self, outcome: &SelectionOutcome) {
        if self.accepted_only && !outcome.accepted {
            return;
        }
        for (name, value) in outcome.diagnostics.scalars() {
            if let Some(histogram) = self.histograms.get_mut(&name) {
                histogram.fill(value);
            }
        }
    }
}
