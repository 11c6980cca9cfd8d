#![deny(missing_docs)]
#![doc = "Track-to-detector association and the short-circuit single-track selection \
pipeline, with its configuration presets and diagnostics sinks."]

/// LKr cluster energy correction.
pub mod calibration;
/// Selection thresholds, presets and validation.
pub mod config;
/// Stable hashing of configurations and reports.
pub mod hash;
/// JSON-lines event input.
pub mod io;
/// Nearest-candidate association per detector.
pub mod matching;
/// Stage identifiers, rejections and per-event diagnostics.
pub mod outcome;
/// Pipeline assembly and evaluation.
pub mod pipeline;
/// Canonical JSON and YAML helpers.
pub mod serde;
/// Cut-flow and histogram sinks.
pub mod sink;
/// The individual selection stages.
pub mod stages;

pub use calibration::EnergyCorrection;
pub use config::{load_config, SelectionConfig, Variant};
pub use matching::{find_closest, match_detector, ClusterMatch};
pub use outcome::{Cut, Diagnostics, Rejection, SelectionOutcome, StageId};
pub use pipeline::SelectionPipeline;
pub use sink::{CutFlow, DiagnosticsSink, HistogramBook};
