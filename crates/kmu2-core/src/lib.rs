#![deny(missing_docs)]
#![doc = "Core event model, geometry table and error types shared by the Kmu2 selection crates."]

pub mod errors;
pub mod event;
pub mod geometry;

pub use errors::{ErrorInfo, Kmu2Error};
pub use event::{
    CedarCandidate, ChodCandidate, DetectorKind, Event, LkrCluster, Muv3Candidate, MuvCluster,
    PlaneCandidate, Track,
};
pub use geometry::{BeamSpec, GeometryTable, Masses, MassHypothesis, PlanePositions};
