//! Scan cycle orchestration for DiskWarden.
//!
//! [`ScanOrchestrator`] runs one evaluation pass at a time over a reading
//! snapshot; [`CommandSource`] is the production reading source, running an
//! external reader command that prints the snapshot as JSON.

pub mod orchestrator;
pub mod source;

pub use orchestrator::{Clock, CycleOutcome, CycleReport, ScanOrchestrator, Snapshot};
pub use source::CommandSource;
