//! Ingestion pipeline
//!
//! One run ingests one landed file:
//!
//! ```text
//! received -> hashed -> staged -> quality checked -> passed -> moved -> catalog updated -> done
//!                                                  \-> failed -> moved to error -> done
//! ```
//!
//! Any state may fall through to `unknown error`. Collaborators are injected
//! as trait objects through [`Collaborators`].

pub mod context;
pub mod error;
pub mod executor;
pub mod steps;
pub mod trace;
pub mod trigger;

pub use context::{PROCESSED_ON_FORMAT, ProcessContext};
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use executor::{PipelineOrchestrator, PipelineReport, QualitySummary, RunOutcome};
pub use steps::{Collaborators, StageExecutor};
pub use trace::{PipelineState, RunTrace, StateEntry};
pub use trigger::TriggerEnvironment;
