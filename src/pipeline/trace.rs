//! Record of the states and file locations a run went through

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::FileLocation;

/// State of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Hashed,
    Staged,
    QualityChecked,
    Passed,
    Failed,
    Moved,
    CatalogUpdated,
    MovedToError,
    UnknownError,
    Done,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Hashed => "hashed",
            Self::Staged => "staged",
            Self::QualityChecked => "quality_checked",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Moved => "moved",
            Self::CatalogUpdated => "catalog_updated",
            Self::MovedToError => "moved_to_error",
            Self::UnknownError => "unknown_error",
            Self::Done => "done",
        }
    }

    /// Whether `self` may directly follow `previous`
    ///
    /// `Failed` is reachable from every state before the branch because
    /// tagging and quality failures are compensated like a failed check.
    /// `MovedToError` also follows `Passed` and `Moved` when publication fails.
    pub fn can_follow(&self, previous: PipelineState) -> bool {
        use PipelineState::*;
        match self {
            Received => false,
            Hashed => previous == Received,
            Staged => previous == Hashed,
            QualityChecked => previous == Staged,
            Passed => previous == QualityChecked,
            Failed => matches!(previous, Received | Hashed | Staged | QualityChecked),
            Moved => previous == Passed,
            CatalogUpdated => previous == Moved,
            MovedToError => matches!(previous, Failed | Passed | Moved),
            UnknownError => previous != Done,
            Done => matches!(previous, Moved | CatalogUpdated | MovedToError | UnknownError),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A state the run entered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub state: PipelineState,
    pub at: DateTime<Utc>,
}

/// Append-only log of a run
///
/// The in-flight file's current location is always the last recorded one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub correlation_id: String,
    pub started_at: DateTime<Utc>,
    states: Vec<StateEntry>,
    locations: Vec<FileLocation>,
    /// Message of the error that ended the run, if any
    pub error: Option<String>,
}

impl RunTrace {
    /// Start a trace in [`PipelineState::Received`] at `source`
    pub fn new(correlation_id: impl Into<String>, source: FileLocation) -> Self {
        let now = Utc::now();
        Self {
            correlation_id: correlation_id.into(),
            started_at: now,
            states: vec![StateEntry {
                state: PipelineState::Received,
                at: now,
            }],
            locations: vec![source],
            error: None,
        }
    }

    /// Record a transition
    ///
    /// Transitions that the state machine does not allow are still recorded
    /// but logged as warnings.
    pub fn enter(&mut self, state: PipelineState) {
        let previous = self.state();
        if !state.can_follow(previous) {
            warn!(from = %previous, to = %state, "Unexpected pipeline transition");
        }
        info!(from = %previous, to = %state, "Pipeline state changed");
        self.states.push(StateEntry {
            state,
            at: Utc::now(),
        });
    }

    /// Record where the in-flight file now lives and return that location
    pub fn record_location(&mut self, location: FileLocation) -> FileLocation {
        info!(location = %location, "File location changed");
        self.locations.push(location.clone());
        location
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn state(&self) -> PipelineState {
        self.states
            .last()
            .map(|entry| entry.state)
            .unwrap_or(PipelineState::Received)
    }

    /// Current location of the in-flight file
    pub fn current_location(&self) -> &FileLocation {
        // `new` seeds the log with the source, and entries are never removed
        &self.locations[self.locations.len() - 1]
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.states.iter().map(|entry| entry.state).collect()
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.states
    }

    pub fn locations(&self) -> &[FileLocation] {
        &self.locations
    }

    pub fn has_entered(&self, state: PipelineState) -> bool {
        self.states.iter().any(|entry| entry.state == state)
    }

    pub fn duration(&self) -> chrono::Duration {
        let last = self.states.last().map(|e| e.at).unwrap_or(self.started_at);
        last - self.started_at
    }
}
