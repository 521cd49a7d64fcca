//! File Ingest Pipeline - staged ingestion of delimited files landed in an object store
//!
//! Provides:
//! - Pipeline configuration (schema, as-of-date, quality rules, error reporting)
//! - Key and partition derivation for staged, published and report objects
//! - Quality checking through a pluggable rule engine
//! - Parquet publication and data catalog registration
//! - Notifications for every outcome
//! - The orchestrator tying these into one run per landed file

pub mod catalog;
pub mod columnar;
pub mod config;
pub mod frame;
pub mod hashing;
pub mod models;
pub mod notification;
pub mod paths;
pub mod pipeline;
pub mod quality;
pub mod storage;
pub mod tagging;

#[cfg(feature = "aws")]
pub mod aws;

// Re-export commonly used types
pub use config::{Config, ConfigError, Settings};
pub use frame::{Frame, FrameError};
pub use storage::{FileLocation, ObjectStore, StorageError, TagStore};
pub use storage::{FileSystemObjectStore, MemoryObjectStore};

pub use catalog::{CatalogError, CatalogService, CatalogSync, InMemoryCatalog};
pub use columnar::{ColumnarSerializer, ColumnarWriter, ParquetSerializer};
pub use hashing::{ContentHasher, Sha256Hasher};
pub use notification::{Notifier, PayloadBuilder, RecordingNotifier};
pub use quality::{CheckResult, QualityEngine, RuleResult, RuleStatus, ScriptedQualityEngine};
pub use tagging::Tagger;

pub use pipeline::{
    Collaborators, ErrorKind, PipelineError, PipelineOrchestrator, PipelineReport,
    PipelineResult, ProcessContext, RunOutcome, TriggerEnvironment,
};

// Re-export models
pub use models::enums::*;
pub use models::{CatalogColumn, CatalogPartition, CatalogTable, DataType};
