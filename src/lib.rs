//! Risk scoring for human-entered indicators.
//!
//! Raw crime, accident, socioeconomic and weather values go through
//! validation, component normalization, weighted aggregation, rule-based
//! amplification and optional noise before being scaled to 0-100.
//! [`batch::BatchCoordinator`] runs the same pipeline over a CSV table on a
//! bounded worker pool, keeping input order and isolating bad rows.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod record;
pub mod scoring;

pub use batch::{BatchCoordinator, BatchResult, Table};
pub use error::{BatchError, ConfigError, ProcessError, ValidationError};
pub use record::{NameKey, RawRecord, ValidatedRecord, Validator, Weather};
pub use scoring::{ScoreResult, ScoringConfig, ScoringEngine};
