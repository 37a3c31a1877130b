pub mod config;
pub mod engine;
pub mod rules;
pub mod validation;

pub use config::*;
pub use engine::{ComponentScores, EngineInfo, ScoreBreakdown, ScoreResult, ScoringEngine};
pub use rules::{AmplificationRule, AppliedRule, Condition, Field};
pub use validation::validate_scoring;
