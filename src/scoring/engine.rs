use rand::Rng;
use serde::Serialize;

use super::config::{ScoringConfig, WeightConfig, OUTPUT_SCALE};
use super::rules::{apply_rules, AmplificationRule, AppliedRule};
use super::validation::{validate_scoring, weight_sum_warning};
use crate::error::{ConfigError, ProcessError};
use crate::record::{NameKey, RawRecord, ValidatedRecord, Validator, Weather};

/// Normalized component scores, 0-1 scale (socioeconomic may slightly
/// exceed 1 at the lowest level).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
    pub crime: f64,
    pub accident: f64,
    pub socioeconomic: f64,
    pub weather: f64,
}

impl ComponentScores {
    pub fn from_record(record: &ValidatedRecord) -> Self {
        Self {
            crime: record.crime_index() / 10.0,
            accident: record.accident_rate() / 10.0,
            // inverted: more prosperity, less risk
            socioeconomic: (11.0 - record.socioeconomic_level()) / 9.0,
            weather: record.weather().component_score(),
        }
    }

    /// Weighted sum, clamped to [0, 1].
    pub fn weighted(&self, weights: &WeightConfig) -> f64 {
        let sum = self.crime * weights.crime_index
            + self.accident * weights.accident_rate
            + self.socioeconomic * weights.socioeconomic_level
            + self.weather * weights.weather;
        sum.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub components: ComponentScores,
    pub base_score: f64,      // Weighted, before rules
    pub applied_rules: Vec<AppliedRule>,
    pub noise: f64,           // 0.0 in deterministic mode
}

/// Final score and component breakdown, all on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub risk_score: f64,
    #[serde(rename = "crime_index_component")]
    pub crime_component: f64,
    #[serde(rename = "accident_rate_component")]
    pub accident_component: f64,
    #[serde(rename = "socioeconomic_level_component")]
    pub socioeconomic_component: f64,
    pub weather_component: f64,
    #[serde(skip)]
    pub breakdown: ScoreBreakdown,
}

impl ScoreResult {
    /// The echoed label, whichever key it came under.
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.city.as_deref())
    }
}

/// Read-only snapshot of the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInfo {
    pub weights: WeightConfig,
    pub rules_count: usize,
    pub noise_level: f64,
    pub weather_categories: Vec<&'static str>,
    pub output_scale: f64,
}

/// Turns validated records into risk scores.
///
/// Configuration is fixed at construction, so one engine can be shared
/// by every batch worker without locking.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    validator: Validator,
    weights: WeightConfig,
    rules: Vec<AmplificationRule>,
    noise_level: f64,
    configured_noise_level: f64,
}

impl ScoringEngine {
    pub fn new(config: &ScoringConfig) -> Result<Self, ConfigError> {
        validate_scoring(config).map_err(ConfigError)?;

        let rules = config
            .effective_rules()
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                AmplificationRule::compile(rule)
                    .map_err(|e| format!("scoring.rules[{}]: {:#}", i, e))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError(vec![e]))?;

        if let Some(sum) = weight_sum_warning(config) {
            tracing::warn!(sum, "component weights do not sum to 1.0");
        }

        let noise_level = config.effective_noise_level();
        Ok(Self {
            validator: Validator::new(),
            weights: config.effective_weights(),
            rules,
            noise_level,
            configured_noise_level: noise_level,
        })
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    pub fn rules(&self) -> &[AmplificationRule] {
        &self.rules
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    /// Switch noise off, or restore the configured level.
    pub fn set_deterministic(&mut self, deterministic: bool) {
        self.noise_level = if deterministic {
            0.0
        } else {
            self.configured_noise_level
        };
    }

    /// Validate then score one raw record.
    pub fn process(&self, raw: &RawRecord) -> Result<ScoreResult, ProcessError> {
        let record = self.validator.validate(raw)?;
        let result = self.score(&record);
        if !result.risk_score.is_finite() {
            return Err(ProcessError::Unexpected(format!(
                "non-finite risk score {}",
                result.risk_score
            )));
        }
        Ok(result)
    }

    pub fn score(&self, record: &ValidatedRecord) -> ScoreResult {
        self.score_with_rng(record, &mut rand::thread_rng())
    }

    pub fn score_with_rng<R: Rng>(&self, record: &ValidatedRecord, rng: &mut R) -> ScoreResult {
        let components = ComponentScores::from_record(record);
        let base_score = components.weighted(&self.weights);

        let (amplified, applied_rules) = apply_rules(&self.rules, base_score, record);
        if !applied_rules.is_empty() {
            tracing::debug!(
                rules = %applied_rules
                    .iter()
                    .map(|r| format!("{} (x{})", r.description, r.multiplier))
                    .collect::<Vec<_>>()
                    .join("; "),
                "applied amplification rules"
            );
        }

        let (final_score, noise) = if self.noise_level == 0.0 {
            (amplified, 0.0)
        } else {
            let noise = rng.gen_range(-self.noise_level..=self.noise_level);
            ((amplified + noise).clamp(0.0, 1.0), noise)
        };

        let label = record.name().map(str::to_string);
        let (name, city) = match record.name_key() {
            NameKey::Name => (label, None),
            NameKey::City => (None, label),
        };

        ScoreResult {
            name,
            city,
            risk_score: scale(final_score),
            crime_component: scale(components.crime),
            accident_component: scale(components.accident),
            socioeconomic_component: scale(components.socioeconomic),
            weather_component: scale(components.weather),
            breakdown: ScoreBreakdown {
                components,
                base_score,
                applied_rules,
                noise,
            },
        }
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            weights: self.weights.clone(),
            rules_count: self.rules.len(),
            noise_level: self.noise_level,
            weather_categories: Weather::ALL.iter().map(|w| w.as_str()).collect(),
            output_scale: OUTPUT_SCALE,
        }
    }
}

/// 0-1 -> 0-100, clamped, two decimals.
fn scale(value: f64) -> f64 {
    let scaled = (value * OUTPUT_SCALE).clamp(0.0, OUTPUT_SCALE);
    (scaled * 100.0).round() / 100.0
}
