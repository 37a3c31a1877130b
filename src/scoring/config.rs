use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_NOISE_LEVEL: f64 = 0.05;
pub const OUTPUT_SCALE: f64 = 100.0;

/// Main scoring configuration.
///
/// Every field is optional; anything left out falls back to the built-in
/// defaults. An explicit empty `rules` list disables amplification.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   noise_level: 0.05
///   weights:
///     crime_index: 0.30
///     accident_rate: 0.25
///     socioeconomic_level: 0.25
///     weather: 0.20
///   rules:
///     - description: High crime + severe weather amplification
///       multiplier: 1.15
///       conditions:
///         crime_index: ">7"
///         weather: [Stormy, Snowy, Extreme]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Component weights (default: 0.30 / 0.25 / 0.25 / 0.20)
    #[serde(default)]
    pub weights: Option<WeightConfig>,

    /// Ordered amplification rules (default: see [`default_rules`])
    #[serde(default)]
    pub rules: Option<Vec<RuleConfig>>,

    /// Half-width of the uniform noise added to the post-rule score.
    /// 0 means deterministic scoring.
    #[serde(default)]
    pub noise_level: Option<f64>,
}

impl ScoringConfig {
    /// Defaults with the noise switched off.
    pub fn deterministic() -> Self {
        Self {
            noise_level: Some(0.0),
            ..Self::default()
        }
    }

    pub fn effective_weights(&self) -> WeightConfig {
        self.weights.clone().unwrap_or_default()
    }

    pub fn effective_rules(&self) -> Vec<RuleConfig> {
        self.rules.clone().unwrap_or_else(default_rules)
    }

    pub fn effective_noise_level(&self) -> f64 {
        self.noise_level.unwrap_or(DEFAULT_NOISE_LEVEL)
    }
}

/// Weight per component score.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightConfig {
    pub crime_index: f64,
    pub accident_rate: f64,
    pub socioeconomic_level: f64,
    pub weather: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            crime_index: 0.30,
            accident_rate: 0.25,
            socioeconomic_level: 0.25,
            weather: 0.20,
        }
    }
}

impl WeightConfig {
    pub fn sum(&self) -> f64 {
        self.crime_index + self.accident_rate + self.socioeconomic_level + self.weather
    }

    pub fn as_pairs(&self) -> [(&'static str, f64); 4] {
        [
            ("crime_index", self.crime_index),
            ("accident_rate", self.accident_rate),
            ("socioeconomic_level", self.socioeconomic_level),
            ("weather", self.weather),
        ]
    }
}

/// One amplification rule as written in the config file.
///
/// All conditions must hold for the multiplier to apply.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default)]
    pub description: Option<String>,

    pub multiplier: f64,

    /// Field name -> predicate
    pub conditions: BTreeMap<String, ConditionSpec>,
}

/// Predicate as written in YAML.
///
/// `">7"`, `"<3"`, `"=5"`, a bare number, a bare text value or a list of
/// text values.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionSpec {
    Number(f64),
    Expr(String),
    Set(Vec<String>),
}

impl std::fmt::Display for ConditionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionSpec::Number(n) => write!(f, "{}", n),
            ConditionSpec::Expr(s) => f.write_str(s),
            ConditionSpec::Set(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

fn rule(description: &str, multiplier: f64, conditions: &[(&str, ConditionSpec)]) -> RuleConfig {
    RuleConfig {
        description: Some(description.to_string()),
        multiplier,
        conditions: conditions
            .iter()
            .map(|(field, spec)| (field.to_string(), spec.clone()))
            .collect(),
    }
}

fn set(values: &[&str]) -> ConditionSpec {
    ConditionSpec::Set(values.iter().map(|v| v.to_string()).collect())
}

/// Built-in rule set, applied in this order.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        rule(
            "High crime + severe weather amplification",
            1.15,
            &[
                ("crime_index", ConditionSpec::Expr(">7".to_string())),
                ("weather", set(&["Stormy", "Snowy", "Extreme"])),
            ],
        ),
        rule(
            "High accidents + low socioeconomic level amplification",
            1.10,
            &[
                ("accident_rate", ConditionSpec::Expr(">8".to_string())),
                ("socioeconomic_level", ConditionSpec::Expr("<3".to_string())),
            ],
        ),
        rule(
            "Low crime + clear weather bonus (risk reduction)",
            0.90,
            &[
                ("crime_index", ConditionSpec::Expr("<4".to_string())),
                ("weather", set(&["Clear"])),
            ],
        ),
    ]
}
