use anyhow::{bail, Context, Result};
use std::fmt;

use super::config::{ConditionSpec, RuleConfig};
use crate::record::{ValidatedRecord, Weather};

/// Record field a condition looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CrimeIndex,
    AccidentRate,
    SocioeconomicLevel,
    Weather,
    Name,
}

impl Field {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "crime_index" => Ok(Field::CrimeIndex),
            "accident_rate" => Ok(Field::AccidentRate),
            "socioeconomic_level" => Ok(Field::SocioeconomicLevel),
            "weather" => Ok(Field::Weather),
            "name" | "city" => Ok(Field::Name),
            other => bail!("unknown field '{}'", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::CrimeIndex => "crime_index",
            Field::AccidentRate => "accident_rate",
            Field::SocioeconomicLevel => "socioeconomic_level",
            Field::Weather => "weather",
            Field::Name => "name",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::CrimeIndex | Field::AccidentRate | Field::SocioeconomicLevel
        )
    }

    fn numeric(&self, record: &ValidatedRecord) -> Option<f64> {
        match self {
            Field::CrimeIndex => Some(record.crime_index()),
            Field::AccidentRate => Some(record.accident_rate()),
            Field::SocioeconomicLevel => Some(record.socioeconomic_level()),
            Field::Weather | Field::Name => None,
        }
    }

    fn text<'a>(&self, record: &'a ValidatedRecord) -> Option<&'a str> {
        match self {
            Field::Weather => Some(record.weather().as_str()),
            Field::Name => record.name(),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    GreaterThan(Field, f64),
    LessThan(Field, f64),
    Equals(Field, f64),
    MemberOf(Field, Vec<String>),
}

impl Condition {
    pub fn parse(field: &str, spec: &ConditionSpec) -> Result<Self> {
        let field = Field::parse(field)?;
        let condition = match spec {
            ConditionSpec::Number(n) => Condition::Equals(field, *n),
            ConditionSpec::Set(values) => Condition::MemberOf(field, values.clone()),
            ConditionSpec::Expr(s) => {
                let s = s.trim();
                if let Some(val) = s.strip_prefix('>') {
                    Condition::GreaterThan(field, parse_threshold(val)?)
                } else if let Some(val) = s.strip_prefix('<') {
                    Condition::LessThan(field, parse_threshold(val)?)
                } else if let Some(val) = s.strip_prefix('=') {
                    Condition::Equals(field, parse_threshold(val)?)
                } else if let Ok(n) = s.parse::<f64>() {
                    Condition::Equals(field, n)
                } else if s.is_empty() {
                    bail!("empty condition")
                } else {
                    Condition::MemberOf(field, vec![s.to_string()])
                }
            }
        };
        condition.check_field_kind()
    }

    fn check_field_kind(self) -> Result<Self> {
        match self {
            Condition::GreaterThan(field, _)
            | Condition::LessThan(field, _)
            | Condition::Equals(field, _)
                if !field.is_numeric() =>
            {
                bail!("numeric comparison on text field '{}'", field)
            }
            Condition::MemberOf(field, _) if field.is_numeric() => {
                bail!("membership condition on numeric field '{}'", field)
            }
            Condition::MemberOf(Field::Weather, values) => {
                let canonical = values
                    .iter()
                    .map(|v| match Weather::parse(v) {
                        Some(w) => Ok(w.as_str().to_string()),
                        None => bail!("unknown weather '{}'", v),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Condition::MemberOf(Field::Weather, canonical))
            }
            other => Ok(other),
        }
    }

    pub fn field(&self) -> Field {
        match self {
            Condition::GreaterThan(f, _)
            | Condition::LessThan(f, _)
            | Condition::Equals(f, _)
            | Condition::MemberOf(f, _) => *f,
        }
    }

    /// A field the record doesn't carry never matches.
    pub fn matches(&self, record: &ValidatedRecord) -> bool {
        match self {
            Condition::GreaterThan(f, n) => f.numeric(record).is_some_and(|v| v > *n),
            Condition::LessThan(f, n) => f.numeric(record).is_some_and(|v| v < *n),
            Condition::Equals(f, n) => f.numeric(record).is_some_and(|v| v == *n),
            Condition::MemberOf(f, values) => f
                .text(record)
                .is_some_and(|v| values.iter().any(|allowed| allowed == v)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::GreaterThan(field, n) => write!(f, "{} > {}", field, n),
            Condition::LessThan(field, n) => write!(f, "{} < {}", field, n),
            Condition::Equals(field, n) => write!(f, "{} = {}", field, n),
            Condition::MemberOf(field, values) => write!(f, "{} in {{{}}}", field, values.join(", ")),
        }
    }
}

fn parse_threshold(s: &str) -> Result<f64> {
    let s = s.trim();
    let n: f64 = s
        .parse()
        .with_context(|| format!("invalid threshold '{}'", s))?;
    if !n.is_finite() {
        bail!("threshold must be finite: {}", s);
    }
    Ok(n)
}

/// Conditional multiplier over the aggregate score.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplificationRule {
    pub conditions: Vec<Condition>,
    pub multiplier: f64,
    pub description: String,
}

impl AmplificationRule {
    pub fn compile(config: &RuleConfig) -> Result<Self> {
        if config.conditions.is_empty() {
            bail!("rule has no conditions");
        }
        let conditions = config
            .conditions
            .iter()
            .map(|(field, spec)| {
                Condition::parse(field, spec)
                    .with_context(|| format!("condition {}: '{}'", field, spec))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            conditions,
            multiplier: config.multiplier,
            description: config
                .description
                .clone()
                .unwrap_or_else(|| "Unnamed rule".to_string()),
        })
    }

    pub fn fires(&self, record: &ValidatedRecord) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedRule {
    pub description: String,
    pub multiplier: f64,
    pub before: f64,
    pub after: f64,
}

/// Apply every firing rule in declaration order.
///
/// Multipliers compound and the running value is not clamped between
/// rules, so the result may exceed 1.0.
pub fn apply_rules(
    rules: &[AmplificationRule],
    score: f64,
    record: &ValidatedRecord,
) -> (f64, Vec<AppliedRule>) {
    let mut score = score;
    let mut applied = Vec::new();
    for rule in rules.iter().filter(|r| r.fires(record)) {
        let before = score;
        score *= rule.multiplier;
        applied.push(AppliedRule {
            description: rule.description.clone(),
            multiplier: rule.multiplier,
            before,
            after: score,
        });
    }
    (score, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawRecord, Validator};
    use crate::scoring::config::default_rules;

    fn record(crime: f64, accident: f64, socio: f64, weather: &str) -> ValidatedRecord {
        Validator::new()
            .validate(&RawRecord::new(crime, accident, socio, weather))
            .unwrap()
    }

    fn expr(s: &str) -> ConditionSpec {
        ConditionSpec::Expr(s.to_string())
    }

    #[test]
    fn test_parse_greater_than() {
        let c = Condition::parse("crime_index", &expr(">7")).unwrap();
        assert_eq!(c, Condition::GreaterThan(Field::CrimeIndex, 7.0));
        assert!(c.matches(&record(7.5, 0.0, 5.0, "Clear")));
        assert!(!c.matches(&record(7.0, 0.0, 5.0, "Clear")));
    }

    #[test]
    fn test_parse_less_than() {
        let c = Condition::parse("socioeconomic_level", &expr("< 3")).unwrap();
        assert_eq!(c, Condition::LessThan(Field::SocioeconomicLevel, 3.0));
        assert!(c.matches(&record(0.0, 0.0, 2.0, "Clear")));
        assert!(!c.matches(&record(0.0, 0.0, 3.0, "Clear")));
    }

    #[test]
    fn test_parse_equals() {
        let c = Condition::parse("accident_rate", &expr("=5")).unwrap();
        assert_eq!(c, Condition::Equals(Field::AccidentRate, 5.0));
        assert_eq!(
            Condition::parse("accident_rate", &ConditionSpec::Number(5.0)).unwrap(),
            c
        );
        assert_eq!(Condition::parse("accident_rate", &expr("5")).unwrap(), c);
        assert!(c.matches(&record(0.0, 5.0, 5.0, "Clear")));
        assert!(!c.matches(&record(0.0, 5.1, 5.0, "Clear")));
    }

    #[test]
    fn test_parse_membership_canonicalizes_weather() {
        let spec = ConditionSpec::Set(vec!["stormy".to_string(), "SNOWY".to_string()]);
        let c = Condition::parse("weather", &spec).unwrap();
        assert_eq!(
            c,
            Condition::MemberOf(Field::Weather, vec!["Stormy".to_string(), "Snowy".to_string()])
        );
        assert!(c.matches(&record(0.0, 0.0, 5.0, "Snowy")));
        assert!(!c.matches(&record(0.0, 0.0, 5.0, "Clear")));
    }

    #[test]
    fn test_bare_text_is_single_member_set() {
        let c = Condition::parse("weather", &expr("Clear")).unwrap();
        assert_eq!(c, Condition::MemberOf(Field::Weather, vec!["Clear".to_string()]));
    }

    #[test]
    fn test_parse_rejects_bad_conditions() {
        assert!(Condition::parse("population", &expr(">7")).is_err());
        assert!(Condition::parse("crime_index", &expr(">seven")).is_err());
        assert!(Condition::parse("crime_index", &expr(">inf")).is_err());
        assert!(Condition::parse("weather", &expr(">7")).is_err());
        assert!(Condition::parse("crime_index", &expr("High")).is_err());
        assert!(Condition::parse("weather", &expr("Foggy")).is_err());
        assert!(Condition::parse("crime_index", &expr("")).is_err());
    }

    #[test]
    fn test_missing_name_never_matches() {
        let c = Condition::parse("name", &expr("Springfield")).unwrap();
        let unnamed = record(1.0, 1.0, 5.0, "Clear");
        assert!(!c.matches(&unnamed));

        let named = Validator::new()
            .validate(&RawRecord::new(1.0, 1.0, 5.0, "Clear").with_name("Springfield"))
            .unwrap();
        assert!(c.matches(&named));
    }

    #[test]
    fn test_rule_requires_all_conditions() {
        let rules: Vec<_> = default_rules()
            .iter()
            .map(|r| AmplificationRule::compile(r).unwrap())
            .collect();
        let severe = &rules[0];
        assert!(severe.fires(&record(8.0, 0.0, 5.0, "Stormy")));
        assert!(!severe.fires(&record(8.0, 0.0, 5.0, "Rainy")));
        assert!(!severe.fires(&record(6.0, 0.0, 5.0, "Stormy")));
    }

    #[test]
    fn test_rule_without_conditions_rejected() {
        let config = RuleConfig {
            description: None,
            multiplier: 2.0,
            conditions: Default::default(),
        };
        assert!(AmplificationRule::compile(&config).is_err());
    }

    #[test]
    fn test_multipliers_compound_in_order() {
        let rules: Vec<_> = default_rules()
            .iter()
            .map(|r| AmplificationRule::compile(r).unwrap())
            .collect();
        let r = record(9.0, 9.0, 2.0, "Snowy");
        let (score, applied) = apply_rules(&rules, 0.8, &r);

        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].multiplier, 1.15);
        assert_eq!(applied[1].multiplier, 1.10);
        assert_eq!(applied[0].before, 0.8);
        assert_eq!(applied[1].before, applied[0].after);
        assert_eq!(score, 0.8 * 1.15 * 1.10);
        // no clamping between rules
        assert!(score > 1.0);
    }

    #[test]
    fn test_no_rule_fires() {
        let rules: Vec<_> = default_rules()
            .iter()
            .map(|r| AmplificationRule::compile(r).unwrap())
            .collect();
        let (score, applied) = apply_rules(&rules, 0.4, &record(5.0, 4.0, 7.0, "Clear"));
        assert_eq!(score, 0.4);
        assert!(applied.is_empty());
    }
}
