pub mod validator;

pub use validator::Validator;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A record as the caller handed it over, before any checking.
///
/// Indicator fields may arrive as numbers or as strings (CSV cells are
/// always strings), so they are kept as raw JSON values until validation.
/// `None` and JSON `null` both mean "missing". The label may come as
/// `name` or `city`; `name` wins when both are given.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<Value>,
    #[serde(default)]
    pub crime_index: Option<Value>,
    #[serde(default)]
    pub accident_rate: Option<Value>,
    #[serde(default)]
    pub socioeconomic_level: Option<Value>,
    #[serde(default)]
    pub weather: Option<Value>,
}

impl RawRecord {
    /// Build a record from plain numbers and a weather label.
    pub fn new(crime_index: f64, accident_rate: f64, socioeconomic_level: f64, weather: &str) -> Self {
        Self {
            name: None,
            city: None,
            crime_index: Some(Value::from(crime_index)),
            accident_rate: Some(Value::from(accident_rate)),
            socioeconomic_level: Some(Value::from(socioeconomic_level)),
            weather: Some(Value::from(weather)),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(Value::from(name));
        self
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(Value::from(city));
        self
    }

    /// The label value and the key it was given under, skipping nulls.
    pub fn label(&self) -> Option<(NameKey, &Value)> {
        fn present(v: &Option<Value>) -> Option<&Value> {
            v.as_ref().filter(|v| !v.is_null())
        }
        present(&self.name)
            .map(|v| (NameKey::Name, v))
            .or_else(|| present(&self.city).map(|v| (NameKey::City, v)))
    }
}

/// Which key a record's label arrived under, so results echo it back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameKey {
    #[default]
    Name,
    City,
}

/// Weather categories with their fixed risk component (0-1 scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    Clear,
    Rainy,
    Snowy,
    Stormy,
    Extreme,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Clear,
        Weather::Rainy,
        Weather::Snowy,
        Weather::Stormy,
        Weather::Extreme,
    ];

    /// Case-insensitive lookup against the category table.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "Clear",
            Weather::Rainy => "Rainy",
            Weather::Snowy => "Snowy",
            Weather::Stormy => "Stormy",
            Weather::Extreme => "Extreme",
        }
    }

    pub fn component_score(&self) -> f64 {
        match self {
            Weather::Clear => 0.10,
            Weather::Rainy => 0.50,
            Weather::Snowy => 0.70,
            Weather::Stormy => 0.90,
            Weather::Extreme => 0.95,
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record whose fields are all present and range-checked.
///
/// Only [`Validator`] builds these; there are no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    crime_index: f64,
    accident_rate: f64,
    socioeconomic_level: f64,
    weather: Weather,
    name: Option<String>,
    name_key: NameKey,
}

impl ValidatedRecord {
    pub fn crime_index(&self) -> f64 {
        self.crime_index
    }

    pub fn accident_rate(&self) -> f64 {
        self.accident_rate
    }

    pub fn socioeconomic_level(&self) -> f64 {
        self.socioeconomic_level
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn name_key(&self) -> NameKey {
        self.name_key
    }

    /// Turn the validated values back into a raw record.
    pub fn to_raw(&self) -> RawRecord {
        let label = self.name.as_deref().map(Value::from);
        let (name, city) = match self.name_key {
            NameKey::Name => (label, None),
            NameKey::City => (None, label),
        };
        RawRecord {
            name,
            city,
            crime_index: Some(Value::from(self.crime_index)),
            accident_rate: Some(Value::from(self.accident_rate)),
            socioeconomic_level: Some(Value::from(self.socioeconomic_level)),
            weather: Some(Value::from(self.weather.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_parse_is_case_insensitive() {
        assert_eq!(Weather::parse("clear"), Some(Weather::Clear));
        assert_eq!(Weather::parse("SNOWY"), Some(Weather::Snowy));
        assert_eq!(Weather::parse("  Stormy "), Some(Weather::Stormy));
        assert_eq!(Weather::parse("Foggy"), None);
        assert_eq!(Weather::parse(""), None);
    }

    #[test]
    fn test_weather_table() {
        assert_eq!(Weather::Clear.component_score(), 0.10);
        assert_eq!(Weather::Rainy.component_score(), 0.50);
        assert_eq!(Weather::Snowy.component_score(), 0.70);
        assert_eq!(Weather::Stormy.component_score(), 0.90);
        assert_eq!(Weather::Extreme.component_score(), 0.95);
    }

    #[test]
    fn test_raw_record_accepts_city_alias() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"city": "Lyon", "crime_index": 5, "accident_rate": "4", "socioeconomic_level": 7, "weather": "Clear"}"#,
        )
        .unwrap();
        assert_eq!(raw.city, Some(Value::from("Lyon")));
        assert_eq!(raw.label(), Some((NameKey::City, &Value::from("Lyon"))));
        assert_eq!(raw.accident_rate, Some(Value::from("4")));
    }

    #[test]
    fn test_label_prefers_name_over_city() {
        let raw = RawRecord::new(1.0, 1.0, 1.0, "Clear")
            .with_city("Paris")
            .with_name("Site A");
        assert_eq!(raw.label(), Some((NameKey::Name, &Value::from("Site A"))));

        let mut raw = raw;
        raw.name = Some(Value::Null);
        assert_eq!(raw.label(), Some((NameKey::City, &Value::from("Paris"))));
    }

    #[test]
    fn test_raw_record_null_is_missing() {
        let raw: RawRecord = serde_json::from_str(r#"{"crime_index": null}"#).unwrap();
        assert!(raw.crime_index.is_none());
        assert!(raw.weather.is_none());
    }
}
