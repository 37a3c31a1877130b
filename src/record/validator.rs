use super::{NameKey, RawRecord, ValidatedRecord, Weather};
use crate::error::ValidationError;
use serde_json::Value;

pub const CRIME_RANGE: (f64, f64) = (0.0, 10.0);
pub const ACCIDENT_RANGE: (f64, f64) = (0.0, 10.0);
pub const SOCIO_RANGE: (f64, f64) = (1.0, 10.0);
pub const MAX_NAME_LEN: usize = 100;

/// Normalizes and range-checks raw records.
///
/// Holds no per-call state, so a single instance can be shared across
/// batch workers.
#[derive(Debug, Clone)]
pub struct Validator {
    crime_range: (f64, f64),
    accident_range: (f64, f64),
    socio_range: (f64, f64),
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            crime_range: CRIME_RANGE,
            accident_range: ACCIDENT_RANGE,
            socio_range: SOCIO_RANGE,
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a raw record.
    ///
    /// Missing required fields fail immediately, listing all of them.
    /// Otherwise every field is checked and every problem is reported
    /// together in one error.
    pub fn validate(&self, raw: &RawRecord) -> Result<ValidatedRecord, ValidationError> {
        let required = [
            ("crime_index", &raw.crime_index),
            ("accident_rate", &raw.accident_rate),
            ("socioeconomic_level", &raw.socioeconomic_level),
            ("weather", &raw.weather),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| matches!(value, None | Some(Value::Null)))
            .map(|(field, _)| format!("Missing required field: {}", field))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::new(missing));
        }

        let mut errors = Vec::new();

        let crime_index = collect(
            &mut errors,
            check_number("crime_index", raw.crime_index.as_ref(), self.crime_range),
        );
        let accident_rate = collect(
            &mut errors,
            check_number("accident_rate", raw.accident_rate.as_ref(), self.accident_range),
        );
        let socioeconomic_level = collect(
            &mut errors,
            check_number(
                "socioeconomic_level",
                raw.socioeconomic_level.as_ref(),
                self.socio_range,
            ),
        );
        let weather = collect(&mut errors, check_weather(raw.weather.as_ref()));

        let (name_key, name) = match raw.label() {
            None => (NameKey::Name, None),
            Some((key, value)) => (key, collect(&mut errors, check_name(value))),
        };

        match (crime_index, accident_rate, socioeconomic_level, weather) {
            (Some(crime_index), Some(accident_rate), Some(socioeconomic_level), Some(weather))
                if errors.is_empty() =>
            {
                Ok(ValidatedRecord {
                    crime_index,
                    accident_rate,
                    socioeconomic_level,
                    weather,
                    name,
                    name_key,
                })
            }
            _ => Err(ValidationError::new(errors)),
        }
    }
}

fn collect<T>(errors: &mut Vec<String>, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_number(field: &str, value: Option<&Value>, (low, high): (f64, f64)) -> Result<f64, String> {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        let got = value.map(type_name).unwrap_or("null");
        return Err(format!("{} must be a number, got {}", field, got));
    };

    // NaN fails this check as well
    if !(low <= number && number <= high) {
        return Err(format!(
            "{} must be between {} and {}, got {}",
            field, low, high, number
        ));
    }
    Ok(number)
}

fn check_weather(value: Option<&Value>) -> Result<Weather, String> {
    let s = match value {
        Some(Value::String(s)) => s.trim(),
        Some(other) => return Err(format!("weather must be a string, got {}", type_name(other))),
        None => return Err("weather must be a string, got null".to_string()),
    };
    if s.is_empty() {
        return Err("weather cannot be empty".to_string());
    }
    Weather::parse(s).ok_or_else(|| format!("Unknown weather: {}", s))
}

fn check_name(value: &Value) -> Result<String, String> {
    let Value::String(s) = value else {
        return Err(format!("name must be a string, got {}", type_name(value)));
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("name cannot be empty or whitespace only".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("name cannot exceed {} characters", MAX_NAME_LEN));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RawRecord {
        RawRecord::new(5.0, 4.0, 7.0, "Clear")
    }

    #[test]
    fn test_valid_record() {
        let record = Validator::new().validate(&valid()).unwrap();
        assert_eq!(record.crime_index(), 5.0);
        assert_eq!(record.accident_rate(), 4.0);
        assert_eq!(record.socioeconomic_level(), 7.0);
        assert_eq!(record.weather(), Weather::Clear);
        assert_eq!(record.name(), None);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let raw = RawRecord {
            name: None,
            city: None,
            crime_index: Some(Value::from("5.5")),
            accident_rate: Some(Value::from(" 3 ")),
            socioeconomic_level: Some(Value::from("10")),
            weather: Some(Value::from("Rainy")),
        };
        let record = Validator::new().validate(&raw).unwrap();
        assert_eq!(record.crime_index(), 5.5);
        assert_eq!(record.accident_rate(), 3.0);
        assert_eq!(record.socioeconomic_level(), 10.0);
    }

    #[test]
    fn test_missing_fields_listed_together() {
        let raw = RawRecord {
            crime_index: Some(Value::from(5.0)),
            // bad value must not be reported while fields are missing
            accident_rate: Some(Value::from(99.0)),
            ..Default::default()
        };
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(
            err.messages(),
            &[
                "Missing required field: socioeconomic_level".to_string(),
                "Missing required field: weather".to_string(),
            ]
        );
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut raw = valid();
        raw.weather = Some(Value::Null);
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: weather");
    }

    #[test]
    fn test_collects_all_field_errors() {
        let raw = RawRecord {
            name: Some(Value::from("   ")),
            city: None,
            crime_index: Some(Value::from(11.0)),
            accident_rate: Some(Value::from("abc")),
            socioeconomic_level: Some(Value::from(0.0)),
            weather: Some(Value::from("Foggy")),
        };
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.messages().len(), 5);
        let text = err.to_string();
        assert!(text.contains("crime_index must be between 0 and 10, got 11"));
        assert!(text.contains("accident_rate must be a number, got string"));
        assert!(text.contains("socioeconomic_level must be between 1 and 10, got 0"));
        assert!(text.contains("Unknown weather: Foggy"));
        assert!(text.contains("name cannot be empty or whitespace only"));
        assert_eq!(text.matches("; ").count(), 4);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let v = Validator::new();
        assert!(v.validate(&RawRecord::new(0.0, 0.0, 1.0, "Clear")).is_ok());
        assert!(v.validate(&RawRecord::new(10.0, 10.0, 10.0, "Clear")).is_ok());
        assert!(v.validate(&RawRecord::new(-0.1, 0.0, 1.0, "Clear")).is_err());
        assert!(v.validate(&RawRecord::new(0.0, 10.01, 1.0, "Clear")).is_err());
        assert!(v.validate(&RawRecord::new(0.0, 0.0, 0.99, "Clear")).is_err());
    }

    #[test]
    fn test_nan_is_out_of_range() {
        let mut raw = valid();
        raw.crime_index = Some(Value::from("NaN"));
        let err = Validator::new().validate(&raw).unwrap_err();
        assert!(err.to_string().starts_with("crime_index must be between 0 and 10"));
    }

    #[test]
    fn test_boolean_is_not_a_number() {
        let mut raw = valid();
        raw.crime_index = Some(Value::from(true));
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "crime_index must be a number, got boolean");
    }

    #[test]
    fn test_weather_canonical_casing() {
        let mut raw = valid();
        raw.weather = Some(Value::from("sNoWy"));
        let record = Validator::new().validate(&raw).unwrap();
        assert_eq!(record.weather().as_str(), "Snowy");
    }

    #[test]
    fn test_weather_must_be_string() {
        let mut raw = valid();
        raw.weather = Some(Value::from(3));
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "weather must be a string, got number");

        raw.weather = Some(Value::from("  "));
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "weather cannot be empty");
    }

    #[test]
    fn test_unknown_weather_message() {
        let mut raw = valid();
        raw.weather = Some(Value::from("Foggy"));
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Unknown weather: Foggy");
    }

    #[test]
    fn test_name_trimmed() {
        let raw = valid().with_name("  Springfield ");
        let record = Validator::new().validate(&raw).unwrap();
        assert_eq!(record.name(), Some("Springfield"));
    }

    #[test]
    fn test_name_length_limit() {
        let v = Validator::new();
        assert!(v.validate(&valid().with_name(&"a".repeat(100))).is_ok());
        let err = v.validate(&valid().with_name(&"a".repeat(101))).unwrap_err();
        assert_eq!(err.to_string(), "name cannot exceed 100 characters");
    }

    #[test]
    fn test_name_must_be_string() {
        let mut raw = valid();
        raw.name = Some(Value::from(42));
        let err = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(err.to_string(), "name must be a string, got number");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let v = Validator::new();
        let raw = RawRecord {
            name: Some(Value::from(" Oslo ")),
            city: None,
            crime_index: Some(Value::from("2.5")),
            accident_rate: Some(Value::from(7)),
            socioeconomic_level: Some(Value::from("3.25")),
            weather: Some(Value::from("extreme")),
        };
        let first = v.validate(&raw).unwrap();
        let second = v.validate(&first.to_raw()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_city_label_keeps_its_key() {
        let record = Validator::new()
            .validate(&valid().with_city(" Lyon "))
            .unwrap();
        assert_eq!(record.name(), Some("Lyon"));
        assert_eq!(record.name_key(), NameKey::City);
        assert_eq!(record.to_raw().city, Some(Value::from("Lyon")));
        assert!(record.to_raw().name.is_none());
    }
}
