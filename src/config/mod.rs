mod schema;

pub use schema::{BatchConfig, Config};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the config directory path (~/.config/risk-score/)
pub fn get_config_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join("risk-score")
}

/// Get the default config file path (~/.config/risk-score/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   and falls back to built-in defaults when that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            p
        }
        None => {
            let default_path = get_config_path();
            if !default_path.exists() {
                tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            default_path
        }
    };

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    tracing::debug!(path = %config_path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_missing_explicit_path_is_error() {
        let temp_path = env::temp_dir().join("risk_score_test_missing_config.yaml");
        let _ = fs::remove_file(&temp_path);

        let err = load_config(Some(temp_path)).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_full_config() {
        let temp_path = env::temp_dir().join("risk_score_test_full_config.yaml");
        let yaml = r#"
scoring:
  noise_level: 0
  weights:
    crime_index: 0.25
    accident_rate: 0.25
    socioeconomic_level: 0.25
    weather: 0.25
  rules:
    - description: "Rain on poor areas"
      multiplier: 1.3
      conditions:
        weather: ["Rainy"]
        socioeconomic_level: "<4"
batch:
  workers: 3
"#;
        fs::write(&temp_path, yaml).unwrap();

        let config = load_config(Some(temp_path.clone())).unwrap();
        assert_eq!(config.workers(), 3);
        let scoring = config.scoring();
        assert_eq!(scoring.effective_noise_level(), 0.0);
        assert_eq!(scoring.effective_weights().weather, 0.25);
        assert_eq!(scoring.effective_rules().len(), 1);

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let temp_path = env::temp_dir().join("risk_score_test_bad_config.yaml");
        fs::write(&temp_path, "scoring: [not, a, map]\n").unwrap();

        let err = load_config(Some(temp_path.clone())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workers(), 8);
        assert_eq!(config.scoring(), crate::scoring::ScoringConfig::default());
    }
}
