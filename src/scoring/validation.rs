use super::config::ScoringConfig;
use super::rules::AmplificationRule;

/// Weight sums further than this from 1.0 produce a warning.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref weights) = config.weights {
        for (name, weight) in weights.as_pairs() {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(format!(
                    "scoring.weights.{}: must be a non-negative number, got {}",
                    name, weight
                ));
            }
        }
    }

    if let Some(noise) = config.noise_level {
        if !(0.0..=1.0).contains(&noise) {
            errors.push(format!(
                "scoring.noise_level: must be between 0 and 1, got {}",
                noise
            ));
        }
    }

    if let Some(ref rules) = config.rules {
        for (i, rule) in rules.iter().enumerate() {
            if !rule.multiplier.is_finite() || rule.multiplier <= 0.0 {
                errors.push(format!(
                    "scoring.rules[{}].multiplier: must be positive, got {}",
                    i, rule.multiplier
                ));
            }
            if let Err(e) = AmplificationRule::compile(rule) {
                errors.push(format!("scoring.rules[{}]: {:#}", i, e));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Soft check on the weight sum. Returns the sum when it is off.
pub fn weight_sum_warning(config: &ScoringConfig) -> Option<f64> {
    let sum = config.effective_weights().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        Some(sum)
    } else {
        None
    }
}
