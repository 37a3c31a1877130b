use std::io::IsTerminal;
use std::time::Duration;
use owo_colors::OwoColorize;

use crate::batch::{BatchResult, BatchStats, ProcessorInfo};
use crate::scoring::ScoreResult;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a 0-100 score with two decimals, colored by severity
pub fn format_score(score: f64, use_colors: bool) -> String {
    let text = format!("{:.2}", score);
    if !use_colors {
        return text;
    }
    if score >= 70.0 {
        text.red().bold().to_string()
    } else if score >= 40.0 {
        text.yellow().bold().to_string()
    } else {
        text.green().bold().to_string()
    }
}

/// Format a single score result as a short multi-line report
pub fn format_score_result(result: &ScoreResult, use_colors: bool) -> String {
    let mut lines = Vec::new();
    if let Some(name) = result.label() {
        if use_colors {
            lines.push(name.bold().to_string());
        } else {
            lines.push(name.to_string());
        }
    }
    lines.push(format!("Risk score: {}", format_score(result.risk_score, use_colors)));
    lines.push(format!("  Crime:         {:>6.2}", result.crime_component));
    lines.push(format!("  Accident:      {:>6.2}", result.accident_component));
    lines.push(format!("  Socioeconomic: {:>6.2}", result.socioeconomic_component));
    lines.push(format!("  Weather:       {:>6.2}", result.weather_component));
    lines.join("\n")
}

/// Format how the score was reached (for verbose mode)
pub fn format_breakdown(result: &ScoreResult) -> String {
    let breakdown = &result.breakdown;
    let mut lines = vec![format!("Weighted base: {:.4}", breakdown.base_score)];
    for rule in &breakdown.applied_rules {
        lines.push(format!(
            "  {} (x{}): {:.4} -> {:.4}",
            rule.description, rule.multiplier, rule.before, rule.after
        ));
    }
    if breakdown.noise != 0.0 {
        lines.push(format!("Noise: {:+.4}", breakdown.noise));
    }
    lines.join("\n")
}

/// Round to milliseconds so humantime doesn't print micro/nanoseconds
fn format_elapsed(elapsed: Duration) -> String {
    let millis = Duration::from_millis(elapsed.as_millis() as u64);
    if millis.is_zero() {
        "<1ms".to_string()
    } else {
        humantime::format_duration(millis).to_string()
    }
}

/// One-line batch summary: "4 rows: 3 succeeded, 1 failed in 12ms"
pub fn format_batch_summary(stats: &BatchStats, use_colors: bool) -> String {
    let succeeded = format!("{} succeeded", stats.success_count);
    let failed = format!("{} failed", stats.error_count);
    let (succeeded, failed) = if use_colors {
        (
            succeeded.green().to_string(),
            if stats.error_count > 0 {
                failed.red().to_string()
            } else {
                failed.dimmed().to_string()
            },
        )
    } else {
        (succeeded, failed)
    };

    let mut summary = format!(
        "{} rows: {}, {} in {}",
        stats.total_rows,
        succeeded,
        failed,
        format_elapsed(stats.elapsed)
    );
    if stats.blank_rows > 0 {
        summary.push_str(&format!(" ({} blank)", stats.blank_rows));
    }
    summary
}

/// List failed rows with 1-based row numbers
pub fn format_row_errors(result: &BatchResult) -> String {
    result
        .outcomes()
        .iter()
        .filter_map(|row| row.error().map(|e| format!("  Row {}: {}", row.index + 1, e)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable processor configuration
pub fn format_info(info: &ProcessorInfo) -> String {
    let engine = &info.engine;
    let weights = engine
        .weights
        .as_pairs()
        .iter()
        .map(|(name, w)| format!("  {:<20} {:.2}", name, w))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Weights:\n{}\nRules: {}\nNoise level: {}\nWeather: {}\nOutput scale: 0-{}\nWorkers: {}\nRequired columns: {}\nOptional columns: {}",
        weights,
        engine.rules_count,
        engine.noise_level,
        engine.weather_categories.join(", "),
        engine.output_scale,
        info.workers,
        info.required_columns.join(", "),
        info.optional_columns.join(", ")
    )
}
