use thiserror::Error;

/// Every field-level problem found on one record.
///
/// Validation never stops at the first bad field, so a caller fixing input
/// sees the whole list at once. `Display` joins the messages with `"; "`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", .messages.join("; "))]
pub struct ValidationError {
    messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Failure of a single-record call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Risk processing failed: {0}")]
    Unexpected(String),
}

/// Failure of a whole batch. Row-level problems never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("CSV structural errors: {}", .0.join("; "))]
    Structural(Vec<String>),

    #[error("CSV parsing error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Worker count must be between 1 and 16, got {0}")]
    InvalidWorkers(usize),
}

impl From<csv::Error> for BatchError {
    fn from(err: csv::Error) -> Self {
        BatchError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        BatchError::Io(err.to_string())
    }
}

/// Scoring configuration rejected at engine construction.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid scoring config: {}", .0.join("; "))]
pub struct ConfigError(pub Vec<String>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_joins_messages() {
        let err = ValidationError::new(vec![
            "Missing required field: weather".to_string(),
            "Missing required field: crime_index".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required field: weather; Missing required field: crime_index"
        );
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_process_error_is_transparent_for_validation() {
        let err: ProcessError = ValidationError::new(vec!["Unknown weather: Foggy".to_string()]).into();
        assert_eq!(err.to_string(), "Unknown weather: Foggy");
    }

    #[test]
    fn test_structural_error_lists_everything() {
        let err = BatchError::Structural(vec![
            "Duplicate column names: weather".to_string(),
            "Missing required columns: accident_rate".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "CSV structural errors: Duplicate column names: weather; Missing required columns: accident_rate"
        );
    }
}
