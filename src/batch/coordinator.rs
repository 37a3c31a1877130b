use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;

use super::table::{
    format_number, output_headers, write_csv, ColumnMap, Table, OPTIONAL_COLUMNS,
    REQUIRED_COLUMNS, RESULT_COLUMNS,
};
use crate::error::{BatchError, ProcessError};
use crate::record::RawRecord;
use crate::scoring::{EngineInfo, ScoreResult, ScoringEngine};

pub const DEFAULT_WORKERS: usize = 8;
pub const MAX_WORKERS: usize = 16;

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ScoreResult),
    Error(String),
}

/// Result of one input row, tagged with its original position.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub index: usize,
    pub outcome: Outcome,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn status(&self) -> &'static str {
        if self.is_success() {
            STATUS_SUCCESS
        } else {
            STATUS_ERROR
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error(msg) => Some(msg),
            Outcome::Success(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub blank_rows: usize,
    pub elapsed: Duration,
}

/// Processed batch: the input table plus one outcome per row, in input order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    outcomes: Vec<RowOutcome>,
    stats: BatchStats,
}

impl BatchResult {
    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    pub fn output_headers(&self) -> Vec<String> {
        output_headers(&self.headers)
    }

    /// Output cells per row: input cells, then result columns.
    /// Error rows leave every numeric column empty.
    pub fn output_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows
            .iter()
            .zip(&self.outcomes)
            .map(|(input, row)| {
                let mut cells: Vec<String> = input
                    .iter()
                    .map(|c| c.clone().unwrap_or_default())
                    .collect();
                match &row.outcome {
                    Outcome::Success(result) => {
                        cells.extend(
                            [
                                result.crime_component,
                                result.accident_component,
                                result.socioeconomic_component,
                                result.weather_component,
                                result.risk_score,
                            ]
                            .map(format_number),
                        );
                        cells.push(STATUS_SUCCESS.to_string());
                        cells.push(String::new());
                    }
                    Outcome::Error(msg) => {
                        cells.extend(std::iter::repeat(String::new()).take(5));
                        cells.push(STATUS_ERROR.to_string());
                        cells.push(msg.clone());
                    }
                }
                cells
            })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BatchError> {
        write_csv(writer, &self.output_headers(), self.output_rows())
    }
}

/// Read-only view of the batch configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorInfo {
    pub workers: usize,
    pub required_columns: Vec<&'static str>,
    pub optional_columns: Vec<&'static str>,
    pub result_columns: Vec<&'static str>,
    pub engine: EngineInfo,
}

/// Applies the scoring pipeline to every row of a table over a bounded
/// pool of workers.
///
/// A bad row only ever produces an error outcome for that row; the batch
/// itself fails only when the table shape is wrong.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    engine: Arc<ScoringEngine>,
    workers: usize,
}

impl BatchCoordinator {
    pub fn new(engine: Arc<ScoringEngine>) -> Self {
        Self {
            engine,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(engine: Arc<ScoringEngine>, workers: usize) -> Result<Self, BatchError> {
        let mut coordinator = Self::new(engine);
        coordinator.set_worker_count(workers)?;
        Ok(coordinator)
    }

    pub fn set_worker_count(&mut self, workers: usize) -> Result<(), BatchError> {
        if !(1..=MAX_WORKERS).contains(&workers) {
            return Err(BatchError::InvalidWorkers(workers));
        }
        self.workers = workers;
        tracing::debug!(workers, "updated worker count");
        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn info(&self) -> ProcessorInfo {
        ProcessorInfo {
            workers: self.workers,
            required_columns: REQUIRED_COLUMNS.to_vec(),
            optional_columns: OPTIONAL_COLUMNS.to_vec(),
            result_columns: RESULT_COLUMNS.to_vec(),
            engine: self.engine.info(),
        }
    }

    /// Fatal shape problems of a table; empty when the table can be processed.
    pub fn validate_structure(table: &Table) -> Vec<String> {
        if table.headers().is_empty() {
            return vec!["CSV file contains no data".to_string()];
        }
        if table.is_empty() {
            return vec!["CSV file is empty".to_string()];
        }
        if table.blank_row_count() == table.len() {
            return vec!["CSV file contains no usable rows".to_string()];
        }

        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        let mut duplicates: Vec<&str> = Vec::new();
        for header in table.headers() {
            if !seen.insert(header.as_str()) && !duplicates.contains(&header.as_str()) {
                duplicates.push(header);
            }
        }
        if !duplicates.is_empty() {
            errors.push(format!("Duplicate column names: {}", duplicates.join(", ")));
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| table.column_index(c).is_none())
            .collect();
        if !missing.is_empty() {
            errors.push(format!("Missing required columns: {}", missing.join(", ")));
        }

        errors
    }

    pub async fn process_csv<R: Read>(&self, reader: R) -> Result<BatchResult, BatchError> {
        let table = Table::from_csv(reader)?;
        self.process_batch(table).await
    }

    pub async fn process_batch(&self, table: Table) -> Result<BatchResult, BatchError> {
        let engine = Arc::clone(&self.engine);
        self.process_rows_with(table, move |raw| engine.process(raw))
            .await
    }

    async fn process_rows_with<F>(&self, table: Table, process: F) -> Result<BatchResult, BatchError>
    where
        F: Fn(&RawRecord) -> Result<ScoreResult, ProcessError> + Send + Sync + 'static,
    {
        let start = Instant::now();

        let problems = Self::validate_structure(&table);
        if !problems.is_empty() {
            let err = BatchError::Structural(problems);
            tracing::error!(error = %err, "batch rejected");
            return Err(err);
        }
        let blank_rows = table.blank_row_count();
        if blank_rows > 0 {
            tracing::warn!(blank_rows, "found completely empty rows");
        }

        let columns = ColumnMap::new(&table);
        let overflow: Vec<Option<String>> = (0..table.len()).map(|i| table.overflow_error(i)).collect();
        let (headers, rows) = table.into_rows();
        let total_rows = rows.len();
        tracing::info!(rows = total_rows, workers = self.workers, "starting concurrent processing");

        let records: Vec<RawRecord> = rows.iter().map(|row| columns.record(row)).collect();
        let process = Arc::new(process);

        // One slot per input row; completion order doesn't matter.
        let mut slots: Vec<Option<Outcome>> = vec![None; total_rows];

        let mut completed = stream::iter(records.into_iter().zip(overflow).enumerate())
            .map(|(index, (raw, overflow))| {
                let process = Arc::clone(&process);
                async move {
                    if let Some(msg) = overflow {
                        return (index, Outcome::Error(msg));
                    }
                    let outcome = match tokio::task::spawn_blocking(move || (*process)(&raw)).await {
                        Ok(Ok(result)) => Outcome::Success(result),
                        Ok(Err(e)) => Outcome::Error(e.to_string()),
                        Err(e) => Outcome::Error(format!(
                            "Unexpected row processing error: {}",
                            panic_message(e)
                        )),
                    };
                    (index, outcome)
                }
            })
            .buffer_unordered(self.workers);

        while let Some((index, outcome)) = completed.next().await {
            if let Outcome::Error(ref msg) = outcome {
                tracing::warn!(row = index + 1, error = %msg, "row failed");
            }
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<RowOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| RowOutcome {
                index,
                outcome: slot.unwrap_or_else(|| {
                    Outcome::Error("Unexpected row processing error: row was not processed".to_string())
                }),
            })
            .collect();

        let success_count = outcomes.iter().filter(|o| o.is_success()).count();
        let stats = BatchStats {
            total_rows,
            success_count,
            error_count: total_rows - success_count,
            blank_rows,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            total_rows = stats.total_rows,
            successful_rows = stats.success_count,
            error_rows = stats.error_count,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "batch processing complete"
        );

        Ok(BatchResult {
            headers,
            rows,
            outcomes,
            stats,
        })
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".to_string()),
        Err(err) => err.to_string(),
    }
}
