use serde_json::Value;
use std::io::{Read, Write};

use crate::error::BatchError;
use crate::record::RawRecord;

pub const REQUIRED_COLUMNS: [&str; 4] = [
    "crime_index",
    "accident_rate",
    "socioeconomic_level",
    "weather",
];

pub const OPTIONAL_COLUMNS: [&str; 2] = ["name", "city"];

/// Columns appended to every output table, in order.
pub const RESULT_COLUMNS: [&str; 7] = [
    "crime_index_component",
    "accident_rate_component",
    "socioeconomic_level_component",
    "weather_component",
    "risk_score",
    "processing_status",
    "error_message",
];

/// Tabular batch input: a header row and string cells.
///
/// Blank cells are stored as `None`. Non-empty cells past the last header
/// are kept per row so the row can be rejected instead of silently cut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    overflow: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            headers,
            rows,
            overflow: Vec::new(),
        }
    }

    /// Read CSV with a header row. Short rows are padded with empty cells.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, BatchError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let width = headers.len();

        let mut rows = Vec::new();
        let mut overflow = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .take(width)
                .map(|cell| {
                    let cell = cell.trim();
                    (!cell.is_empty()).then(|| cell.to_string())
                })
                .collect();
            row.resize(width, None);
            rows.push(row);

            // trailing empty cells (e.g. a trailing comma) carry nothing
            let extra: Vec<String> = record
                .iter()
                .skip(width)
                .map(|cell| cell.trim().to_string())
                .collect();
            let keep = extra.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            overflow.push(extra[..keep].to_vec());
        }

        Ok(Self {
            headers,
            rows,
            overflow,
        })
    }

    /// Cells of `row` that fall past the last header column.
    pub fn extra_cells(&self, row: usize) -> &[String] {
        self.overflow.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn is_blank_row(row: &[Option<String>]) -> bool {
        row.iter().all(Option::is_none)
    }

    pub fn blank_row_count(&self) -> usize {
        self.rows.iter().filter(|r| Self::is_blank_row(r)).count()
    }

    pub fn into_rows(self) -> (Vec<String>, Vec<Vec<Option<String>>>) {
        (self.headers, self.rows)
    }

    /// Row-level problem for a row wider than the header, if any.
    pub fn overflow_error(&self, row: usize) -> Option<String> {
        let extra = self.extra_cells(row);
        (!extra.is_empty()).then(|| {
            format!(
                "Row has {} more field(s) than the header: {}",
                extra.len(),
                extra.join(", ")
            )
        })
    }
}

/// Maps header positions onto record fields once per batch.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    crime_index: Option<usize>,
    accident_rate: Option<usize>,
    socioeconomic_level: Option<usize>,
    weather: Option<usize>,
    name: Option<usize>,
    city: Option<usize>,
}

impl ColumnMap {
    pub fn new(table: &Table) -> Self {
        Self {
            crime_index: table.column_index("crime_index"),
            accident_rate: table.column_index("accident_rate"),
            socioeconomic_level: table.column_index("socioeconomic_level"),
            weather: table.column_index("weather"),
            name: table.column_index("name"),
            city: table.column_index("city"),
        }
    }

    pub fn record(&self, row: &[Option<String>]) -> RawRecord {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .and_then(|c| c.as_deref())
                .map(Value::from)
        };
        RawRecord {
            name: cell(self.name),
            city: cell(self.city),
            crime_index: cell(self.crime_index),
            accident_rate: cell(self.accident_rate),
            socioeconomic_level: cell(self.socioeconomic_level),
            weather: cell(self.weather),
        }
    }
}

/// Output header: input columns as given, then the result columns.
pub fn output_headers(input_headers: &[String]) -> Vec<String> {
    input_headers
        .iter()
        .cloned()
        .chain(RESULT_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Write cells as CSV with the given header.
pub fn write_csv<W: Write>(
    writer: W,
    headers: &[String],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<(), BatchError> {
    let io_error = |e: csv::Error| BatchError::Io(e.to_string());
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(headers).map_err(io_error)?;
    for row in rows {
        csv_writer.write_record(&row).map_err(io_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Numeric cell text, always with a decimal part ("50.0", "44.44").
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
