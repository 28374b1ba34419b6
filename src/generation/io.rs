//! CSV input/output of the batch driver.
//!
//! The input file carries a leading row-index column followed by the contract
//! columns. The output drops the index column and appends the model parameters
//! and the implied volatility.

use std::fs::File;
use std::ops::Range;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::generation::config::ColumnsConfig;
use crate::generation::types::{is_missing_cell, StrikeMaturityRow};

/// Name of the label column appended to every output row.
pub const IV_COLUMN: &str = "iv";

/// Rows of one partition together with the input header.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPartition {
    /// Header without the index column
    pub headers: Vec<String>,
    pub rows: Vec<StrikeMaturityRow>,
}

fn parse_cell(cell: &str) -> f64 {
    if is_missing_cell(cell) {
        return f64::NAN;
    }
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Load the positional row range `range` of the strike/maturity file.
///
/// Rows past the end of the file are simply absent; a range starting beyond the
/// end yields an empty partition.
pub fn read_partition(
    path: impl AsRef<Path>,
    columns: &ColumnsConfig,
    range: Range<usize>,
) -> Result<InputPartition> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;

    let header_record = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    if header_record.len() < 2 {
        return Err(anyhow!(
            "Input file {} needs an index column plus data columns, found {} column(s)",
            path.display(),
            header_record.len()
        ));
    }
    let headers: Vec<String> = header_record.iter().skip(1).map(str::to_string).collect();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("Column '{}' not found in {}", name, path.display()))
    };
    let strike_idx = find(&columns.strike)?;
    let maturity_idx = find(&columns.maturity)?;

    let mut rows = Vec::with_capacity(range.len().min(1 << 16));
    for (position, record) in reader
        .records()
        .enumerate()
        .skip(range.start)
        .take(range.len())
    {
        let record = record
            .with_context(|| format!("Malformed record {} in {}", position, path.display()))?;
        let row_id = record
            .get(0)
            .and_then(|id| id.trim().parse::<u64>().ok())
            .unwrap_or(position as u64);
        let cells: Vec<String> = record.iter().skip(1).map(str::to_string).collect();

        rows.push(StrikeMaturityRow {
            row_id,
            position,
            moneyness: parse_cell(&cells[strike_idx]),
            time_to_maturity_years: parse_cell(&cells[maturity_idx]),
            cells,
        });
    }

    Ok(InputPartition { headers, rows })
}

/// One surviving output row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    /// Input cells without the index column
    pub cells: Vec<String>,
    /// Model parameters in column order
    pub params: Vec<f64>,
    pub implied_vol: f64,
}

impl LabeledRow {
    /// False when any cell or value is missing.
    pub fn is_complete(&self) -> bool {
        self.implied_vol.is_finite()
            && self.params.iter().all(|v| v.is_finite())
            && !self.cells.iter().any(|c| is_missing_cell(c))
    }
}

/// Write the partition output file, replacing any previous file at `path`.
///
/// The header is always written, so an empty partition produces a header-only file.
pub fn write_labeled_rows(
    path: impl AsRef<Path>,
    input_headers: &[String],
    param_columns: &[&str],
    rows: &[LabeledRow],
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory {}", parent.display())
            })?;
        }
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = input_headers.iter().map(String::as_str).collect();
    header.extend_from_slice(param_columns);
    header.push(IV_COLUMN);
    writer.write_record(&header)?;

    for row in rows {
        let mut record: Vec<String> = row.cells.clone();
        record.extend(row.params.iter().map(|v| v.to_string()));
        record.push(row.implied_vol.to_string());
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output file {}", path.display()))?;
    Ok(())
}
