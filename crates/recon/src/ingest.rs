//! Per-source ingestion: extract the required columns, coerce numerics, and
//! converge both report formats onto [`NormalizedRow`].

use crate::config::{CounterpartyColumns, PrimaryColumns};
use crate::error::ReconError;
use crate::model::{Lineage, MissingCounts, NormalizedRow};

/// Cell texts read as missing in any column. Includes the `nan` placeholder
/// that string-converted nulls leave in the primary venue column.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_na_token(raw: &str) -> bool {
    NA_TOKENS.contains(&raw)
}

/// Parse a numeric field, stripping thousands separators. Empty, non-numeric,
/// and non-finite values are `None`; they are never zeroed.
pub fn parse_measure(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn text_field(raw: &str) -> Option<String> {
    if is_na_token(raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Load the primary (clearing) report. Header names must match exactly.
pub fn load_primary_rows(csv_data: &str, columns: &PrimaryColumns) -> Result<Vec<NormalizedRow>, ReconError> {
    let lineage = Lineage::Primary;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    let headers = read_headers(&mut reader, lineage, false)?;

    let idx = |name: &str| column_index(&headers, name, lineage);
    let quantity_idx = idx(&columns.quantity)?;
    let venue_idx = idx(&columns.venue)?;
    let algo_fee_idx = idx(&columns.algo_fee)?;
    let exec_fee_idx = idx(&columns.exec_fee)?;
    let liquidity_idx = idx(&columns.liquidity)?;

    let mut rows = Vec::new();
    let mut unparseable = MissingCounts::default();

    for record in reader.records() {
        let record = checked_record(record, headers.len(), lineage)?;
        let field = |i: usize| record.get(i).unwrap_or("");

        rows.push(NormalizedRow {
            lineage,
            venue: text_field(field(venue_idx)),
            liquidity: text_field(field(liquidity_idx)),
            quantity: measure(field(quantity_idx), &mut unparseable.quantity),
            fee: measure(field(algo_fee_idx), &mut unparseable.fee),
            exec_fee: measure(field(exec_fee_idx), &mut unparseable.exec_fee),
        });
    }

    report_unparseable(lineage, &unparseable, [&columns.quantity, &columns.algo_fee, &columns.exec_fee]);
    log::debug!("{lineage}: loaded {} rows", rows.len());
    Ok(rows)
}

/// Load the counterparty report. Headers are whitespace-trimmed before matching.
pub fn load_counterparty_rows(
    csv_data: &str,
    columns: &CounterpartyColumns,
) -> Result<Vec<NormalizedRow>, ReconError> {
    let lineage = Lineage::Counterparty;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    let headers = read_headers(&mut reader, lineage, true)?;

    let idx = |name: &str| column_index(&headers, name, lineage);
    let venue_idx = idx(&columns.venue)?;
    let quantity_idx = idx(&columns.quantity)?;
    let fee_idx = idx(&columns.transaction_fee)?;
    let exec_fee_idx = idx(&columns.exec_fee)?;
    let liquidity_idx = idx(&columns.liquidity)?;

    let mut rows = Vec::new();
    let mut unparseable = MissingCounts::default();

    for record in reader.records() {
        let record = checked_record(record, headers.len(), lineage)?;
        let field = |i: usize| record.get(i).unwrap_or("");

        rows.push(NormalizedRow {
            lineage,
            venue: text_field(field(venue_idx)),
            liquidity: text_field(field(liquidity_idx)),
            quantity: measure(field(quantity_idx), &mut unparseable.quantity),
            fee: measure(field(fee_idx), &mut unparseable.fee),
            exec_fee: measure(field(exec_fee_idx), &mut unparseable.exec_fee),
        });
    }

    report_unparseable(
        lineage,
        &unparseable,
        [&columns.quantity, &columns.transaction_fee, &columns.exec_fee],
    );
    log::debug!("{lineage}: loaded {} rows", rows.len());
    Ok(rows)
}

fn read_headers(
    reader: &mut csv::Reader<&[u8]>,
    lineage: Lineage,
    trim: bool,
) -> Result<Vec<String>, ReconError> {
    Ok(reader
        .headers()
        .map_err(|e| csv_error(lineage, e))?
        .iter()
        .map(|h| if trim { h.trim().to_string() } else { h.to_string() })
        .collect())
}

fn column_index(headers: &[String], name: &str, lineage: Lineage) -> Result<usize, ReconError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReconError::MissingColumn {
            lineage,
            column: name.into(),
        })
}

fn csv_error(lineage: Lineage, e: csv::Error) -> ReconError {
    ReconError::Csv {
        lineage,
        message: e.to_string(),
    }
}

/// Short rows are padded with missing values; rows wider than the header
/// are rejected.
fn checked_record(
    record: Result<csv::StringRecord, csv::Error>,
    width: usize,
    lineage: Lineage,
) -> Result<csv::StringRecord, ReconError> {
    let record = record.map_err(|e| csv_error(lineage, e))?;
    if record.len() > width {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        return Err(ReconError::Csv {
            lineage,
            message: format!("CSV error: line {line}: found {} fields, header has {width}", record.len()),
        });
    }
    Ok(record)
}

/// Parse and count non-empty text that failed to parse.
fn measure(raw: &str, unparseable: &mut usize) -> Option<f64> {
    if is_na_token(raw.trim()) {
        return None;
    }
    let value = parse_measure(raw);
    if value.is_none() {
        *unparseable += 1;
    }
    value
}

fn report_unparseable(lineage: Lineage, counts: &MissingCounts, names: [&String; 3]) {
    for (count, name) in [counts.quantity, counts.fee, counts.exec_fee].into_iter().zip(names) {
        if count > 0 {
            log::warn!("{lineage}: {count} unparseable value(s) in '{name}' kept as missing");
        }
    }
}
