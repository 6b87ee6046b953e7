//! Delimited-text and JSON renderings of a reconciliation result.
//!
//! CSV exports carry a header row and no index column. Missing values are
//! written as empty fields.

use std::io::Write;

use crate::config::{OutputConfig, ReconConfig};
use crate::error::ReconError;
use crate::model::{ComparisonRow, Lineage, Measure, NormalizedRow, ReconResult};

/// Header label for the primary audit export's liquidity column.
const LIQUIDITY_HEADER: &str = "Liquidity";

/// Render a number with at least one fractional digit (`100.0`, `0.25`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

/// Comparison table headers: keys, primary measures, counterparty measures,
/// then the three discrepancy columns.
pub fn comparison_headers(output: &OutputConfig) -> Vec<String> {
    let mut headers = vec!["Exchange".to_string(), "Liquidity".to_string()];
    for suffix in [&output.primary_suffix, &output.counterparty_suffix] {
        headers.extend(Measure::ALL.iter().map(|m| format!("{}_{suffix}", m.label())));
    }
    headers.extend(Measure::ALL.iter().map(|m| format!("{} Discrepancy", m.label())));
    headers
}

pub fn write_comparison<W: Write>(
    writer: W,
    rows: &[ComparisonRow],
    output: &OutputConfig,
) -> Result<(), ReconError> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(comparison_headers(output))?;

    for row in rows {
        let mut record = vec![row.venue.clone(), row.liquidity.clone()];
        for side in [&row.primary, &row.counterparty, &row.discrepancy] {
            record.extend(Measure::ALL.iter().map(|m| format_number(side.get(*m))));
        }
        w.write_record(&record)?;
    }

    w.flush()?;
    Ok(())
}

/// Audit export headers for one lineage, in the source report's own names.
pub fn audit_headers(config: &ReconConfig, lineage: Lineage) -> Vec<String> {
    match lineage {
        Lineage::Primary => {
            let c = &config.primary.columns;
            vec![
                c.quantity.clone(),
                c.venue.clone(),
                c.algo_fee.clone(),
                c.exec_fee.clone(),
                LIQUIDITY_HEADER.to_string(),
            ]
        }
        Lineage::Counterparty => {
            let c = &config.counterparty.columns;
            vec![
                c.venue.clone(),
                c.quantity.clone(),
                c.transaction_fee.clone(),
                c.exec_fee.clone(),
                c.liquidity.clone(),
            ]
        }
    }
}

pub fn write_audit<W: Write>(
    writer: W,
    rows: &[NormalizedRow],
    config: &ReconConfig,
    lineage: Lineage,
) -> Result<(), ReconError> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(audit_headers(config, lineage))?;

    for row in rows {
        let venue = row.venue.clone().unwrap_or_default();
        let liquidity = row.liquidity.clone().unwrap_or_default();
        let record = match lineage {
            Lineage::Primary => [
                format_optional(row.quantity),
                venue,
                format_optional(row.fee),
                format_optional(row.exec_fee),
                liquidity,
            ],
            Lineage::Counterparty => [
                venue,
                format_optional(row.quantity),
                format_optional(row.fee),
                format_optional(row.exec_fee),
                liquidity,
            ],
        };
        w.write_record(&record)?;
    }

    w.flush()?;
    Ok(())
}

pub fn comparison_csv(rows: &[ComparisonRow], output: &OutputConfig) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_comparison(&mut buf, rows, output)?;
    String::from_utf8(buf).map_err(|e| ReconError::Export(e.to_string()))
}

pub fn audit_csv(rows: &[NormalizedRow], config: &ReconConfig, lineage: Lineage) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_audit(&mut buf, rows, config, lineage)?;
    String::from_utf8(buf).map_err(|e| ReconError::Export(e.to_string()))
}

pub fn to_json(result: &ReconResult) -> Result<String, ReconError> {
    serde_json::to_string_pretty(result).map_err(|e| ReconError::Export(format!("JSON serialization error: {e}")))
}
