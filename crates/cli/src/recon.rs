//! `tradeaudit run | validate | venues`: trade-report reconciliation.

use std::path::{Path, PathBuf};

use tradeaudit_recon::export::{self, comparison_csv};
use tradeaudit_recon::model::{Measure, ReconSummary, SourceStats};
use tradeaudit_recon::{Lineage, ReconConfig, ReconError, ReconResult, VenueMapper};

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_RECON_DISCREPANCY, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_IO,
};
use crate::CliError;

/// Default export file names written by `--audit-dir`.
pub const COMPARISON_FILE: &str = "comparison_results.csv";
pub const PRIMARY_AUDIT_FILE: &str = "primary_discrepancies.csv";
pub const COUNTERPARTY_AUDIT_FILE: &str = "counterparty_discrepancies.csv";

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError::new(code, msg)
}

fn engine_err(err: ReconError) -> CliError {
    let cli_err = CliError::new(recon_exit_code(&err), err.to_string());
    if err.is_schema_violation() {
        cli_err.with_hint("check the file order: primary (clearing) report first, counterparty second")
    } else {
        cli_err
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot read {}: {e}", path.display())))
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

/// Built-in config when no path is given.
fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    match path {
        None => {
            log::debug!("no config given, using built-in venue table");
            Ok(ReconConfig::default())
        }
        Some(path) => {
            log::debug!("loading config {}", path.display());
            let config_str = read_file(path)?;
            ReconConfig::from_toml(&config_str).map_err(|e| {
                recon_err(EXIT_RECON_INVALID_CONFIG, format!("{}: {e}", path.display()))
            })
        }
    }
}

// ============================================================================
// run
// ============================================================================

pub struct RunArgs {
    pub primary: PathBuf,
    pub counterparty: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub audit_dir: Option<PathBuf>,
    pub strict: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let primary_csv = read_file(&args.primary)?;
    let counterparty_csv = read_file(&args.counterparty)?;

    let result = tradeaudit_recon::reconcile(&config, &primary_csv, &counterparty_csv).map_err(engine_err)?;

    if let Some(ref path) = args.output {
        let csv = comparison_csv(&result.comparison, &config.output).map_err(engine_err)?;
        write_file(path, &csv)?;
    }

    if let Some(ref dir) = args.audit_dir {
        write_audit_dir(dir, &config, &result)?;
    }

    if args.json {
        println!("{}", export::to_json(&result).map_err(engine_err)?);
    }

    // Human summary to stderr
    print_summary(&result.summary);

    if args.strict && result.summary.discrepant_keys > 0 {
        return Err(recon_err(
            EXIT_RECON_DISCREPANCY,
            format!("{} key(s) with discrepancies", result.summary.discrepant_keys),
        ));
    }

    Ok(())
}

fn write_audit_dir(dir: &Path, config: &ReconConfig, result: &ReconResult) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot create {}: {e}", dir.display())))?;

    let comparison = comparison_csv(&result.comparison, &config.output).map_err(engine_err)?;
    write_file(&dir.join(COMPARISON_FILE), &comparison)?;

    let primary = export::audit_csv(&result.audit.primary, config, Lineage::Primary).map_err(engine_err)?;
    write_file(&dir.join(PRIMARY_AUDIT_FILE), &primary)?;

    let counterparty =
        export::audit_csv(&result.audit.counterparty, config, Lineage::Counterparty).map_err(engine_err)?;
    write_file(&dir.join(COUNTERPARTY_AUDIT_FILE), &counterparty)?;

    Ok(())
}

fn measure_prefix(measure: Measure) -> &'static str {
    match measure {
        Measure::Quantity => "",
        Measure::TransactionFee | Measure::ExecFee => "$",
    }
}

fn print_summary(s: &ReconSummary) {
    if s.compared_keys == 0 {
        eprintln!(
            "no matching (venue, liquidity) keys between the reports ({} primary-only, {} counterparty-only)",
            s.primary_only_keys, s.counterparty_only_keys,
        );
    } else {
        eprintln!(
            "recon: {} keys compared, {} with discrepancies, {} primary-only, {} counterparty-only excluded",
            s.compared_keys, s.discrepant_keys, s.primary_only_keys, s.counterparty_only_keys,
        );
        eprintln!(
            "total |discrepancy|: quantity {:.2}, transaction fees ${:.2}, exec fees ${:.2}",
            s.total_abs_discrepancy.quantity,
            s.total_abs_discrepancy.transaction_fee,
            s.total_abs_discrepancy.exec_fee,
        );
        for largest in s.largest.iter().filter(|l| l.value != 0.0) {
            eprintln!(
                "largest {} discrepancy: {} ({}) {}{:.2}",
                largest.measure.label(),
                largest.venue,
                largest.liquidity,
                measure_prefix(largest.measure),
                largest.value,
            );
        }
    }

    print_source_quality("primary", &s.primary);
    print_source_quality("counterparty", &s.counterparty);
}

fn print_source_quality(name: &str, stats: &SourceStats) {
    if stats.unkeyed > 0 {
        eprintln!("{name}: {} of {} rows had no venue or liquidity and were skipped", stats.unkeyed, stats.rows);
    }
    let m = &stats.missing;
    if m.quantity + m.fee + m.exec_fee > 0 {
        eprintln!(
            "{name}: missing values: quantity {}, fee {}, exec fee {}",
            m.quantity, m.fee, m.exec_fee,
        );
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "ok: \"{}\" ({} venue codes, {} consolidated venues)",
        config.name,
        config.venues.len(),
        config.consolidated.venues.len(),
    );
    if config.consolidated.primary_label != config.consolidated.counterparty_label {
        eprintln!(
            "note: consolidated labels differ (\"{}\" vs \"{}\"); consolidated venues will not join",
            config.consolidated.primary_label, config.consolidated.counterparty_label,
        );
    }
    Ok(())
}

// ============================================================================
// venues
// ============================================================================

#[derive(serde::Serialize)]
struct VenueListing<'a> {
    venues: &'a std::collections::BTreeMap<String, String>,
    consolidated: &'a std::collections::BTreeSet<String>,
    primary_label: &'a str,
    counterparty_label: &'a str,
}

pub fn cmd_venues(config_path: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let mapper = VenueMapper::from_config(&config);

    if json {
        let listing = VenueListing {
            venues: mapper.table(),
            consolidated: mapper.consolidated(),
            primary_label: mapper.sentinel(Lineage::Primary),
            counterparty_label: mapper.sentinel(Lineage::Counterparty),
        };
        let out = serde_json::to_string_pretty(&listing)
            .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let width = mapper.table().keys().map(|k| k.len()).max().unwrap_or(0);
    for (code, name) in mapper.table() {
        let marker = if mapper.is_consolidated(code) { "  [consolidated]" } else { "" };
        println!("{code:<width$}  {name}{marker}");
    }
    Ok(())
}
