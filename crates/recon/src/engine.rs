use crate::aggregate::{aggregate_counterparty, aggregate_primary};
use crate::config::ReconConfig;
use crate::discrepancy::extract_discrepancies;
use crate::error::ReconError;
use crate::ingest::{load_counterparty_rows, load_primary_rows};
use crate::matcher::{case_only_exclusions, join_on_key};
use crate::model::{NormalizedRow, ReconMeta, ReconResult};
use crate::summary::compute_summary;
use crate::venue::VenueMapper;

/// Ingested rows from both reports, before venue mapping.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub primary: Vec<NormalizedRow>,
    pub counterparty: Vec<NormalizedRow>,
}

/// Parse both reports. Fails on the first missing required column.
pub fn ingest(config: &ReconConfig, primary_csv: &str, counterparty_csv: &str) -> Result<ReconInput, ReconError> {
    Ok(ReconInput {
        primary: load_primary_rows(primary_csv, &config.primary.columns)?,
        counterparty: load_counterparty_rows(counterparty_csv, &config.counterparty.columns)?,
    })
}

/// Run reconciliation over ingested rows.
///
/// Pure and deterministic: groups are ordered by (venue, liquidity), and no
/// clock or environment data enters the result.
pub fn run(config: &ReconConfig, input: &ReconInput) -> ReconResult {
    let mapper = VenueMapper::from_config(config);

    let primary = mapper.reclassify(input.primary.clone());
    let counterparty = mapper.reclassify(input.counterparty.clone());

    let primary_aggs = aggregate_primary(&primary, &mapper);
    let counterparty_aggs = aggregate_counterparty(&counterparty);

    let join = join_on_key(&primary_aggs, &counterparty_aggs);
    for (p, c) in case_only_exclusions(&join) {
        log::warn!(
            "{}: liquidity '{}' vs '{}' differs only by case; key excluded from comparison",
            p.venue,
            p.liquidity,
            c.liquidity
        );
    }
    if join.comparison.is_empty() {
        log::warn!("no (venue, liquidity) keys matched between the two reports");
    }

    let audit = extract_discrepancies(&join.comparison, &primary, &counterparty, &mapper);
    let summary = compute_summary(&join, &primary, &counterparty);

    log::info!(
        "reconciled {} keys: {} with discrepancies, {} primary-only, {} counterparty-only",
        summary.compared_keys,
        summary.discrepant_keys,
        summary.primary_only_keys,
        summary.counterparty_only_keys
    );

    ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            primary_suffix: config.output.primary_suffix.clone(),
            counterparty_suffix: config.output.counterparty_suffix.clone(),
        },
        summary,
        comparison: join.comparison,
        primary_only: join.primary_only,
        counterparty_only: join.counterparty_only,
        audit,
    }
}

/// Ingest both reports and run.
pub fn reconcile(config: &ReconConfig, primary_csv: &str, counterparty_csv: &str) -> Result<ReconResult, ReconError> {
    let input = ingest(config, primary_csv, counterparty_csv)?;
    Ok(run(config, &input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MissingCounts;

    const PRIMARY_HEADER: &str = "Quantity,Contra Firm,Algo Fee,Exec Fees,Contra Firm Route\n";
    const COUNTERPARTY_HEADER: &str = "Exchange,Quantity,Passed Exchange Transaction Fees,Exec Fees,Liquidity\n";

    fn primary(body: &str) -> String {
        format!("{PRIMARY_HEADER}{body}")
    }

    fn counterparty(body: &str) -> String {
        format!("{COUNTERPARTY_HEADER}{body}")
    }

    #[test]
    fn matching_reports_have_zero_discrepancy() {
        let result = reconcile(
            &ReconConfig::default(),
            &primary("100,XNYS,5.0,0,Q\n"),
            &counterparty("NYSE,100,5.0,0,Q\n"),
        )
        .unwrap();
        assert_eq!(result.comparison.len(), 1);
        let row = &result.comparison[0];
        assert_eq!(row.venue, "NYSE");
        assert_eq!(row.liquidity, "Q");
        assert!(!row.has_discrepancy());
        assert_eq!(result.summary.discrepant_keys, 0);
        assert!(result.audit.primary.is_empty());
        assert!(result.audit.counterparty.is_empty());
    }

    #[test]
    fn unmapped_primary_only_venue_is_excluded() {
        let result = reconcile(
            &ReconConfig::default(),
            &primary("100,XNYS,5.0,0,Q\n40,ZZZZ,1.0,0,Q\n"),
            &counterparty("NYSE,100,5.0,0,Q\n"),
        )
        .unwrap();
        assert_eq!(result.comparison.len(), 1);
        assert_eq!(result.discrepancies().count(), 0);
        assert_eq!(result.primary_only.len(), 1);
        assert_eq!(result.primary_only[0].venue, "ZZZZ");
    }

    #[test]
    fn consolidated_casing_is_preserved_by_default() {
        let result = reconcile(
            &ReconConfig::default(),
            &primary("100,BATS,5.0,0,R\n"),
            &counterparty("BATS,100,5.0,0,A\n"),
        )
        .unwrap();
        assert!(result.comparison.is_empty());
        assert_eq!(result.primary_only[0].liquidity, "Consolidated");
        assert_eq!(result.counterparty_only[0].liquidity, "consolidated");
    }

    #[test]
    fn consolidated_joins_when_labels_agree() {
        let mut config = ReconConfig::default();
        config.consolidated.counterparty_label = "Consolidated".into();
        let result = reconcile(
            &config,
            &primary("100,BATY,5.0,0,R\n"),
            &counterparty("BATS-BYX,90,5.0,0,A\n"),
        )
        .unwrap();
        assert_eq!(result.comparison.len(), 1);
        assert_eq!(result.comparison[0].liquidity, "Consolidated");
        assert_eq!(result.comparison[0].discrepancy.quantity, 10.0);
    }

    #[test]
    fn missing_column_aborts_run() {
        let err = reconcile(
            &ReconConfig::default(),
            "Quantity,Contra Firm,Exec Fees,Contra Firm Route\n1,XNYS,0,Q\n",
            &counterparty("NYSE,100,5.0,0,Q\n"),
        )
        .unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.to_string().contains("'Algo Fee'"));
    }

    #[test]
    fn short_primary_row_is_kept_as_unkeyed() {
        let result = reconcile(
            &ReconConfig::default(),
            &primary("100,XNYS,5.0,0,Q\n7,XNYS,1.0,0\n"),
            &counterparty("NYSE,100,5.0,0,Q\n"),
        )
        .unwrap();
        assert_eq!(result.comparison.len(), 1);
        assert!(!result.comparison[0].has_discrepancy());
        assert_eq!(result.summary.primary.rows, 2);
        assert_eq!(result.summary.primary.unkeyed, 1);
        assert_eq!(result.summary.primary.missing, MissingCounts::default());
    }

    #[test]
    fn run_does_not_consume_input() {
        let config = ReconConfig::default();
        let input = ingest(&config, &primary("1,BATS,0,0,R\n"), &counterparty("")).unwrap();
        let _ = run(&config, &input);
        // reclassification works on a copy
        assert_eq!(input.primary[0].liquidity.as_deref(), Some("R"));
    }
}
