use crate::model::{
    ComparisonRow, JoinOutput, LargestDiscrepancy, Measure, Measures, MissingCounts, NormalizedRow,
    ReconSummary, SourceStats,
};

/// Data-quality counts for one source's rows, taken after reclassification.
pub fn source_stats(rows: &[NormalizedRow]) -> SourceStats {
    let mut missing = MissingCounts::default();
    let mut unkeyed = 0;

    for row in rows {
        missing.quantity += row.quantity.is_none() as usize;
        missing.fee += row.fee.is_none() as usize;
        missing.exec_fee += row.exec_fee.is_none() as usize;
        if row.key_parts().is_none() {
            unkeyed += 1;
        }
    }

    SourceStats {
        rows: rows.len(),
        missing,
        unkeyed,
    }
}

/// First row (in table order) with the largest |discrepancy| for `measure`.
pub fn largest_discrepancy(comparison: &[ComparisonRow], measure: Measure) -> Option<LargestDiscrepancy> {
    let mut best: Option<&ComparisonRow> = None;
    for row in comparison {
        let value = row.discrepancy.get(measure).abs();
        match best {
            Some(b) if b.discrepancy.get(measure).abs() >= value => {}
            _ => best = Some(row),
        }
    }

    best.map(|row| LargestDiscrepancy {
        measure,
        venue: row.venue.clone(),
        liquidity: row.liquidity.clone(),
        value: row.discrepancy.get(measure),
    })
}

/// Compute summary statistics from the join and both sources' rows.
pub fn compute_summary(join: &JoinOutput, primary: &[NormalizedRow], counterparty: &[NormalizedRow]) -> ReconSummary {
    let comparison = &join.comparison;

    let mut total_abs_discrepancy = Measures::default();
    for row in comparison {
        total_abs_discrepancy.quantity += row.discrepancy.quantity.abs();
        total_abs_discrepancy.transaction_fee += row.discrepancy.transaction_fee.abs();
        total_abs_discrepancy.exec_fee += row.discrepancy.exec_fee.abs();
    }

    ReconSummary {
        compared_keys: comparison.len(),
        discrepant_keys: comparison.iter().filter(|r| r.has_discrepancy()).count(),
        primary_only_keys: join.primary_only.len(),
        counterparty_only_keys: join.counterparty_only.len(),
        total_abs_discrepancy,
        largest: Measure::ALL
            .iter()
            .filter_map(|m| largest_discrepancy(comparison, *m))
            .collect(),
        primary: source_stats(primary),
        counterparty: source_stats(counterparty),
    }
}
