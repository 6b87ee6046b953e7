use std::collections::BTreeMap;

use crate::model::{AggregatedRow, ComparisonRow, JoinOutput, Measures, VenueKey};

/// Inner join of the two aggregated sets on (venue, liquidity).
///
/// Keys present on one side only are not discrepancies; they are dropped from
/// the comparison and listed separately. Disjoint key sets give an empty
/// comparison, which is a valid result.
pub fn join_on_key(primary: &[AggregatedRow], counterparty: &[AggregatedRow]) -> JoinOutput {
    let primary_map: BTreeMap<VenueKey, &Measures> =
        primary.iter().map(|a| (a.key(), &a.measures)).collect();
    let counterparty_map: BTreeMap<VenueKey, &Measures> =
        counterparty.iter().map(|a| (a.key(), &a.measures)).collect();

    let mut comparison = Vec::new();
    let mut primary_only = Vec::new();
    let mut counterparty_only = Vec::new();

    for (key, left) in &primary_map {
        if let Some(right) = counterparty_map.get(key) {
            comparison.push(ComparisonRow {
                venue: key.venue.clone(),
                liquidity: key.liquidity.clone(),
                primary: **left,
                counterparty: **right,
                discrepancy: left.minus(right),
            });
        } else {
            primary_only.push(key.clone());
        }
    }

    for key in counterparty_map.keys() {
        if !primary_map.contains_key(key) {
            counterparty_only.push(key.clone());
        }
    }

    JoinOutput {
        comparison,
        primary_only,
        counterparty_only,
    }
}

/// Excluded keys that would have joined if liquidity were compared without
/// regard to case. These are the consolidated-sentinel casing misses.
pub fn case_only_exclusions(join: &JoinOutput) -> Vec<(&VenueKey, &VenueKey)> {
    join.primary_only
        .iter()
        .filter_map(|p| {
            join.counterparty_only
                .iter()
                .find(|c| c.venue == p.venue && c.liquidity.eq_ignore_ascii_case(&p.liquidity))
                .map(|c| (p, c))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(venue: &str, liquidity: &str, qty: f64, fee: f64, exec: f64) -> AggregatedRow {
        AggregatedRow {
            venue: venue.into(),
            liquidity: liquidity.into(),
            measures: Measures {
                quantity: qty,
                transaction_fee: fee,
                exec_fee: exec,
            },
            row_count: 1,
        }
    }

    #[test]
    fn matched_key_computes_signed_discrepancies() {
        let out = join_on_key(
            &[agg("NYSE", "Q", 100.0, 5.0, 1.0)],
            &[agg("NYSE", "Q", 90.0, 5.5, 1.0)],
        );
        assert_eq!(out.comparison.len(), 1);
        let row = &out.comparison[0];
        assert_eq!(row.discrepancy.quantity, 10.0);
        assert_eq!(row.discrepancy.transaction_fee, -0.5);
        assert_eq!(row.discrepancy.exec_fee, 0.0);
        assert!(row.has_discrepancy());
    }

    #[test]
    fn one_sided_keys_are_excluded() {
        let out = join_on_key(
            &[agg("NYSE", "Q", 1.0, 0.0, 0.0), agg("ZZZZ", "Q", 1.0, 0.0, 0.0)],
            &[agg("NYSE", "Q", 1.0, 0.0, 0.0), agg("IEX", "A", 1.0, 0.0, 0.0)],
        );
        assert_eq!(out.comparison.len(), 1);
        assert!(!out.comparison[0].has_discrepancy());
        assert_eq!(out.primary_only[0].venue, "ZZZZ");
        assert_eq!(out.counterparty_only[0].venue, "IEX");
    }

    #[test]
    fn disjoint_keys_give_empty_comparison() {
        let out = join_on_key(&[agg("A", "x", 1.0, 0.0, 0.0)], &[agg("B", "x", 1.0, 0.0, 0.0)]);
        assert!(out.comparison.is_empty());
        assert_eq!(out.primary_only.len(), 1);
        assert_eq!(out.counterparty_only.len(), 1);
    }

    #[test]
    fn liquidity_is_case_sensitive() {
        let out = join_on_key(
            &[agg("BATS", "Consolidated", 1.0, 0.0, 0.0)],
            &[agg("BATS", "consolidated", 1.0, 0.0, 0.0)],
        );
        assert!(out.comparison.is_empty());
        let misses = case_only_exclusions(&out);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].0.liquidity, "Consolidated");
        assert_eq!(misses[0].1.liquidity, "consolidated");
    }
}
