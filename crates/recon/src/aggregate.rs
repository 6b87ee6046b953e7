use std::collections::BTreeMap;

use crate::model::{AggregatedRow, Measures, NormalizedRow, RouteGroup};
use crate::venue::VenueMapper;

/// First primary pass: group by (raw venue code, liquidity).
///
/// Runs after liquidity reclassification and before venue canonicalization, so
/// codes that share a canonical venue stay apart here.
pub fn group_by_route(rows: &[NormalizedRow]) -> Vec<RouteGroup> {
    let mut groups: BTreeMap<(&str, &str), (Measures, usize)> = BTreeMap::new();

    for row in rows {
        let Some(key) = row.key_parts() else { continue };
        let entry = groups.entry(key).or_default();
        entry.0.accumulate(row);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((code, liquidity), (measures, row_count))| RouteGroup {
            venue_code: code.to_string(),
            liquidity: liquidity.to_string(),
            measures,
            row_count,
        })
        .collect()
}

/// Second primary pass: canonicalize each group's venue code and re-group by
/// (canonical venue, liquidity).
pub fn group_by_venue(groups: &[RouteGroup], mapper: &VenueMapper) -> Vec<AggregatedRow> {
    let mut merged: BTreeMap<(&str, &str), (Measures, usize)> = BTreeMap::new();

    for group in groups {
        let venue = mapper.canonical(&group.venue_code);
        let entry = merged.entry((venue, group.liquidity.as_str())).or_default();
        entry.0.merge(&group.measures);
        entry.1 += group.row_count;
    }

    into_rows(merged)
}

/// Both primary passes.
pub fn aggregate_primary(rows: &[NormalizedRow], mapper: &VenueMapper) -> Vec<AggregatedRow> {
    let routes = group_by_route(rows);
    let venues = group_by_venue(&routes, mapper);
    log::debug!(
        "primary: {} rows -> {} route groups -> {} venue groups",
        rows.len(),
        routes.len(),
        venues.len()
    );
    venues
}

/// Counterparty rows already carry canonical venue names: one pass.
pub fn aggregate_counterparty(rows: &[NormalizedRow]) -> Vec<AggregatedRow> {
    let mut groups: BTreeMap<(&str, &str), (Measures, usize)> = BTreeMap::new();

    for row in rows {
        let Some(key) = row.key_parts() else { continue };
        let entry = groups.entry(key).or_default();
        entry.0.accumulate(row);
        entry.1 += 1;
    }

    let out = into_rows(groups);
    log::debug!("counterparty: {} rows -> {} venue groups", rows.len(), out.len());
    out
}

fn into_rows(groups: BTreeMap<(&str, &str), (Measures, usize)>) -> Vec<AggregatedRow> {
    groups
        .into_iter()
        .map(|((venue, liquidity), (measures, row_count))| AggregatedRow {
            venue: venue.to_string(),
            liquidity: liquidity.to_string(),
            measures,
            row_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lineage;

    fn row(venue: &str, liquidity: &str, qty: f64, fee: Option<f64>, exec: f64) -> NormalizedRow {
        NormalizedRow {
            lineage: Lineage::Primary,
            venue: Some(venue.into()),
            liquidity: Some(liquidity.into()),
            quantity: Some(qty),
            fee,
            exec_fee: Some(exec),
        }
    }

    #[test]
    fn route_pass_keeps_codes_apart() {
        let rows = vec![
            row("XNYS", "Q", 100.0, Some(1.0), 0.5),
            row("NYSD", "Q", 50.0, Some(0.5), 0.25),
            row("XNYS", "Q", 25.0, None, 0.25),
        ];
        let routes = group_by_route(&rows);
        assert_eq!(routes.len(), 2);
        // BTreeMap ordering: NYSD before XNYS
        assert_eq!(routes[0].venue_code, "NYSD");
        assert_eq!(routes[1].venue_code, "XNYS");
        assert_eq!(routes[1].measures.quantity, 125.0);
        assert_eq!(routes[1].measures.transaction_fee, 1.0);
        assert_eq!(routes[1].row_count, 2);
    }

    #[test]
    fn venue_pass_merges_codes() {
        let rows = vec![
            row("XNYS", "Q", 100.0, Some(1.0), 0.5),
            row("NYSD", "Q", 50.0, Some(0.5), 0.25),
            row("NYSD", "R", 10.0, Some(0.1), 0.0),
        ];
        let aggs = aggregate_primary(&rows, &VenueMapper::default());
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].venue, "NYSE");
        assert_eq!(aggs[0].liquidity, "Q");
        assert_eq!(aggs[0].measures.quantity, 150.0);
        assert_eq!(aggs[0].measures.transaction_fee, 1.5);
        assert_eq!(aggs[0].measures.exec_fee, 0.75);
        assert_eq!(aggs[0].row_count, 2);
        assert_eq!(aggs[1].liquidity, "R");
    }

    #[test]
    fn unmapped_code_survives_both_passes() {
        let aggs = aggregate_primary(&[row("ZZZZ", "Q", 7.0, None, 0.0)], &VenueMapper::default());
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].venue, "ZZZZ");
        assert_eq!(aggs[0].measures.transaction_fee, 0.0);
    }

    #[test]
    fn unkeyed_rows_are_skipped() {
        let mut no_venue = row("XNYS", "Q", 10.0, None, 0.0);
        no_venue.venue = None;
        let mut no_liquidity = row("XNYS", "Q", 10.0, None, 0.0);
        no_liquidity.liquidity = None;
        let rows = vec![no_venue, no_liquidity, row("XNYS", "Q", 1.0, None, 0.0)];
        let aggs = aggregate_primary(&rows, &VenueMapper::default());
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].measures.quantity, 1.0);
    }

    #[test]
    fn counterparty_single_pass_does_not_map() {
        let mut a = row("NYSE", "Q", 100.0, Some(5.0), 0.0);
        a.lineage = Lineage::Counterparty;
        let mut b = row("XNYS", "Q", 1.0, Some(1.0), 0.0);
        b.lineage = Lineage::Counterparty;
        let aggs = aggregate_counterparty(&[a, b]);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].venue, "NYSE");
        assert_eq!(aggs[1].venue, "XNYS");
    }
}
