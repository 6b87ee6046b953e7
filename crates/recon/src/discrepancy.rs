use std::collections::HashSet;

use crate::model::{ComparisonRow, DiscrepancyAudit, Lineage, NormalizedRow};
use crate::venue::VenueMapper;

/// Keys of comparison rows with any non-zero discrepancy.
pub fn discrepant_keys(comparison: &[ComparisonRow]) -> HashSet<(&str, &str)> {
    comparison
        .iter()
        .filter(|r| r.has_discrepancy())
        .map(|r| (r.venue.as_str(), r.liquidity.as_str()))
        .collect()
}

/// Back-project every transaction-level row behind a discrepant key.
///
/// Primary rows are matched on their canonical venue (the key they were
/// aggregated under) and exported with their raw code. No re-aggregation.
pub fn extract_discrepancies(
    comparison: &[ComparisonRow],
    primary: &[NormalizedRow],
    counterparty: &[NormalizedRow],
    mapper: &VenueMapper,
) -> DiscrepancyAudit {
    let keys = discrepant_keys(comparison);
    if keys.is_empty() {
        return DiscrepancyAudit::default();
    }

    let select = |rows: &[NormalizedRow]| -> Vec<NormalizedRow> {
        rows.iter()
            .filter(|row| {
                let Some((venue, liquidity)) = row.key_parts() else { return false };
                let venue = match row.lineage {
                    Lineage::Primary => mapper.canonical(venue),
                    Lineage::Counterparty => venue,
                };
                keys.contains(&(venue, liquidity))
            })
            .cloned()
            .collect()
    };

    let audit = DiscrepancyAudit {
        primary: select(primary),
        counterparty: select(counterparty),
    };
    log::debug!(
        "{} discrepant keys -> {} primary / {} counterparty audit rows",
        keys.len(),
        audit.primary.len(),
        audit.counterparty.len()
    );
    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Measures;

    fn cmp(venue: &str, liquidity: &str, qty_delta: f64) -> ComparisonRow {
        ComparisonRow {
            venue: venue.into(),
            liquidity: liquidity.into(),
            primary: Measures::default(),
            counterparty: Measures::default(),
            discrepancy: Measures {
                quantity: qty_delta,
                ..Measures::default()
            },
        }
    }

    fn row(lineage: Lineage, venue: &str, liquidity: &str, qty: f64) -> NormalizedRow {
        NormalizedRow {
            lineage,
            venue: Some(venue.into()),
            liquidity: Some(liquidity.into()),
            quantity: Some(qty),
            fee: None,
            exec_fee: None,
        }
    }

    #[test]
    fn returns_every_contributing_row() {
        let comparison = vec![cmp("NYSE", "Q", 10.0), cmp("ARCA", "Q", 0.0)];
        let primary = vec![
            row(Lineage::Primary, "XNYS", "Q", 60.0),
            row(Lineage::Primary, "NYSD", "Q", 50.0),
            row(Lineage::Primary, "XNYS", "R", 1.0),
            row(Lineage::Primary, "ARCX", "Q", 5.0),
        ];
        let counterparty = vec![
            row(Lineage::Counterparty, "NYSE", "Q", 100.0),
            row(Lineage::Counterparty, "ARCA", "Q", 5.0),
        ];
        let audit = extract_discrepancies(&comparison, &primary, &counterparty, &VenueMapper::default());
        assert_eq!(audit.primary.len(), 2);
        assert_eq!(audit.primary[0].venue.as_deref(), Some("XNYS"));
        assert_eq!(audit.primary[1].venue.as_deref(), Some("NYSD"));
        assert_eq!(audit.counterparty.len(), 1);
        assert_eq!(audit.counterparty[0].quantity, Some(100.0));
    }

    #[test]
    fn pairs_not_cross_product() {
        // (NYSE, R) and (ARCA, Q) are discrepant; (NYSE, Q) is not
        let comparison = vec![cmp("NYSE", "R", 1.0), cmp("ARCA", "Q", 1.0), cmp("NYSE", "Q", 0.0)];
        let counterparty = vec![
            row(Lineage::Counterparty, "NYSE", "Q", 1.0),
            row(Lineage::Counterparty, "NYSE", "R", 1.0),
        ];
        let audit = extract_discrepancies(&comparison, &[], &counterparty, &VenueMapper::default());
        assert_eq!(audit.counterparty.len(), 1);
        assert_eq!(audit.counterparty[0].liquidity.as_deref(), Some("R"));
    }

    #[test]
    fn no_discrepancies_no_rows() {
        let comparison = vec![cmp("NYSE", "Q", 0.0)];
        let primary = vec![row(Lineage::Primary, "XNYS", "Q", 1.0)];
        let audit = extract_discrepancies(&comparison, &primary, &[], &VenueMapper::default());
        assert!(audit.primary.is_empty());
        assert!(audit.counterparty.is_empty());
    }
}
