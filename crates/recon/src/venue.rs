//! Venue-code canonicalization and consolidated-liquidity reclassification.
//!
//! The primary feed reports venues at a finer grain (MIC-style codes) than the
//! counterparty, so the mapper is consulted twice on the primary side: once
//! here to reclassify liquidity, and again at the second grouping pass to
//! canonicalize the venue itself.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ReconConfig;
use crate::model::{Lineage, NormalizedRow};

/// Immutable venue table plus the consolidated set, built once per run.
#[derive(Debug, Clone)]
pub struct VenueMapper {
    table: BTreeMap<String, String>,
    consolidated: BTreeSet<String>,
    primary_label: String,
    counterparty_label: String,
}

impl VenueMapper {
    pub fn new(
        table: BTreeMap<String, String>,
        consolidated: BTreeSet<String>,
        primary_label: impl Into<String>,
        counterparty_label: impl Into<String>,
    ) -> Self {
        Self {
            table,
            consolidated,
            primary_label: primary_label.into(),
            counterparty_label: counterparty_label.into(),
        }
    }

    pub fn from_config(config: &ReconConfig) -> Self {
        Self::new(
            config.venues.clone(),
            config.consolidated.venues.clone(),
            config.consolidated.primary_label.clone(),
            config.consolidated.counterparty_label.clone(),
        )
    }

    /// Canonical name for `code`; unmapped codes come back verbatim.
    pub fn canonical<'a>(&'a self, code: &'a str) -> &'a str {
        self.table.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Whether `code`, once mapped, belongs to the consolidated set.
    pub fn is_consolidated(&self, code: &str) -> bool {
        self.consolidated.contains(self.canonical(code))
    }

    /// The consolidated sentinel for a lineage. Case differs by lineage.
    pub fn sentinel(&self, lineage: Lineage) -> &str {
        match lineage {
            Lineage::Primary => &self.primary_label,
            Lineage::Counterparty => &self.counterparty_label,
        }
    }

    /// Force liquidity to the lineage sentinel on every row whose mapped venue
    /// is consolidated. The venue field itself is left as reported.
    pub fn reclassify(&self, rows: Vec<NormalizedRow>) -> Vec<NormalizedRow> {
        let mut forced = 0usize;
        let out: Vec<NormalizedRow> = rows
            .into_iter()
            .map(|mut row| {
                let consolidated = row.venue.as_deref().is_some_and(|v| self.is_consolidated(v));
                if consolidated {
                    row.liquidity = Some(self.sentinel(row.lineage).to_string());
                    forced += 1;
                }
                row
            })
            .collect();
        log::debug!("reclassified {forced} of {} rows as consolidated", out.len());
        out
    }

    pub fn table(&self) -> &BTreeMap<String, String> {
        &self.table
    }

    pub fn consolidated(&self) -> &BTreeSet<String> {
        &self.consolidated
    }
}

impl Default for VenueMapper {
    fn default() -> Self {
        Self::from_config(&ReconConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lineage: Lineage, venue: Option<&str>, liquidity: Option<&str>) -> NormalizedRow {
        NormalizedRow {
            lineage,
            venue: venue.map(Into::into),
            liquidity: liquidity.map(Into::into),
            quantity: Some(1.0),
            fee: None,
            exec_fee: None,
        }
    }

    #[test]
    fn canonical_maps_and_passes_through() {
        let m = VenueMapper::default();
        assert_eq!(m.canonical("XNYS"), "NYSE");
        assert_eq!(m.canonical("NYSD"), "NYSE");
        assert_eq!(m.canonical("IEXG"), "IEX");
        assert_eq!(m.canonical("ZZZZ"), "ZZZZ");
        // already-canonical names are not in the table and survive as-is
        assert_eq!(m.canonical("NYSE"), "NYSE");
    }

    #[test]
    fn consolidated_checks_mapped_name() {
        let m = VenueMapper::default();
        assert!(m.is_consolidated("BATY")); // -> BATS-BYX
        assert!(m.is_consolidated("EDDP")); // -> EDGX
        assert!(m.is_consolidated("INTL"));
        assert!(m.is_consolidated("BATS-BYX"));
        assert!(!m.is_consolidated("HRTF"));
        assert!(!m.is_consolidated("XNYS"));
    }

    #[test]
    fn reclassify_uses_lineage_casing() {
        let m = VenueMapper::default();
        let rows = vec![
            row(Lineage::Primary, Some("BATS"), Some("R")),
            row(Lineage::Primary, Some("XNYS"), Some("R")),
            row(Lineage::Counterparty, Some("BATS"), Some("A")),
        ];
        let out = m.reclassify(rows);
        assert_eq!(out[0].liquidity.as_deref(), Some("Consolidated"));
        assert_eq!(out[1].liquidity.as_deref(), Some("R"));
        assert_eq!(out[2].liquidity.as_deref(), Some("consolidated"));
        // venue code untouched
        assert_eq!(out[0].venue.as_deref(), Some("BATS"));
    }

    #[test]
    fn reclassify_fills_missing_liquidity() {
        let m = VenueMapper::default();
        let out = m.reclassify(vec![
            row(Lineage::Primary, Some("EDGA"), None),
            row(Lineage::Primary, None, None),
        ]);
        assert_eq!(out[0].liquidity.as_deref(), Some("Consolidated"));
        assert_eq!(out[1].liquidity, None);
    }

    #[test]
    fn injected_tables() {
        let table = BTreeMap::from([("XPHL".to_string(), "PSX".to_string())]);
        let consolidated = BTreeSet::from(["PSX".to_string()]);
        let m = VenueMapper::new(table, consolidated, "CONS", "CONS");
        assert_eq!(m.canonical("XPHL"), "PSX");
        assert_eq!(m.canonical("XNYS"), "XNYS");
        assert_eq!(m.sentinel(Lineage::Primary), m.sentinel(Lineage::Counterparty));
        let out = m.reclassify(vec![row(Lineage::Counterparty, Some("XPHL"), Some("A"))]);
        assert_eq!(out[0].liquidity.as_deref(), Some("CONS"));
    }
}
