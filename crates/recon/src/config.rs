use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Source venue code -> canonical venue name.
pub const DEFAULT_VENUES: &[(&str, &str)] = &[
    ("XASE", "AMEX"),
    ("ARCX", "ARCA"),
    ("BATS", "BATS"),
    ("BATY", "BATS-BYX"),
    ("HRTF", "BROKER TRADES - HRTF"),
    ("INTL", "BROKER TRADES - INTL"),
    ("EDGA", "EDGA"),
    ("EDGX", "EDGX"),
    ("EDDP", "EDGX"),
    ("IEXD", "IEX"),
    ("IEXG", "IEX"),
    ("BAML", "INTERNAL CROSSING"),
    ("MEMX", "MEMX"),
    ("EPRL", "MIAX"),
    ("NASD", "NASDAQ"),
    ("XNAS", "NASDAQ"),
    ("KNLI", "NITE"),
    ("XBOS", "NQBX"),
    ("XNYS", "NYSE"),
    ("NYSD", "NYSE"),
    ("XCIS", "NYSE National"),
];

/// Canonical venues whose liquidity collapses into the consolidated bucket.
pub const DEFAULT_CONSOLIDATED: &[&str] = &["BATS", "BATS-BYX", "BROKER TRADES - INTL", "EDGA", "EDGX"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Static reconciliation configuration. Every table is optional; an empty
/// document yields the built-in behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Replaces the built-in venue table when present.
    #[serde(default = "default_venues")]
    pub venues: BTreeMap<String, String>,
    #[serde(default)]
    pub consolidated: ConsolidatedConfig,
    #[serde(default)]
    pub primary: PrimarySource,
    #[serde(default)]
    pub counterparty: CounterpartySource,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "trade report reconciliation".into()
}

fn default_venues() -> BTreeMap<String, String> {
    DEFAULT_VENUES
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            venues: default_venues(),
            consolidated: ConsolidatedConfig::default(),
            primary: PrimarySource::default(),
            counterparty: CounterpartySource::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Consolidated bucket
// ---------------------------------------------------------------------------

/// The sentinel labels differ in case by lineage. A join on a consolidated
/// venue only succeeds when both labels are equal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsolidatedConfig {
    #[serde(default = "default_consolidated_venues")]
    pub venues: BTreeSet<String>,
    #[serde(default = "default_primary_label")]
    pub primary_label: String,
    #[serde(default = "default_counterparty_label")]
    pub counterparty_label: String,
}

fn default_consolidated_venues() -> BTreeSet<String> {
    DEFAULT_CONSOLIDATED.iter().map(|v| v.to_string()).collect()
}

fn default_primary_label() -> String {
    "Consolidated".into()
}

fn default_counterparty_label() -> String {
    "consolidated".into()
}

impl Default for ConsolidatedConfig {
    fn default() -> Self {
        Self {
            venues: default_consolidated_venues(),
            primary_label: default_primary_label(),
            counterparty_label: default_counterparty_label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrimarySource {
    #[serde(default)]
    pub columns: PrimaryColumns,
}

/// Header names in the primary (clearing) report. Matched exactly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrimaryColumns {
    pub quantity: String,
    pub venue: String,
    pub algo_fee: String,
    pub exec_fee: String,
    pub liquidity: String,
}

impl Default for PrimaryColumns {
    fn default() -> Self {
        Self {
            quantity: "Quantity".into(),
            venue: "Contra Firm".into(),
            algo_fee: "Algo Fee".into(),
            exec_fee: "Exec Fees".into(),
            liquidity: "Contra Firm Route".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CounterpartySource {
    #[serde(default)]
    pub columns: CounterpartyColumns,
}

/// Header names in the counterparty report. Matched after trimming
/// surrounding whitespace from the file's headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CounterpartyColumns {
    pub venue: String,
    pub quantity: String,
    pub transaction_fee: String,
    pub exec_fee: String,
    pub liquidity: String,
}

impl Default for CounterpartyColumns {
    fn default() -> Self {
        Self {
            venue: "Exchange".into(),
            quantity: "Quantity".into(),
            transaction_fee: "Passed Exchange Transaction Fees".into(),
            exec_fee: "Exec Fees".into(),
            liquidity: "Liquidity".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Lineage suffixes for the comparison table's measure columns.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub primary_suffix: String,
    pub counterparty_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            primary_suffix: "primary".into(),
            counterparty_suffix: "counterparty".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        // Mapped venues must never come out empty
        for (code, name) in &self.venues {
            if name.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "venue '{code}' maps to an empty name"
                )));
            }
        }

        let c = &self.consolidated;
        if c.primary_label.is_empty() || c.counterparty_label.is_empty() {
            return Err(ReconError::ConfigValidation(
                "consolidated labels must not be empty".into(),
            ));
        }

        let o = &self.output;
        if o.primary_suffix.is_empty() || o.counterparty_suffix.is_empty() {
            return Err(ReconError::ConfigValidation(
                "output suffixes must not be empty".into(),
            ));
        }
        if o.primary_suffix == o.counterparty_suffix {
            return Err(ReconError::ConfigValidation(format!(
                "output suffixes must differ, both are '{}'",
                o.primary_suffix
            )));
        }

        let p = &self.primary.columns;
        let cp = &self.counterparty.columns;
        let columns = [
            ("primary.columns.quantity", &p.quantity),
            ("primary.columns.venue", &p.venue),
            ("primary.columns.algo_fee", &p.algo_fee),
            ("primary.columns.exec_fee", &p.exec_fee),
            ("primary.columns.liquidity", &p.liquidity),
            ("counterparty.columns.venue", &cp.venue),
            ("counterparty.columns.quantity", &cp.quantity),
            ("counterparty.columns.transaction_fee", &cp.transaction_fee),
            ("counterparty.columns.exec_fee", &cp.exec_fee),
            ("counterparty.columns.liquidity", &cp.liquidity),
        ];
        for (field, value) in columns {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
