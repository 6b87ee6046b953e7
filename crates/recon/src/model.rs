use serde::Serialize;

// ---------------------------------------------------------------------------
// Lineage + measures
// ---------------------------------------------------------------------------

/// Which report a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lineage {
    /// Internal clearing / back-office feed.
    Primary,
    /// Third-party execution venue report.
    Counterparty,
}

impl std::fmt::Display for Lineage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Counterparty => write!(f, "counterparty"),
        }
    }
}

/// The three reconciled measures, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Quantity,
    TransactionFee,
    ExecFee,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Quantity, Measure::TransactionFee, Measure::ExecFee];

    /// Column label used in the comparison table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quantity => "Quantity",
            Self::TransactionFee => "Passed Exchange Transaction Fees",
            Self::ExecFee => "Exec Fees",
        }
    }
}

/// Summed (or differenced) values of the three measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measures {
    pub quantity: f64,
    pub transaction_fee: f64,
    pub exec_fee: f64,
}

impl Measures {
    pub fn get(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Quantity => self.quantity,
            Measure::TransactionFee => self.transaction_fee,
            Measure::ExecFee => self.exec_fee,
        }
    }

    /// Add a row's values; missing values contribute nothing.
    pub fn accumulate(&mut self, row: &NormalizedRow) {
        self.quantity += row.quantity.unwrap_or(0.0);
        self.transaction_fee += row.fee.unwrap_or(0.0);
        self.exec_fee += row.exec_fee.unwrap_or(0.0);
    }

    pub fn merge(&mut self, other: &Measures) {
        self.quantity += other.quantity;
        self.transaction_fee += other.transaction_fee;
        self.exec_fee += other.exec_fee;
    }

    /// Component-wise `self - other`.
    pub fn minus(&self, other: &Measures) -> Measures {
        Measures {
            quantity: self.quantity - other.quantity,
            transaction_fee: self.transaction_fee - other.transaction_fee,
            exec_fee: self.exec_fee - other.exec_fee,
        }
    }

    pub fn any_nonzero(&self) -> bool {
        Measure::ALL.iter().any(|m| self.get(*m) != 0.0)
    }
}

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// A single report row after ingestion, in the schema shared by both sources.
///
/// `fee` holds the algo fee for primary rows and the passed exchange
/// transaction fee for counterparty rows. `venue` is the raw venue code as
/// reported; canonicalization happens at grouping time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub lineage: Lineage,
    pub venue: Option<String>,
    pub liquidity: Option<String>,
    pub quantity: Option<f64>,
    pub fee: Option<f64>,
    pub exec_fee: Option<f64>,
}

impl NormalizedRow {
    /// Venue and liquidity, when both are present.
    pub fn key_parts(&self) -> Option<(&str, &str)> {
        match (&self.venue, &self.liquidity) {
            (Some(v), Some(l)) => Some((v.as_str(), l.as_str())),
            _ => None,
        }
    }

    pub fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Quantity => self.quantity,
            Measure::TransactionFee => self.fee,
            Measure::ExecFee => self.exec_fee,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Join key shared by both sources after canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VenueKey {
    pub venue: String,
    pub liquidity: String,
}

/// First-pass primary group, keyed by the raw (finer-grained) venue code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGroup {
    pub venue_code: String,
    pub liquidity: String,
    pub measures: Measures,
    pub row_count: usize,
}

/// One row per unique (venue, liquidity) pair within a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub venue: String,
    pub liquidity: String,
    pub measures: Measures,
    pub row_count: usize,
}

impl AggregatedRow {
    pub fn key(&self) -> VenueKey {
        VenueKey {
            venue: self.venue.clone(),
            liquidity: self.liquidity.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Inner-join row: both sides' sums plus `primary - counterparty`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub venue: String,
    pub liquidity: String,
    pub primary: Measures,
    pub counterparty: Measures,
    pub discrepancy: Measures,
}

impl ComparisonRow {
    pub fn has_discrepancy(&self) -> bool {
        self.discrepancy.any_nonzero()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinOutput {
    pub comparison: Vec<ComparisonRow>,
    /// Keys present only on the primary side (dropped by the inner join).
    pub primary_only: Vec<VenueKey>,
    /// Keys present only on the counterparty side (dropped by the inner join).
    pub counterparty_only: Vec<VenueKey>,
}

/// Transaction-level rows behind every discrepant comparison row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscrepancyAudit {
    pub primary: Vec<NormalizedRow>,
    pub counterparty: Vec<NormalizedRow>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Per-measure count of rows whose value was empty or unparseable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MissingCounts {
    pub quantity: usize,
    pub fee: usize,
    pub exec_fee: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub rows: usize,
    pub missing: MissingCounts,
    /// Rows without a venue or liquidity at grouping time.
    pub unkeyed: usize,
}

/// Largest absolute discrepancy for one measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargestDiscrepancy {
    pub measure: Measure,
    pub venue: String,
    pub liquidity: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub compared_keys: usize,
    pub discrepant_keys: usize,
    pub primary_only_keys: usize,
    pub counterparty_only_keys: usize,
    /// Sum of |discrepancy| per measure.
    pub total_abs_discrepancy: Measures,
    pub largest: Vec<LargestDiscrepancy>,
    pub primary: SourceStats,
    pub counterparty: SourceStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub comparison: Vec<ComparisonRow>,
    pub primary_only: Vec<VenueKey>,
    pub counterparty_only: Vec<VenueKey>,
    pub audit: DiscrepancyAudit,
}

impl ReconResult {
    /// Comparison rows with at least one non-zero discrepancy.
    pub fn discrepancies(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.comparison.iter().filter(|r| r.has_discrepancy())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub primary_suffix: String,
    pub counterparty_suffix: String,
}
