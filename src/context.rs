//! Per-run bookkeeping threaded through every pipeline stage.
//!
//! A [`RunContext`] is created once per run, owns the schema in use and
//! accumulates the row-level defect tallies that end up in the KPI summary.
//! Nothing in here outlives the run.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::schema::{CanonicalField, CanonicalSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    MissingRequired(CanonicalField),
    Duplicate,
}

impl DropReason {
    /// Flat key used in the KPI summary, e.g. `missing_sales`.
    pub fn key(&self) -> String {
        match self {
            DropReason::MissingRequired(field) => format!("missing_{field}"),
            DropReason::Duplicate => "duplicate".to_string(),
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingRequired(field) => write!(f, "missing required {field}"),
            DropReason::Duplicate => f.write_str("exact duplicate"),
        }
    }
}

/// Structurally valid values that were nulled because they are out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Anomaly {
    NegativeQuantity,
    DiscountOutOfRange,
}

impl Anomaly {
    pub fn key(&self) -> &'static str {
        match self {
            Anomaly::NegativeQuantity => "negative_quantity",
            Anomaly::DiscountOutOfRange => "discount_out_of_range",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub schema: CanonicalSchema,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub input_label: String,
    pub input_sha256: Option<String>,
    input_rows: usize,
    drops: BTreeMap<DropReason, usize>,
    anomalies: BTreeMap<Anomaly, usize>,
    parse_failures: BTreeMap<CanonicalField, usize>,
}

impl RunContext {
    pub fn new(schema: CanonicalSchema, input_label: impl Into<String>) -> Self {
        Self {
            schema,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            input_label: input_label.into(),
            input_sha256: None,
            input_rows: 0,
            drops: BTreeMap::new(),
            anomalies: BTreeMap::new(),
            parse_failures: BTreeMap::new(),
        }
    }

    pub fn with_fingerprint(mut self, sha256: impl Into<String>) -> Self {
        self.input_sha256 = Some(sha256.into());
        self
    }

    pub fn set_input_rows(&mut self, rows: usize) {
        self.input_rows = rows;
    }

    pub fn input_rows(&self) -> usize {
        self.input_rows
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        *self.drops.entry(reason).or_insert(0) += 1;
    }

    pub fn record_anomaly(&mut self, anomaly: Anomaly) {
        *self.anomalies.entry(anomaly).or_insert(0) += 1;
    }

    pub fn record_parse_failure(&mut self, field: CanonicalField) {
        *self.parse_failures.entry(field).or_insert(0) += 1;
    }

    pub fn dropped_rows(&self) -> usize {
        self.drops.values().sum()
    }

    pub fn drops(&self) -> &BTreeMap<DropReason, usize> {
        &self.drops
    }

    pub fn drop_count(&self, reason: DropReason) -> usize {
        self.drops.get(&reason).copied().unwrap_or(0)
    }

    pub fn anomalies(&self) -> &BTreeMap<Anomaly, usize> {
        &self.anomalies
    }

    pub fn anomaly_count(&self, anomaly: Anomaly) -> usize {
        self.anomalies.get(&anomaly).copied().unwrap_or(0)
    }

    pub fn parse_failures(&self) -> &BTreeMap<CanonicalField, usize> {
        &self.parse_failures
    }

    pub fn parse_failure_total(&self) -> usize {
        self.parse_failures.values().sum()
    }
}
