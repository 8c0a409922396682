//! KPI Summarizer: a flat snapshot of business totals plus run metadata.

use std::collections::BTreeMap;

use anyhow::{Result, ensure};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{aggregate::SalesTotals, clean::CleanedSet, context::RunContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,
    pub input_rows: usize,
    pub surviving_rows: usize,
    pub dropped_rows: usize,
    /// Per-reason drop counts, flattened as `dropped_<reason>`.
    #[serde(flatten)]
    pub drop_breakdown: BTreeMap<String, usize>,
    /// Nulled out-of-range values, flattened as `nulled_<anomaly>`.
    #[serde(flatten)]
    pub anomalies: BTreeMap<String, usize>,
    pub parse_failures: usize,
    pub total_sales: Decimal,
    pub total_profit: Option<Decimal>,
    pub overall_margin: Option<f64>,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
}

impl KpiSummary {
    /// Key/value pairs in output order, for console preview.
    pub fn entries(&self) -> Vec<(String, String)> {
        let optional = |value: Option<String>| value.unwrap_or_default();
        let mut entries = vec![
            ("run_id".to_string(), self.run_id.to_string()),
            ("generated_at".to_string(), self.generated_at.to_rfc3339()),
            ("input_file".to_string(), self.input_file.clone()),
            ("input_rows".to_string(), self.input_rows.to_string()),
            ("surviving_rows".to_string(), self.surviving_rows.to_string()),
            ("dropped_rows".to_string(), self.dropped_rows.to_string()),
        ];
        entries.extend(
            self.drop_breakdown
                .iter()
                .chain(self.anomalies.iter())
                .map(|(key, count)| (key.clone(), count.to_string())),
        );
        entries.extend([
            ("parse_failures".to_string(), self.parse_failures.to_string()),
            ("total_sales".to_string(), self.total_sales.to_string()),
            (
                "total_profit".to_string(),
                optional(self.total_profit.map(|p| p.to_string())),
            ),
            (
                "overall_margin".to_string(),
                optional(self.overall_margin.map(|m| format!("{m:.6}"))),
            ),
            (
                "date_range_start".to_string(),
                optional(self.date_range_start.map(|d| d.to_string())),
            ),
            (
                "date_range_end".to_string(),
                optional(self.date_range_end.map(|d| d.to_string())),
            ),
        ]);
        entries
    }
}

pub fn summarize(ctx: &RunContext, cleaned: &CleanedSet) -> Result<KpiSummary> {
    let surviving = cleaned.len();
    let dropped = ctx.dropped_rows();
    ensure!(
        surviving + dropped == ctx.input_rows(),
        "Row accounting mismatch: {surviving} surviving + {dropped} dropped != {} input",
        ctx.input_rows()
    );

    let totals = SalesTotals::from_records(cleaned.records());
    let dates = cleaned.records().iter().map(|r| r.order_date);
    let date_range_start = dates.clone().min();
    let date_range_end = dates.max();

    Ok(KpiSummary {
        run_id: ctx.run_id,
        generated_at: ctx.started_at,
        input_file: ctx.input_label.clone(),
        input_sha256: ctx.input_sha256.clone(),
        input_rows: ctx.input_rows(),
        surviving_rows: surviving,
        dropped_rows: dropped,
        drop_breakdown: ctx
            .drops()
            .iter()
            .map(|(reason, count)| (format!("dropped_{}", reason.key()), *count))
            .collect(),
        anomalies: ctx
            .anomalies()
            .iter()
            .map(|(anomaly, count)| (format!("nulled_{}", anomaly.key()), *count))
            .collect(),
        parse_failures: ctx.parse_failure_total(),
        overall_margin: totals.margin(),
        total_sales: totals.sales,
        total_profit: totals.profit,
        date_range_start,
        date_range_end,
    })
}
