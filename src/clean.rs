//! Record Cleaner: required-field policy, range clamping, exact-match
//! deduplication and derived fields.
//!
//! Rows are visited in input order. A row missing a required value is
//! dropped; out-of-range quantity/discount values are nulled before the
//! duplicate check so a second pass over the output removes nothing.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    context::{Anomaly, DropReason, RunContext},
    data::YearMonth,
    normalize::NormalizedRecord,
    schema::CanonicalField,
};

/// One cleaned sales order line.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub order_id: Option<String>,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub ship_mode: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub product_name: Option<String>,
    pub sales: Decimal,
    pub profit: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub shipping_delay_days: i64,
    pub profit_margin: Option<f64>,
    pub order_year: i32,
    pub order_year_month: YearMonth,
}

impl CanonicalRecord {
    /// Derives computed fields, or names the layout field that is absent.
    fn derive(record: NormalizedRecord) -> Result<Self, CanonicalField> {
        let order_date = record.order_date.ok_or(CanonicalField::OrderDate)?;
        let ship_date = record.ship_date.ok_or(CanonicalField::ShipDate)?;
        let sales = record.sales.ok_or(CanonicalField::Sales)?;
        Ok(Self {
            shipping_delay_days: (ship_date - order_date).num_days(),
            profit_margin: record.profit.and_then(|profit| margin(profit, sales)),
            order_year: order_date.year(),
            order_year_month: YearMonth::from_date(order_date),
            order_id: record.order_id,
            order_date,
            ship_date,
            ship_mode: record.ship_mode,
            region: record.region,
            state: record.state,
            category: record.category,
            sub_category: record.sub_category,
            product_name: record.product_name,
            sales,
            profit: record.profit,
            quantity: record.quantity,
            discount: record.discount,
        })
    }

    pub fn text(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::OrderId => self.order_id.as_deref(),
            CanonicalField::ShipMode => self.ship_mode.as_deref(),
            CanonicalField::Region => self.region.as_deref(),
            CanonicalField::State => self.state.as_deref(),
            CanonicalField::Category => self.category.as_deref(),
            CanonicalField::SubCategory => self.sub_category.as_deref(),
            CanonicalField::ProductName => self.product_name.as_deref(),
            _ => None,
        }
    }
}

impl From<&CanonicalRecord> for NormalizedRecord {
    fn from(record: &CanonicalRecord) -> Self {
        NormalizedRecord {
            order_id: record.order_id.clone(),
            order_date: Some(record.order_date),
            ship_date: Some(record.ship_date),
            ship_mode: record.ship_mode.clone(),
            region: record.region.clone(),
            state: record.state.clone(),
            category: record.category.clone(),
            sub_category: record.sub_category.clone(),
            product_name: record.product_name.clone(),
            sales: Some(record.sales),
            profit: record.profit,
            quantity: record.quantity,
            discount: record.discount,
        }
    }
}

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn margin(numerator: Decimal, denominator: Decimal) -> Option<f64> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)?.to_f64()
}

/// The immutable output of the cleaner, shared by every downstream view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedSet {
    records: Vec<CanonicalRecord>,
}

impl CleanedSet {
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_normalized(&self) -> Vec<NormalizedRecord> {
        self.records.iter().map(NormalizedRecord::from).collect()
    }
}

fn clamp_out_of_range(record: &mut NormalizedRecord, ctx: &mut RunContext) {
    if record.quantity.is_some_and(|q| q < Decimal::ZERO) {
        record.quantity = None;
        ctx.record_anomaly(Anomaly::NegativeQuantity);
    }
    if record
        .discount
        .is_some_and(|d| d < Decimal::ZERO || d > Decimal::ONE)
    {
        record.discount = None;
        ctx.record_anomaly(Anomaly::DiscountOutOfRange);
    }
}

pub fn clean(ctx: &mut RunContext, rows: Vec<NormalizedRecord>) -> CleanedSet {
    let required = ctx.schema.required_fields().collect::<Vec<_>>();
    let mut seen: HashSet<NormalizedRecord> = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());

    for mut row in rows {
        if let Some(field) = required.iter().find(|field| !row.is_present(**field)) {
            ctx.record_drop(DropReason::MissingRequired(*field));
            continue;
        }
        clamp_out_of_range(&mut row, ctx);
        if !seen.insert(row.clone()) {
            ctx.record_drop(DropReason::Duplicate);
            continue;
        }
        match CanonicalRecord::derive(row) {
            Ok(record) => records.push(record),
            Err(field) => ctx.record_drop(DropReason::MissingRequired(field)),
        }
    }

    let dropped = ctx.dropped_rows();
    if dropped > 0 {
        warn!("Dropped {dropped} row(s) during cleaning");
        for (reason, count) in ctx.drops() {
            info!("  {reason}: {count}");
        }
    }
    for (anomaly, count) in ctx.anomalies() {
        warn!("Nulled {count} value(s): {}", anomaly.key());
    }
    CleanedSet { records }
}
