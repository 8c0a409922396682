//! Descriptive statistics over the cleaned set.
//!
//! Numeric measures get count, mean, sample standard deviation, min,
//! quartiles and max over their non-null values. Categorical dimensions get
//! the distinct-value count and the most frequent value; ties go to the value
//! encountered first in the cleaned set.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;

use crate::{
    clean::CanonicalRecord,
    schema::{CanonicalField, DerivedField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Sales,
    Profit,
    Quantity,
    Discount,
    ShippingDelayDays,
    ProfitMargin,
}

impl Measure {
    pub const ALL: [Measure; 6] = [
        Measure::Sales,
        Measure::Profit,
        Measure::Quantity,
        Measure::Discount,
        Measure::ShippingDelayDays,
        Measure::ProfitMargin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Sales => CanonicalField::Sales.as_str(),
            Measure::Profit => CanonicalField::Profit.as_str(),
            Measure::Quantity => CanonicalField::Quantity.as_str(),
            Measure::Discount => CanonicalField::Discount.as_str(),
            Measure::ShippingDelayDays => DerivedField::ShippingDelayDays.as_str(),
            Measure::ProfitMargin => DerivedField::ProfitMargin.as_str(),
        }
    }

    fn value(&self, record: &CanonicalRecord) -> Option<f64> {
        match self {
            Measure::Sales => record.sales.to_f64(),
            Measure::Profit => record.profit.and_then(|v| v.to_f64()),
            Measure::Quantity => record.quantity.and_then(|v| v.to_f64()),
            Measure::Discount => record.discount.and_then(|v| v.to_f64()),
            Measure::ShippingDelayDays => Some(record.shipping_delay_days as f64),
            Measure::ProfitMargin => record.profit_margin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Field(CanonicalField),
    OrderYearMonth,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::Field(CanonicalField::OrderId),
        Dimension::Field(CanonicalField::ShipMode),
        Dimension::Field(CanonicalField::Region),
        Dimension::Field(CanonicalField::State),
        Dimension::Field(CanonicalField::Category),
        Dimension::Field(CanonicalField::SubCategory),
        Dimension::Field(CanonicalField::ProductName),
        Dimension::OrderYearMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Field(field) => field.as_str(),
            Dimension::OrderYearMonth => DerivedField::OrderYearMonth.as_str(),
        }
    }

    fn value(&self, record: &CanonicalRecord) -> Option<String> {
        match self {
            Dimension::Field(field) => record.text(*field).map(str::to_string),
            Dimension::OrderYearMonth => Some(record.order_year_month.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalSummary {
    pub column: String,
    pub count: usize,
    pub distinct: usize,
    pub mode: Option<String>,
    pub mode_frequency: usize,
}

struct ColumnStats {
    values: Vec<f64>,
}

impl ColumnStats {
    fn collect(records: &[CanonicalRecord], measure: Measure) -> Self {
        let mut values = records
            .iter()
            .filter_map(|record| measure.value(record))
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self { values }
    }

    fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Sample standard deviation (n - 1 denominator).
    fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let squares = self
            .values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>();
        Some((squares / (self.values.len() as f64 - 1.0)).sqrt())
    }

    /// Linear interpolation between closest ranks.
    fn quantile(&self, q: f64) -> Option<f64> {
        let last = self.values.len().checked_sub(1)?;
        let position = last as f64 * q;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let low = self.values[lower];
        let high = self.values[upper];
        Some(low + (high - low) * (position - lower as f64))
    }

    fn summarize(&self, column: &str) -> NumericSummary {
        NumericSummary {
            column: column.to_string(),
            count: self.values.len(),
            mean: self.mean(),
            std_dev: self.std_dev(),
            min: self.values.first().copied(),
            q25: self.quantile(0.25),
            median: self.quantile(0.5),
            q75: self.quantile(0.75),
            max: self.values.last().copied(),
        }
    }
}

pub fn describe_measure(records: &[CanonicalRecord], measure: Measure) -> NumericSummary {
    ColumnStats::collect(records, measure).summarize(measure.as_str())
}

pub fn describe_numeric(records: &[CanonicalRecord]) -> Vec<NumericSummary> {
    Measure::ALL
        .iter()
        .map(|measure| describe_measure(records, *measure))
        .collect()
}

pub fn describe_dimension(records: &[CanonicalRecord], dimension: Dimension) -> CategoricalSummary {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut count = 0usize;
    for value in records.iter().filter_map(|record| dimension.value(record)) {
        count += 1;
        if let Some(idx) = positions.get(&value).copied() {
            order[idx].1 += 1;
        } else {
            positions.insert(value.clone(), order.len());
            order.push((value, 1));
        }
    }

    let mut best: Option<&(String, usize)> = None;
    for entry in &order {
        if best.is_none_or(|current| entry.1 > current.1) {
            best = Some(entry);
        }
    }
    CategoricalSummary {
        column: dimension.as_str().to_string(),
        count,
        distinct: order.len(),
        mode: best.map(|(value, _)| value.clone()),
        mode_frequency: best.map(|(_, freq)| *freq).unwrap_or(0),
    }
}

pub fn describe_categorical(records: &[CanonicalRecord]) -> Vec<CategoricalSummary> {
    Dimension::ALL
        .iter()
        .map(|dimension| describe_dimension(records, *dimension))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::YearMonth;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn record(region: Option<&str>, sales: i64, quantity: Option<i64>) -> CanonicalRecord {
        let order_date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        CanonicalRecord {
            order_id: Some("A".to_string()),
            order_date,
            ship_date: order_date,
            ship_mode: None,
            region: region.map(str::to_string),
            state: None,
            category: None,
            sub_category: None,
            product_name: None,
            sales: Decimal::from(sales),
            profit: None,
            quantity: quantity.map(Decimal::from),
            discount: None,
            shipping_delay_days: 0,
            profit_margin: None,
            order_year: 2023,
            order_year_month: YearMonth::from_date(order_date),
        }
    }

    #[test]
    fn numeric_summary_matches_hand_computed_values() {
        let records = [1, 2, 3, 4]
            .into_iter()
            .map(|s| record(None, s, Some(s)))
            .collect::<Vec<_>>();
        let summary = describe_measure(&records, Measure::Sales);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, Some(2.5));
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.q25, Some(1.75));
        assert_eq!(summary.median, Some(2.5));
        assert_eq!(summary.q75, Some(3.25));
        assert_eq!(summary.max, Some(4.0));
        let std = summary.std_dev.unwrap();
        assert!((std - 1.2909944487).abs() < 1e-9);
    }

    #[test]
    fn all_null_measure_yields_nulls() {
        let records = vec![record(None, 1, None), record(None, 2, None)];
        let summary = describe_measure(&records, Measure::Quantity);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.median, None);
        assert_eq!(summary.max, None);
    }

    #[test]
    fn single_value_has_no_std_dev() {
        let summary = describe_measure(&[record(None, 7, None)], Measure::Sales);
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.q75, Some(7.0));
    }

    #[test]
    fn mode_ties_go_to_first_encountered() {
        let records = vec![
            record(Some("West"), 1, None),
            record(Some("East"), 1, None),
            record(None, 1, None),
            record(Some("East"), 1, None),
            record(Some("West"), 1, None),
        ];
        let summary = describe_dimension(&records, Dimension::Field(CanonicalField::Region));
        assert_eq!(summary.count, 4);
        assert_eq!(summary.distinct, 2);
        assert_eq!(summary.mode.as_deref(), Some("West"));
        assert_eq!(summary.mode_frequency, 2);
    }

    #[test]
    fn empty_dimension_has_no_mode() {
        let summary = describe_dimension(&[], Dimension::Field(CanonicalField::State));
        assert_eq!(summary.distinct, 0);
        assert_eq!(summary.mode, None);
        assert_eq!(summary.mode_frequency, 0);
    }

    #[test]
    fn describes_every_measure_and_dimension() {
        let records = vec![record(Some("West"), 1, Some(1))];
        assert_eq!(describe_numeric(&records).len(), Measure::ALL.len());
        let categorical = describe_categorical(&records);
        assert_eq!(categorical.len(), Dimension::ALL.len());
        assert_eq!(categorical[7].mode.as_deref(), Some("2023-01"));
    }
}
