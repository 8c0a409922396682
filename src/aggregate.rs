//! Grouped summaries, the monthly series and the top products ranking.
//!
//! Every view is a fold over the cleaned records. Null profits are left out of
//! profit sums and out of the margin denominator; they never count as zero.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use itertools::Itertools;
use log::warn;
use rust_decimal::Decimal;

use crate::{
    clean::{CanonicalRecord, margin},
    data::YearMonth,
    schema::CanonicalField,
};

pub const TOP_PRODUCTS: usize = 10;

/// Running sales/profit totals shared by every grouped view and the KPIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesTotals {
    pub sales: Decimal,
    pub profit: Option<Decimal>,
    /// Sales of the rows that carry a profit value; the margin denominator.
    pub profit_sales: Decimal,
    pub rows: usize,
}

impl SalesTotals {
    pub fn add(&mut self, record: &CanonicalRecord) {
        self.sales = accumulate(self.sales, record.sales);
        self.rows += 1;
        if let Some(profit) = record.profit {
            self.profit = Some(accumulate(self.profit.unwrap_or_default(), profit));
            self.profit_sales = accumulate(self.profit_sales, record.sales);
        }
    }

    pub fn margin(&self) -> Option<f64> {
        margin(self.profit?, self.profit_sales)
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        let mut totals = Self::default();
        for record in records {
            totals.add(record);
        }
        totals
    }
}

/// Checked sum that pins at the `Decimal` limit instead of panicking. Parsed
/// cells are bounded well below it, so only hand-built records can reach it.
fn accumulate(total: Decimal, value: Decimal) -> Decimal {
    total.checked_add(value).unwrap_or_else(|| {
        warn!("Decimal sum overflowed; pinning total at the type limit");
        if value.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDimension {
    Category,
    SubCategory,
    Region,
    State,
}

impl GroupDimension {
    pub const ALL: [GroupDimension; 4] = [
        GroupDimension::Category,
        GroupDimension::SubCategory,
        GroupDimension::Region,
        GroupDimension::State,
    ];

    pub fn field(&self) -> CanonicalField {
        match self {
            GroupDimension::Category => CanonicalField::Category,
            GroupDimension::SubCategory => CanonicalField::SubCategory,
            GroupDimension::Region => CanonicalField::Region,
            GroupDimension::State => CanonicalField::State,
        }
    }

    /// Suffix used in output file names, e.g. `group_by_subcategory.csv`.
    pub fn slug(&self) -> &'static str {
        match self {
            GroupDimension::Category => "category",
            GroupDimension::SubCategory => "subcategory",
            GroupDimension::Region => "region",
            GroupDimension::State => "state",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub total_sales: Decimal,
    pub total_profit: Option<Decimal>,
    pub margin: Option<f64>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub dimension: GroupDimension,
    pub rows: Vec<GroupRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub year_month: YearMonth,
    pub total_sales: Decimal,
    pub total_profit: Option<Decimal>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRank {
    pub rank: usize,
    pub product_name: String,
    pub total_sales: Decimal,
    pub total_profit: Option<Decimal>,
    pub margin: Option<f64>,
    pub row_count: usize,
}

/// Descending order with nulls after every value.
fn desc_nulls_last(a: Option<Decimal>, b: Option<Decimal>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn totals_by<'a, F>(records: &'a [CanonicalRecord], key: F) -> HashMap<&'a str, SalesTotals>
where
    F: Fn(&'a CanonicalRecord) -> Option<&'a str>,
{
    let mut groups: HashMap<&str, SalesTotals> = HashMap::new();
    for record in records {
        if let Some(value) = key(record) {
            groups.entry(value).or_default().add(record);
        }
    }
    groups
}

/// Records with a null key are left out of the view.
pub fn group_summary(records: &[CanonicalRecord], dimension: GroupDimension) -> GroupSummary {
    let field = dimension.field();
    let rows = totals_by(records, |record| record.text(field))
        .into_iter()
        .map(|(key, totals)| GroupRow {
            key: key.to_string(),
            total_sales: totals.sales,
            total_profit: totals.profit,
            margin: totals.margin(),
            row_count: totals.rows,
        })
        .sorted_by(|a, b| {
            b.total_sales
                .cmp(&a.total_sales)
                .then_with(|| a.key.cmp(&b.key))
        })
        .collect();
    GroupSummary { dimension, rows }
}

pub fn group_summaries(records: &[CanonicalRecord]) -> Vec<GroupSummary> {
    GroupDimension::ALL
        .iter()
        .map(|dimension| group_summary(records, *dimension))
        .collect()
}

/// Only months present in the data appear; gaps are not filled.
pub fn monthly_series(records: &[CanonicalRecord]) -> Vec<MonthlyRow> {
    let mut months: BTreeMap<YearMonth, SalesTotals> = BTreeMap::new();
    for record in records {
        months.entry(record.order_year_month).or_default().add(record);
    }
    months
        .into_iter()
        .map(|(year_month, totals)| MonthlyRow {
            year_month,
            total_sales: totals.sales,
            total_profit: totals.profit,
            row_count: totals.rows,
        })
        .collect()
}

/// Ranks products by sales, then profit, then name.
pub fn top_products(records: &[CanonicalRecord], limit: usize) -> Vec<ProductRank> {
    totals_by(records, |record| record.product_name.as_deref())
        .into_iter()
        .sorted_by(|(a_name, a), (b_name, b)| {
            b.sales
                .cmp(&a.sales)
                .then_with(|| desc_nulls_last(a.profit, b.profit))
                .then_with(|| a_name.cmp(b_name))
        })
        .take(limit)
        .enumerate()
        .map(|(idx, (name, totals))| ProductRank {
            rank: idx + 1,
            product_name: name.to_string(),
            total_sales: totals.sales,
            total_profit: totals.profit,
            margin: totals.margin(),
            row_count: totals.rows,
        })
        .collect()
}
