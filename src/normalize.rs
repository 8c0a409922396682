//! Schema Normalizer: raw string rows into partially typed records.
//!
//! Every canonical field is parsed according to its semantic type. Values
//! that fail to parse become `None` and are tallied per field in the
//! [`RunContext`]; the row itself always continues to the cleaner, which
//! makes the keep/drop decision.

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;

use crate::{
    context::RunContext,
    data::{is_placeholder_token, normalize_text, parse_currency_decimal, parse_naive_date},
    schema::{CanonicalField, CanonicalSchema, HeaderBinding, SemanticType},
};

/// One input row after type parsing; any field may be null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedRecord {
    pub order_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub ship_mode: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub product_name: Option<String>,
    pub sales: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub discount: Option<Decimal>,
}

impl NormalizedRecord {
    pub fn is_present(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::OrderId => self.order_id.is_some(),
            CanonicalField::OrderDate => self.order_date.is_some(),
            CanonicalField::ShipDate => self.ship_date.is_some(),
            CanonicalField::ShipMode => self.ship_mode.is_some(),
            CanonicalField::Region => self.region.is_some(),
            CanonicalField::State => self.state.is_some(),
            CanonicalField::Category => self.category.is_some(),
            CanonicalField::SubCategory => self.sub_category.is_some(),
            CanonicalField::ProductName => self.product_name.is_some(),
            CanonicalField::Sales => self.sales.is_some(),
            CanonicalField::Profit => self.profit.is_some(),
            CanonicalField::Quantity => self.quantity.is_some(),
            CanonicalField::Discount => self.discount.is_some(),
        }
    }

    fn set_text(&mut self, field: CanonicalField, value: Option<String>) {
        let slot = match field {
            CanonicalField::OrderId => &mut self.order_id,
            CanonicalField::ShipMode => &mut self.ship_mode,
            CanonicalField::Region => &mut self.region,
            CanonicalField::State => &mut self.state,
            CanonicalField::Category => &mut self.category,
            CanonicalField::SubCategory => &mut self.sub_category,
            CanonicalField::ProductName => &mut self.product_name,
            _ => return,
        };
        *slot = value;
    }

    fn set_date(&mut self, field: CanonicalField, value: Option<NaiveDate>) {
        match field {
            CanonicalField::OrderDate => self.order_date = value,
            CanonicalField::ShipDate => self.ship_date = value,
            _ => {}
        }
    }

    fn set_number(&mut self, field: CanonicalField, value: Option<Decimal>) {
        let slot = match field {
            CanonicalField::Sales => &mut self.sales,
            CanonicalField::Profit => &mut self.profit,
            CanonicalField::Quantity => &mut self.quantity,
            CanonicalField::Discount => &mut self.discount,
            _ => return,
        };
        *slot = value;
    }
}

/// Parses one row. Returns the record and the fields whose values failed to parse.
pub fn normalize_row(
    schema: &CanonicalSchema,
    binding: &HeaderBinding,
    raw: &[String],
) -> (NormalizedRecord, Vec<CanonicalField>) {
    let mut record = NormalizedRecord::default();
    let mut failures = Vec::new();
    for field in CanonicalField::ALL {
        let value = binding
            .position(field)
            .and_then(|idx| raw.get(idx))
            .map(|s| s.as_str())
            .unwrap_or("");
        if is_placeholder_token(value) {
            continue;
        }
        match field.semantic_type() {
            SemanticType::Identifier | SemanticType::Text => {
                record.set_text(field, normalize_text(value, schema.casing(field)));
            }
            SemanticType::Date => match parse_naive_date(value, &schema.date_formats) {
                Ok(date) => record.set_date(field, Some(date)),
                Err(err) => {
                    debug!("{field}: {err}");
                    failures.push(field);
                }
            },
            _ => match parse_currency_decimal(value) {
                Ok(number) => record.set_number(field, Some(number)),
                Err(err) => {
                    debug!("{field}: {err}");
                    failures.push(field);
                }
            },
        }
    }
    (record, failures)
}

pub fn normalize_rows<I>(
    ctx: &mut RunContext,
    binding: &HeaderBinding,
    rows: I,
) -> Vec<NormalizedRecord>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut failures = Vec::new();
    let records = rows
        .into_iter()
        .map(|raw| {
            let (record, row_failures) = normalize_row(&ctx.schema, binding, &raw);
            failures.extend(row_failures);
            record
        })
        .collect::<Vec<_>>();
    for field in failures {
        ctx.record_parse_failure(field);
    }
    ctx.set_input_rows(records.len());
    records
}
