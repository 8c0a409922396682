//! Canonical schema description, YAML persistence and header binding.
//!
//! The [`CanonicalSchema`] lists every source field the pipeline understands
//! together with its header aliases, whether a value is required for a row to
//! survive cleaning, whether the column may be absent from the input, and the
//! text casing applied during normalization. Semantic types are fixed per
//! field because the typed record layout depends on them.
//!
//! ## Responsibilities
//!
//! - Built-in default matching the US Superstore orders export
//! - YAML loading and saving via `serde_yaml`, with validation on load
//! - Case/whitespace-insensitive header binding ([`CanonicalSchema::bind_headers`])
//! - Derived column catalogue used by the data dictionary

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result, bail, ensure};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{DEFAULT_DATE_FORMATS, TextCasing, header_key},
    error::StructuralError,
};

pub const SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    OrderId,
    OrderDate,
    ShipDate,
    ShipMode,
    Region,
    State,
    Category,
    SubCategory,
    ProductName,
    Sales,
    Profit,
    Quantity,
    Discount,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::OrderId,
        CanonicalField::OrderDate,
        CanonicalField::ShipDate,
        CanonicalField::ShipMode,
        CanonicalField::Region,
        CanonicalField::State,
        CanonicalField::Category,
        CanonicalField::SubCategory,
        CanonicalField::ProductName,
        CanonicalField::Sales,
        CanonicalField::Profit,
        CanonicalField::Quantity,
        CanonicalField::Discount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::OrderId => "order_id",
            CanonicalField::OrderDate => "order_date",
            CanonicalField::ShipDate => "ship_date",
            CanonicalField::ShipMode => "ship_mode",
            CanonicalField::Region => "region",
            CanonicalField::State => "state",
            CanonicalField::Category => "category",
            CanonicalField::SubCategory => "sub_category",
            CanonicalField::ProductName => "product_name",
            CanonicalField::Sales => "sales",
            CanonicalField::Profit => "profit",
            CanonicalField::Quantity => "quantity",
            CanonicalField::Discount => "discount",
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            CanonicalField::OrderId => SemanticType::Identifier,
            CanonicalField::OrderDate | CanonicalField::ShipDate => SemanticType::Date,
            CanonicalField::ShipMode
            | CanonicalField::Region
            | CanonicalField::State
            | CanonicalField::Category
            | CanonicalField::SubCategory
            | CanonicalField::ProductName => SemanticType::Text,
            CanonicalField::Sales | CanonicalField::Profit => SemanticType::Currency,
            CanonicalField::Quantity => SemanticType::Count,
            CanonicalField::Discount => SemanticType::Ratio,
        }
    }

    /// Fields a cleaned record cannot exist without, whatever a schema says.
    pub fn is_layout_required(&self) -> bool {
        matches!(
            self,
            CanonicalField::OrderDate | CanonicalField::ShipDate | CanonicalField::Sales
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self.semantic_type(),
            SemanticType::Identifier | SemanticType::Text
        )
    }

    fn default_role(&self) -> ColumnRole {
        match self {
            CanonicalField::OrderId => ColumnRole::Identifier,
            CanonicalField::Sales
            | CanonicalField::Profit
            | CanonicalField::Quantity
            | CanonicalField::Discount => ColumnRole::Measure,
            _ => ColumnRole::Dimension,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns computed by the cleaner rather than read from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedField {
    ShippingDelayDays,
    ProfitMargin,
    OrderYear,
    OrderYearMonth,
}

impl DerivedField {
    pub const ALL: [DerivedField; 4] = [
        DerivedField::ShippingDelayDays,
        DerivedField::ProfitMargin,
        DerivedField::OrderYear,
        DerivedField::OrderYearMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedField::ShippingDelayDays => "shipping_delay_days",
            DerivedField::ProfitMargin => "profit_margin",
            DerivedField::OrderYear => "order_year",
            DerivedField::OrderYearMonth => "order_year_month",
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            DerivedField::ShippingDelayDays | DerivedField::OrderYear => SemanticType::Integer,
            DerivedField::ProfitMargin => SemanticType::Ratio,
            DerivedField::OrderYearMonth => SemanticType::YearMonth,
        }
    }

    /// Whether every cleaned row carries a value for this column.
    pub fn always_present(&self) -> bool {
        !matches!(self, DerivedField::ProfitMargin)
    }

    pub fn description(&self) -> &'static str {
        match self {
            DerivedField::ShippingDelayDays => "Whole days from order_date to ship_date",
            DerivedField::ProfitMargin => {
                "profit / sales; empty when profit is null or sales is zero"
            }
            DerivedField::OrderYear => "Calendar year of order_date",
            DerivedField::OrderYearMonth => "Calendar month of order_date as YYYY-MM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Identifier,
    Text,
    Date,
    Currency,
    Count,
    Ratio,
    Integer,
    YearMonth,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Identifier => "identifier",
            SemanticType::Text => "text",
            SemanticType::Date => "date",
            SemanticType::Currency => "currency",
            SemanticType::Count => "count",
            SemanticType::Ratio => "ratio",
            SemanticType::Integer => "integer",
            SemanticType::YearMonth => "year_month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Identifier,
    Dimension,
    Measure,
    Derived,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Identifier => "identifier",
            ColumnRole::Dimension => "dimension",
            ColumnRole::Measure => "measure",
            ColumnRole::Derived => "derived",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: CanonicalField,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub allow_missing: bool,
    #[serde(default)]
    pub casing: TextCasing,
    pub role: ColumnRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnSpec {
    fn new(field: CanonicalField, description: &str) -> Self {
        Self {
            field,
            aliases: Vec::new(),
            required: false,
            allow_missing: false,
            casing: TextCasing::Preserve,
            role: field.default_role(),
            description: Some(description.to_string()),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn casing(mut self, casing: TextCasing) -> Self {
        self.casing = casing;
        self
    }

    fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.field.semantic_type()
    }

    /// The flag the cleaner enforces: layout fields are required regardless
    /// of `required`.
    pub fn is_required(&self) -> bool {
        self.required || self.field.is_layout_required()
    }

    /// Header keys that bind to this column: the canonical name plus aliases.
    pub fn header_keys(&self) -> Vec<String> {
        std::iter::once(self.field.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .map(header_key)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default = "CanonicalSchema::default_date_formats")]
    pub date_formats: Vec<String>,
    pub columns: Vec<ColumnSpec>,
}

impl Default for CanonicalSchema {
    fn default() -> Self {
        Self::superstore()
    }
}

impl CanonicalSchema {
    /// Layout of the US Superstore "Orders" export.
    pub fn superstore() -> Self {
        use CanonicalField as F;
        let columns = vec![
            ColumnSpec::new(F::OrderId, "Order identifier; repeats across line items")
                .casing(TextCasing::Upper),
            ColumnSpec::new(F::OrderDate, "Date the order was placed").required(),
            ColumnSpec::new(F::ShipDate, "Date the order shipped").required(),
            ColumnSpec::new(F::ShipMode, "Shipping service level").casing(TextCasing::Title),
            ColumnSpec::new(F::Region, "Sales region").casing(TextCasing::Title),
            ColumnSpec::new(F::State, "Destination state or province")
                .casing(TextCasing::Title)
                .aliases(&["State/Province", "Province"]),
            ColumnSpec::new(F::Category, "Top-level product category").casing(TextCasing::Title),
            ColumnSpec::new(F::SubCategory, "Product sub-category")
                .casing(TextCasing::Title)
                .aliases(&["Subcategory"]),
            ColumnSpec::new(F::ProductName, "Product description").aliases(&["Product"]),
            ColumnSpec::new(F::Sales, "Line revenue in currency units")
                .required()
                .aliases(&["Revenue", "Sales Amount"]),
            ColumnSpec::new(F::Profit, "Line profit in currency units; may be negative"),
            ColumnSpec::new(F::Quantity, "Units sold").aliases(&["Qty"]),
            ColumnSpec::new(F::Discount, "Discount rate between 0 and 1"),
        ];
        Self {
            schema_version: Some(SCHEMA_VERSION.to_string()),
            date_formats: Self::default_date_formats(),
            columns,
        }
    }

    pub fn default_date_formats() -> Vec<String> {
        DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: CanonicalSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema
            .validate()
            .with_context(|| format!("Validating schema file {path:?}"))?;
        Ok(schema)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.date_formats.is_empty(),
            "Schema must list at least one date format"
        );
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(column.field) {
                bail!("Field '{}' is declared more than once", column.field);
            }
            if column.is_required() && column.allow_missing {
                bail!(
                    "Field '{}' cannot be both required and allowed to be missing",
                    column.field
                );
            }
        }
        let absent = CanonicalField::ALL
            .iter()
            .filter(|field| !seen.contains(field))
            .map(|field| field.as_str())
            .collect::<Vec<_>>();
        ensure!(
            absent.is_empty(),
            "Schema does not declare field(s): {}",
            absent.join(", ")
        );

        let mut owners: HashMap<String, CanonicalField> = HashMap::new();
        for column in &self.columns {
            for key in column.header_keys() {
                if let Some(existing) = owners.insert(key.clone(), column.field)
                    && existing != column.field
                {
                    bail!(
                        "Header alias '{key}' is claimed by both '{existing}' and '{}'",
                        column.field
                    );
                }
            }
        }
        Ok(())
    }

    pub fn column(&self, field: CanonicalField) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn is_required(&self, field: CanonicalField) -> bool {
        self.column(field).is_some_and(ColumnSpec::is_required)
    }

    pub fn casing(&self, field: CanonicalField) -> TextCasing {
        self.column(field).map(|c| c.casing).unwrap_or_default()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.columns
            .iter()
            .filter(|c| c.is_required())
            .map(|c| c.field)
    }

    /// Maps input headers onto canonical fields; unknown headers are ignored.
    pub fn bind_headers(&self, headers: &[String]) -> Result<HeaderBinding, StructuralError> {
        let lookup: HashMap<String, CanonicalField> = self
            .columns
            .iter()
            .flat_map(|column| {
                column
                    .header_keys()
                    .into_iter()
                    .map(move |key| (key, column.field))
            })
            .collect();

        let mut positions: BTreeMap<CanonicalField, usize> = BTreeMap::new();
        let mut ignored = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            match lookup.get(&header_key(header)) {
                Some(field) => {
                    if let Some(previous) = positions.insert(*field, idx) {
                        return Err(StructuralError::DuplicateColumn {
                            field: field.to_string(),
                            first: headers[previous].clone(),
                            second: header.clone(),
                        });
                    }
                    debug!("Column '{header}' -> {field}");
                }
                None => ignored.push(header.clone()),
            }
        }

        let missing = self
            .columns
            .iter()
            .filter(|c| !c.allow_missing && !positions.contains_key(&c.field))
            .map(|c| c.field.to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(StructuralError::MissingColumns { missing });
        }
        Ok(HeaderBinding { positions, ignored })
    }
}

/// Resolved positions of canonical fields within one input's header row.
#[derive(Debug, Clone)]
pub struct HeaderBinding {
    positions: BTreeMap<CanonicalField, usize>,
    ignored: Vec<String>,
}

impl HeaderBinding {
    pub fn position(&self, field: CanonicalField) -> Option<usize> {
        self.positions.get(&field).copied()
    }

    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn bound_count(&self) -> usize {
        self.positions.len()
    }
}
