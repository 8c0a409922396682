//! Data dictionary for the cleaned table.

use crate::schema::{CanonicalSchema, ColumnRole, DerivedField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRow {
    pub column: String,
    pub semantic_type: String,
    pub role: String,
    pub required: bool,
    pub description: String,
}

/// Source columns in schema order, then derived columns.
pub fn build_dictionary(schema: &CanonicalSchema) -> Vec<DictionaryRow> {
    let source = schema.columns.iter().map(|column| DictionaryRow {
        column: column.field.as_str().to_string(),
        semantic_type: column.semantic_type().as_str().to_string(),
        role: column.role.as_str().to_string(),
        required: column.is_required(),
        description: column.description.clone().unwrap_or_default(),
    });
    let derived = DerivedField::ALL.iter().map(|field| DictionaryRow {
        column: field.as_str().to_string(),
        semantic_type: field.semantic_type().as_str().to_string(),
        role: ColumnRole::Derived.as_str().to_string(),
        required: field.always_present(),
        description: field.description().to_string(),
    });
    source.chain(derived).collect()
}
