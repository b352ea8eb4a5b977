//! Column mapping
//!
//! Resolves every semantic field of a schema to a column of the header
//! row. For each field, keywords are tried in order and the leftmost
//! header containing the keyword wins; the first keyword with any hit
//! decides. A column claimed by an earlier field is not offered again.

use super::ImportFailure;
use crate::domain::{FieldMap, KeywordTable};

/// Map header cells (already lowercase and trimmed) to semantic fields
pub fn map_columns(headers: &[String], table: &KeywordTable) -> Result<FieldMap, ImportFailure> {
    let map = resolve_fields(headers, table);

    let missing: Vec<String> = table
        .schema
        .required()
        .iter()
        .filter(|rule| !rule.is_satisfied(&map))
        .map(|rule| rule.describe())
        .collect();

    if missing.is_empty() {
        Ok(map)
    } else {
        Err(ImportFailure::MissingRequiredColumns { fields: missing })
    }
}

/// Best-effort mapping without applying the required-field policy
pub fn resolve_fields(headers: &[String], table: &KeywordTable) -> FieldMap {
    let mut map = FieldMap::new();

    for (field, keywords) in table.fields() {
        let column = keywords.iter().find_map(|keyword| {
            headers.iter().enumerate().position(|(idx, header)| {
                !header.is_empty() && !map.is_claimed(idx) && header.contains(keyword.as_str())
            })
        });

        if let Some(column) = column {
            map.set(field, column);
        }
    }

    map
}
