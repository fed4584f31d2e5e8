//! Heuristic mapping of arbitrary column names onto the canonical schema.
//!
//! Each canonical field owns an ordered list of rules. Rules are tried tier
//! by tier; within a tier columns are scanned left to right and the first
//! match wins. Names are compared trimmed and lower-cased.
//!
//! Fields are resolved independently, in [`CanonicalField::ALL`] order. A
//! column claimed by an earlier field can still be picked by a later one, in
//! which case the later field takes it over.

use std::{collections::BTreeMap, fmt, str::FromStr};

use log::{debug, info};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{error::ConfigurationError, frame::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalField {
    Date,
    Product,
    Region,
    Revenue,
    Quantity,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::Date,
        CanonicalField::Product,
        CanonicalField::Region,
        CanonicalField::Revenue,
        CanonicalField::Quantity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Product => "product",
            CanonicalField::Region => "region",
            CanonicalField::Revenue => "revenue",
            CanonicalField::Quantity => "quantity",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CanonicalField::Date => "transaction date",
            CanonicalField::Product => "product name",
            CanonicalField::Region => "sales region",
            CanonicalField::Revenue => "sales amount",
            CanonicalField::Quantity => "quantity sold",
        }
    }

    /// Keywords that hint an original column relates to this field.
    pub fn related_keywords(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Date => &["date"],
            CanonicalField::Product => &["product"],
            CanonicalField::Region => &["region"],
            CanonicalField::Revenue => &["sales", "revenue"],
            CanonicalField::Quantity => &["quantity"],
        }
    }

    fn rules(&self) -> &'static [Rule] {
        match self {
            CanonicalField::Date => DATE_RULES,
            CanonicalField::Product => PRODUCT_RULES,
            CanonicalField::Region => REGION_RULES,
            CanonicalField::Revenue => REVENUE_RULES,
            CanonicalField::Quantity => QUANTITY_RULES,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        CanonicalField::ALL
            .into_iter()
            .find(|field| field.as_str() == lowered)
            .ok_or_else(|| ConfigurationError::UnknownField(s.to_string()))
    }
}

struct Rule {
    label: &'static str,
    matches: fn(&str) -> bool,
}

const DATE_RULES: &[Rule] = &[
    Rule {
        label: "date column tied to an order, transaction, or sale",
        matches: |name| {
            name.contains("date")
                && ["order", "transaction", "sale"]
                    .iter()
                    .any(|token| name.contains(*token))
        },
    },
    Rule {
        label: "any date column",
        matches: |name| name.contains("date"),
    },
];

const PRODUCT_RULES: &[Rule] = &[
    Rule {
        label: "product name",
        matches: |name| name.contains("product") && name.contains("name"),
    },
    Rule {
        label: "contains 'product'",
        matches: |name| name.contains("product"),
    },
    Rule {
        label: "contains 'item' or 'name'",
        matches: |name| name.contains("item") || name.contains("name"),
    },
];

const REGION_RULES: &[Rule] = &[
    Rule {
        label: "exactly 'region'",
        matches: |name| name == "region",
    },
    Rule {
        label: "contains 'region'",
        matches: |name| name.contains("region"),
    },
    Rule {
        label: "exactly 'state' or 'country'",
        matches: |name| matches!(name, "state" | "country"),
    },
];

const REVENUE_RULES: &[Rule] = &[
    Rule {
        label: "exactly 'sales'",
        matches: |name| name == "sales",
    },
    Rule {
        label: "contains 'sales'",
        matches: |name| name.contains("sales"),
    },
    Rule {
        label: "exactly 'revenue', 'amount', or 'total'",
        matches: |name| matches!(name, "revenue" | "amount" | "total"),
    },
];

const QUANTITY_RULES: &[Rule] = &[
    Rule {
        label: "exactly 'quantity'",
        matches: |name| name == "quantity",
    },
    Rule {
        label: "contains 'quantity', or exactly 'qty' or 'units'",
        matches: |name| name.contains("quantity") || matches!(name, "qty" | "units"),
    },
];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub original: String,
    pub field: CanonicalField,
}

/// Original column name → canonical field, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
}

impl ColumnMapping {
    /// Records `original → field`. Re-inserting an original column keeps its
    /// position and replaces its target; any other column previously mapped
    /// to `field` loses that mapping.
    pub fn insert(&mut self, original: impl Into<String>, field: CanonicalField) {
        let original = original.into();
        self.entries
            .retain(|entry| entry.field != field || entry.original == original);
        match self.entries.iter_mut().find(|entry| entry.original == original) {
            Some(entry) => entry.field = field,
            None => self.entries.push(MappingEntry { original, field }),
        }
    }

    pub fn get(&self, original: &str) -> Option<CanonicalField> {
        self.entries
            .iter()
            .find(|entry| entry.original == original)
            .map(|entry| entry.field)
    }

    pub fn original_for(&self, field: CanonicalField) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.original.as_str())
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of `table` with mapped columns renamed to their
    /// canonical names. Unmapped columns pass through unchanged.
    pub fn apply(&self, table: &Table) -> Table {
        table.renamed(|header| self.get(header).map(|field| field.as_str().to_string()))
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.original, entry.field.as_str())?;
        }
        map.end()
    }
}

/// Heuristic mapping only; never fails. Fields with no matching column are
/// simply absent from the result.
pub fn infer_mapping(columns: &[String]) -> ColumnMapping {
    let normalized = columns.iter().map(|c| normalize(c)).collect::<Vec<_>>();
    let mut mapping = ColumnMapping::default();
    for field in CanonicalField::ALL {
        if let Some(column) = resolve_field(field, columns, &normalized) {
            mapping.insert(column, field);
        }
    }
    mapping
}

fn resolve_field<'a>(
    field: CanonicalField,
    columns: &'a [String],
    normalized: &[String],
) -> Option<&'a str> {
    for (tier, rule) in field.rules().iter().enumerate() {
        if let Some(idx) = normalized.iter().position(|name| (rule.matches)(name)) {
            debug!(
                "Mapped '{}' -> '{}' (tier {}: {})",
                columns[idx],
                field,
                tier + 1,
                rule.label
            );
            return Some(columns[idx].as_str());
        }
    }
    debug!("No column matched canonical field '{field}'");
    None
}

/// Heuristic mapper with optional manual overrides per canonical field.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapper {
    overrides: BTreeMap<CanonicalField, String>,
}

impl ColumnMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: BTreeMap<CanonicalField, String>) -> Self {
        Self { overrides }
    }

    pub fn with_override(mut self, field: CanonicalField, column: impl Into<String>) -> Self {
        self.overrides.insert(field, column.into());
        self
    }

    /// Infers a mapping for `columns`, then applies overrides. An override
    /// naming a column that does not exist is a configuration error; the
    /// heuristic part never fails.
    pub fn resolve(&self, columns: &[String]) -> Result<ColumnMapping, ConfigurationError> {
        let mut mapping = infer_mapping(columns);
        for (field, wanted) in &self.overrides {
            let target = normalize(wanted);
            let column = columns
                .iter()
                .find(|c| *c == wanted)
                .or_else(|| columns.iter().find(|c| normalize(c) == target))
                .ok_or_else(|| ConfigurationError::OverrideColumnNotFound {
                    field: *field,
                    column: wanted.clone(),
                })?;
            mapping.insert(column.clone(), *field);
        }
        info!(
            "Resolved {} of {} canonical column(s)",
            mapping.len(),
            CanonicalField::ALL.len()
        );
        Ok(mapping)
    }

    /// Resolves the mapping for `table` and returns the renamed copy with it.
    pub fn map_table(&self, table: &Table) -> Result<(Table, ColumnMapping), ConfigurationError> {
        let mapping = self.resolve(table.headers())?;
        Ok((mapping.apply(table), mapping))
    }
}
